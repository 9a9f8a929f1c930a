//! Futures and promises with executor-bound continuations.
//!
//! A [`Promise`] is the write side of a shared state and a [`Future`] the
//! read side. The state is resolved exactly once, to a value, a [`Failure`]
//! or cancellation, and every continuation registered on it runs exactly
//! once after that, in registration order, either inline on the resolving
//! thread or on an [`Executor`] from [`skein_executor`].
//!
//! ```rust
//! use skein_executor::ThreadPool;
//! use skein_future::{sequence, tasks};
//!
//! let pool = ThreadPool::new(4).unwrap();
//! let handle = pool.handle();
//! let squares = (0..8u64).map(|i| tasks::run(&handle, move || i * i));
//! let total = sequence(squares).map(|v| v.iter().sum::<u64>());
//! assert_eq!(total.get().unwrap(), 140);
//! ```
//!
//! # Components
//! - [`Promise`] and [`Future`]: the producer and consumer handles.
//! - Combinators on [`Future`]: [`Future::map`], [`Future::flat_map`],
//!   [`Future::recover`], [`Future::on_complete`] and friends.
//! - [`sequence`], [`all`], [`any`]: combinators over many futures.
//! - [`tasks`]: run closures on an executor and get a future back.
//! - [`repeat`] and [`repeat_for_sequence`]: asynchronous loops.
//!
//! [`Executor`]: skein_executor::Executor
#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::missing_safety_doc
)]
mod cancel;
mod collect;
mod combinators;
mod error;
mod failure;
mod future;
mod outcome;
mod promise;
mod repeat;
mod shared;
mod state;
pub mod tasks;

pub use cancel::CancelToken;
pub use collect::{all, any, first_completed, sequence};
pub use error::{Error, ErrorKind};
pub use failure::{Cancelled, Failure, Panicked, Rejected};
pub use future::{Awaiting, Future};
pub use outcome::{Outcome, Status};
pub use promise::Promise;
pub use repeat::{repeat, repeat_for_sequence, Step};
