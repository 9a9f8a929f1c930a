//! Executors for running [`Task`]s.
//!
//! An [`Executor`] accepts side-effecting tasks and runs them at some point,
//! on some thread. This crate provides three:
//!
//! - [`ThreadPool`]: a fixed set of worker threads pulling from one shared
//!   run queue, submitted to through a cloneable [`Handle`]. A [`TaskKind`]
//!   pins a task to one worker or counts it against a capped sub-pool.
//! - [`InlineExecutor`]: runs each task on the submitting thread.
//! - [`ManualExecutor`]: queues tasks until the caller pumps them, for
//!   deterministic tests.
//!
//! # Modules
//! - [`config`]: the [`Builder`] for [`ThreadPool`] and its environment
//!   variables.
#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::missing_safety_doc
)]
use std::sync::Arc;

pub mod config;
mod context;
mod error;
mod inline;
mod manual;
mod pool;
mod task;

pub use config::Builder;
pub use error::{BuildError, SubmitError, SubmitErrorKind};
pub use inline::InlineExecutor;
pub use manual::ManualExecutor;
pub use pool::{Handle, ShutdownMode, ThreadPool};
pub use task::{panic_message, Panic, Priority, Task, TaskKind};

/// [`Executor`] provides a way to run a [`Task`] later.
///
/// Implementations must either accept the task, eventually running it or
/// holding it as documented, or hand it back inside a [`SubmitError`].
/// `submit` never blocks waiting for the task to run, except for
/// [`InlineExecutor`] which runs it in place.
pub trait Executor: Send + Sync + 'static {
    /// Submit `task` for execution.
    fn submit(&self, task: Task) -> Result<(), SubmitError>;
}

impl<E> Executor for Arc<E>
where
    E: Executor + ?Sized,
{
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        self.as_ref().submit(task)
    }
}

impl<E> Executor for Box<E>
where
    E: Executor + ?Sized,
{
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        self.as_ref().submit(task)
    }
}
