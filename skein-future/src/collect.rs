//! Combinators over many futures.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::future::Future;
use crate::outcome::Outcome;
use crate::promise::Promise;

/// Collect the values of `futures`, in input order.
///
/// Resolves once every input succeeded. The first input to fail or be
/// cancelled, in completion order, decides the outcome instead; the other
/// inputs are left running. An empty input resolves to an empty `Vec`.
///
/// The returned future runs its continuations inline.
///
/// ```rust
/// use skein_future::{sequence, Promise};
///
/// let (a, b) = (Promise::new(), Promise::new());
/// let all = sequence(vec![a.future(), b.future()]);
/// b.success(2).unwrap();
/// a.success(1).unwrap();
/// assert_eq!(*all.value().unwrap(), vec![1, 2]);
/// ```
pub fn sequence<T, I>(futures: I) -> Future<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Future<T>>,
{
    let futures: Vec<_> = futures.into_iter().collect();
    if futures.is_empty() {
        return Future::successful(Vec::new());
    }

    let promise = Promise::new();
    let result = promise.future();
    let gather = Arc::new(Gather {
        slots: Mutex::new(vec![None; futures.len()]),
        remaining: AtomicUsize::new(futures.len()),
        promise,
    });
    for (index, future) in futures.into_iter().enumerate() {
        let gather = gather.clone();
        future.state.subscribe(None, move |outcome| match outcome {
            Outcome::Succeeded(value) => gather.fill(index, value.clone()),
            rest => gather.promise.propagate(rest),
        });
    }
    result
}

/// Same as [`sequence`]: every input must succeed.
pub fn all<T, I>(futures: I) -> Future<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Future<T>>,
{
    sequence(futures)
}

/// Resolve with the outcome of the first input to complete, whatever it
/// is.
///
/// The other inputs are neither cancelled nor observed further. When two
/// inputs complete concurrently, the one whose completion is processed
/// first wins. An empty input yields a cancelled future.
pub fn any<T, I>(futures: I) -> Future<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Future<T>>,
{
    let promise = Promise::new();
    let result = promise.future();
    for future in futures {
        future.forward(promise.clone());
    }
    // Without inputs the last promise handle drops here, cancelling the
    // result.
    drop(promise);
    result
}

/// Same as [`any`].
pub fn first_completed<T, I>(futures: I) -> Future<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Future<T>>,
{
    any(futures)
}

struct Gather<T> {
    slots: Mutex<Vec<Option<T>>>,
    remaining: AtomicUsize,
    promise: Promise<Vec<T>>,
}

impl<T> Gather<T> {
    fn fill(&self, index: usize, value: T) {
        self.slots.lock()[index] = Some(value);
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let values = self.slots.lock().drain(..).flatten().collect();
            self.promise.try_success(values);
        }
    }
}
