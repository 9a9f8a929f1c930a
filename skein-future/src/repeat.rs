//! Asynchronous loops.
use log::trace;

use crate::combinators::guarded;
use crate::future::Future;
use crate::outcome::Outcome;
use crate::promise::Promise;

const LOG: &str = "skein_future::repeat";

/// One step of a [`repeat`] loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T, S> {
    /// Run another iteration with this state.
    Continue(S),
    /// Stop and resolve the loop with this value.
    Finish(T),
}

/// Drive `f` from `init` until it returns [`Step::Finish`].
///
/// Each iteration returns a future of the next [`Step`]. Steps that are
/// already resolved are consumed in a plain loop, so long runs of
/// synchronous steps do not grow the stack. A pending step resumes the loop
/// from its continuation. The first failure or cancellation of a step, or a
/// panic in `f`, ends the loop with that outcome. Cancelling the returned
/// future stops the loop before its next iteration.
///
/// ```rust
/// use skein_future::{repeat, Future, Step};
///
/// let sum = repeat(0u32, |n| {
///     Future::successful(if n < 10 { Step::Continue(n + 1) } else { Step::Finish(n) })
/// });
/// assert_eq!(*sum.value().unwrap(), 10);
/// ```
pub fn repeat<T, S, F>(init: S, f: F) -> Future<T>
where
    T: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    F: FnMut(S) -> Future<Step<T, S>> + Send + 'static,
{
    let promise = Promise::new();
    let result = promise.future();
    drive(Repeater { f, promise }, init);
    result
}

/// Fold `items` into `init` one item at a time: `f(item, acc)` is only
/// called once the previous item's future succeeded.
pub fn repeat_for_sequence<I, X, A, F>(items: I, init: A, mut f: F) -> Future<A>
where
    I: IntoIterator<Item = X>,
    I::IntoIter: Send + 'static,
    A: Clone + Send + Sync + 'static,
    F: FnMut(X, A) -> Future<A> + Send + 'static,
{
    let mut items = items.into_iter();
    repeat(init, move |acc| match items.next() {
        Some(item) => f(item, acc).map(Step::Continue),
        None => Future::successful(Step::Finish(acc)),
    })
}

struct Repeater<T, F> {
    f: F,
    promise: Promise<T>,
}

fn drive<T, S, F>(mut repeater: Repeater<T, F>, init: S)
where
    T: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    F: FnMut(S) -> Future<Step<T, S>> + Send + 'static,
{
    let mut state = init;
    let mut rounds = 0usize;
    loop {
        if repeater.promise.is_completed() {
            trace!(target: LOG, "repeat.stopped rounds={}", rounds);
            return;
        }
        rounds += 1;
        let f = &mut repeater.f;
        let step = match guarded(move || f(state)) {
            Ok(step) => step,
            Err(failure) => {
                repeater.promise.try_failure(failure);
                return;
            }
        };
        match step.outcome() {
            Some(Outcome::Succeeded(Step::Continue(next))) => state = next.clone(),
            Some(outcome) => {
                finish(&repeater.promise, outcome);
                return;
            }
            None => {
                step.state.subscribe(None, move |outcome| match outcome {
                    Outcome::Succeeded(Step::Continue(next)) => drive(repeater, next.clone()),
                    rest => finish(&repeater.promise, rest),
                });
                return;
            }
        }
    }
}

fn finish<T, S>(promise: &Promise<T>, outcome: &Outcome<Step<T, S>>)
where
    T: Clone,
{
    match outcome {
        Outcome::Succeeded(Step::Finish(value)) => {
            promise.try_success(value.clone());
        }
        Outcome::Succeeded(Step::Continue(_)) => {}
        rest => promise.propagate(rest),
    }
}
