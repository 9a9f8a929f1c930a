//! Combinators over [`Future`].
//!
//! Every combinator registers one continuation on its parent and returns a
//! new future, bound to the same executor as the parent. User closures run
//! under `catch_unwind`; a panic becomes a [`Panicked`] failure of the
//! returned future.
//!
//! Cancellation travels like a failure. The failure handlers
//! ([`Future::recover`], [`Future::map_failure`], [`Future::on_failure`] and
//! the rest) see a cancelled parent as a [`Cancelled`] failure.
use std::panic::{self, AssertUnwindSafe};

use log::{trace, warn};
use skein_executor::panic_message;

use crate::failure::{Cancelled, Failure, Panicked, Rejected};
use crate::future::Future;
use crate::outcome::Outcome;
use crate::promise::Promise;

const LOG: &str = "skein_future::combinators";

/// Run `f`, turning a panic into a [`Failure`].
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, Failure> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| Failure::new(Panicked::new(panic_message(payload.as_ref()))))
}

/// Run a side-effecting observer, logging a panic instead of propagating it.
fn observe(f: impl FnOnce()) {
    if let Err(failure) = guarded(f) {
        warn!(target: LOG, "observer.panicked {}", failure);
    }
}

/// The failure a failure handler sees for an unsuccessful `outcome`.
fn failure_of<T>(outcome: &Outcome<T>) -> Failure {
    match outcome {
        Outcome::Failed(failure) => failure.clone(),
        _ => Failure::new(Cancelled),
    }
}

impl<T> Future<T>
where
    T: Send + Sync + 'static,
{
    /// Register `f` on this future and return the future `f` resolves
    /// through the promise it is handed.
    ///
    /// `f` is skipped if the returned future was completed in the meantime,
    /// by [`Future::cancel`] for instance.
    pub(crate) fn chain<U, F>(&self, f: F) -> Future<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&Outcome<T>, Promise<U>) + Send + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();
        self.state.subscribe(self.executor.clone(), move |outcome| {
            if promise.is_completed() {
                trace!(target: LOG, "chain.skip_completed");
                return;
            }
            f(outcome, promise)
        });
        Future {
            executor: self.executor.clone(),
            ..future
        }
    }

    /// Resolve `promise` with whatever this future resolves to.
    pub(crate) fn forward(&self, promise: Promise<T>)
    where
        T: Clone,
    {
        self.state.subscribe(None, move |outcome| {
            promise.complete(outcome.clone());
        });
    }

    /// Transform the value with `f`.
    ///
    /// Failure and cancellation pass through untouched and `f` is not
    /// called.
    ///
    /// ```rust
    /// use skein_future::Future;
    ///
    /// let len = Future::successful("four").map(str::len);
    /// assert_eq!(*len.value().unwrap(), 4);
    /// ```
    pub fn map<U, F>(&self, f: F) -> Future<U>
    where
        T: Clone,
        U: Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(value) => {
                let value = value.clone();
                promise.settle(guarded(move || f(value)));
            }
            other => promise.propagate(other),
        })
    }

    /// Continue with the future returned by `f`.
    ///
    /// The returned future resolves with the outcome of the inner future,
    /// so a failure of the inner future fails the whole chain.
    pub fn flat_map<U, F>(&self, f: F) -> Future<U>
    where
        T: Clone,
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Future<U> + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(value) => {
                let value = value.clone();
                match guarded(move || f(value)) {
                    Ok(inner) => inner.forward(promise),
                    Err(failure) => {
                        promise.try_failure(failure);
                    }
                }
            }
            other => promise.propagate(other),
        })
    }

    /// Continue with the future returned by `f`, ignoring the value.
    pub fn and_then<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce() -> Future<U> + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(_) => match guarded(f) {
                Ok(inner) => inner.forward(promise),
                Err(failure) => {
                    promise.try_failure(failure);
                }
            },
            other => promise.propagate(other),
        })
    }

    /// Replace the value with `value` once this future succeeds.
    pub fn and_then_value<U>(&self, value: U) -> Future<U>
    where
        U: Send + Sync + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(_) => {
                promise.try_success(value);
            }
            other => promise.propagate(other),
        })
    }

    /// Substitute a value computed from the failure.
    ///
    /// A successful value passes through. A cancelled future is recovered
    /// too; `f` then sees a [`Cancelled`] failure.
    ///
    /// ```rust
    /// use skein_future::{Cancelled, Future};
    ///
    /// let recovered = Future::<u32>::cancelled().recover(|f| f.is::<Cancelled>() as u32);
    /// assert_eq!(*recovered.value().unwrap(), 1);
    /// ```
    pub fn recover<F>(&self, f: F) -> Future<T>
    where
        T: Clone,
        F: FnOnce(&Failure) -> T + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(value) => {
                promise.try_success(value.clone());
            }
            other => {
                let failure = failure_of(other);
                promise.settle(guarded(move || f(&failure)));
            }
        })
    }

    /// Like [`Future::recover`], continuing with the future returned by `f`.
    pub fn recover_with<F>(&self, f: F) -> Future<T>
    where
        T: Clone,
        F: FnOnce(&Failure) -> Future<T> + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(value) => {
                promise.try_success(value.clone());
            }
            other => {
                let failure = failure_of(other);
                match guarded(move || f(&failure)) {
                    Ok(inner) => inner.forward(promise),
                    Err(failure) => {
                        promise.try_failure(failure);
                    }
                }
            }
        })
    }

    /// Recover any failure or cancellation with `value`.
    pub fn recover_value(&self, value: T) -> Future<T>
    where
        T: Clone,
    {
        self.recover(move |_| value)
    }

    /// Transform the failure with `f`. Values pass through.
    ///
    /// A cancelled future hands `f` a [`Cancelled`] failure and fails with
    /// whatever `f` returns.
    pub fn map_failure<F>(&self, f: F) -> Future<T>
    where
        T: Clone,
        F: FnOnce(&Failure) -> Failure + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(value) => {
                promise.try_success(value.clone());
            }
            other => {
                let failure = failure_of(other);
                let mapped = guarded(move || f(&failure)).unwrap_or_else(|panicked| panicked);
                promise.try_failure(mapped);
            }
        })
    }

    /// Fail with [`Rejected`] unless `predicate` accepts the value.
    pub fn filter<F>(&self, predicate: F) -> Future<T>
    where
        T: Clone,
        F: FnOnce(&T) -> bool + Send + 'static,
    {
        self.filter_or(predicate, Rejected)
    }

    /// Fail with `rejection` unless `predicate` accepts the value.
    pub fn filter_or<F>(&self, predicate: F, rejection: impl Into<Failure>) -> Future<T>
    where
        T: Clone,
        F: FnOnce(&T) -> bool + Send + 'static,
    {
        let rejection = rejection.into();
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(value) => match guarded(|| predicate(value)) {
                Ok(true) => {
                    promise.try_success(value.clone());
                }
                Ok(false) => {
                    promise.try_failure(rejection);
                }
                Err(failure) => {
                    promise.try_failure(failure);
                }
            },
            other => promise.propagate(other),
        })
    }

    /// Call `f` with the value once this future succeeds.
    ///
    /// Returns a handle on this same future, so observers can be stacked.
    /// A panic in `f` is logged and otherwise ignored.
    pub fn on_success<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.state.subscribe(self.executor.clone(), move |outcome| {
            if let Outcome::Succeeded(value) = outcome {
                observe(|| f(value));
            }
        });
        self.clone()
    }

    /// Call `f` with the failure once this future fails or is cancelled.
    pub fn on_failure<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(&Failure) + Send + 'static,
    {
        self.state.subscribe(self.executor.clone(), move |outcome| {
            if !matches!(outcome, Outcome::Succeeded(_)) {
                let failure = failure_of(outcome);
                observe(|| f(&failure));
            }
        });
        self.clone()
    }

    /// Call `f` with the outcome once this future completes, whatever it is.
    pub fn on_complete<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        self.state.subscribe(self.executor.clone(), move |outcome| {
            observe(|| f(outcome));
        });
        self.clone()
    }

    /// Pair this future's value with `other`'s.
    ///
    /// The first failure or cancellation, in the order `self` then `other`,
    /// becomes the outcome.
    pub fn zip<U>(&self, other: &Future<U>) -> Future<(T, U)>
    where
        T: Clone,
        U: Clone + Send + Sync + 'static,
    {
        let other = other.clone();
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(left) => {
                let left = left.clone();
                other.state.subscribe(None, move |outcome| match outcome {
                    Outcome::Succeeded(right) => {
                        promise.try_success((left, right.clone()));
                    }
                    rest => promise.propagate(rest),
                });
            }
            rest => promise.propagate(rest),
        })
    }

    /// Pair this future's value with `value`.
    pub fn zip_value<U>(&self, value: U) -> Future<(T, U)>
    where
        T: Clone,
        U: Send + Sync + 'static,
    {
        self.map(move |left| (left, value))
    }
}

impl<T> Future<Future<T>>
where
    T: Clone + Send + Sync + 'static,
{
    /// Collapse a future of a future into one future.
    pub fn flatten(&self) -> Future<T> {
        self.flat_map(|inner| inner)
    }
}

/// Combinators over the elements of a future collection.
impl<T> Future<Vec<T>>
where
    T: Send + Sync + 'static,
{
    /// Transform every element with `f`, keeping the order.
    pub fn inner_map<U, F>(&self, f: F) -> Future<Vec<U>>
    where
        U: Send + Sync + 'static,
        F: FnMut(&T) -> U + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(items) => {
                promise.settle(guarded(move || items.iter().map(f).collect()));
            }
            other => promise.propagate(other),
        })
    }

    /// Keep the elements `predicate` accepts.
    pub fn inner_filter<F>(&self, mut predicate: F) -> Future<Vec<T>>
    where
        T: Clone,
        F: FnMut(&T) -> bool + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(items) => {
                promise.settle(guarded(move || {
                    items.iter().filter(|item| predicate(*item)).cloned().collect()
                }));
            }
            other => promise.propagate(other),
        })
    }

    /// Fold the elements into `init` with `f`.
    pub fn inner_reduce<A, F>(&self, init: A, f: F) -> Future<A>
    where
        A: Send + Sync + 'static,
        F: FnMut(A, &T) -> A + Send + 'static,
    {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(items) => {
                promise.settle(guarded(move || items.iter().fold(init, f)));
            }
            other => promise.propagate(other),
        })
    }
}

impl<T> Future<Vec<Vec<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    /// Concatenate the inner collections in order.
    pub fn inner_flatten(&self) -> Future<Vec<T>> {
        self.chain(move |outcome, promise| match outcome {
            Outcome::Succeeded(nested) => {
                promise.try_success(nested.iter().flatten().cloned().collect());
            }
            other => promise.propagate(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use skein_executor::ManualExecutor;

    use super::*;
    use crate::Status;

    #[test]
    fn map_skips_failed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = Failure::msg("broken");
        let mapped = Future::<u32>::failed(source.clone()).map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v + 1
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(Failure::ptr_eq(mapped.error().unwrap(), &source));
    }

    #[test]
    fn map_panic_becomes_failure() {
        let mapped = Future::successful(1u8).map(|_| -> u8 { panic!("overflow") });
        let failure = mapped.error().unwrap();
        assert_eq!(failure.downcast_ref::<Panicked>().unwrap().message(), "overflow");
    }

    #[test]
    fn continuations_run_on_bound_executor() {
        let ex = ManualExecutor::new();
        let promise = Promise::new();
        let doubled = promise.future().via(ex.clone()).map(|v: u32| v * 2);
        promise.success(21).unwrap();
        assert_eq!(doubled.status(), Status::Pending);
        assert_eq!(ex.run_all(), 1);
        assert_eq!(*doubled.value().unwrap(), 42);

        // Derived futures inherit the binding.
        let plus = doubled.map(|v| v + 1);
        assert!(!plus.is_completed());
        ex.run_all();
        assert_eq!(*plus.value().unwrap(), 43);
    }

    #[test]
    fn rejected_continuation_cancels_derived() {
        let ex = ManualExecutor::new();
        ex.close();
        let promise = Promise::new();
        let mapped = promise.future().via(ex).map(|v: u32| v + 1);
        promise.success(1).unwrap();
        assert!(mapped.is_cancelled());
    }

    #[test]
    fn recover_and_cancellation() {
        let recovered =
            Future::<u32>::failed(Failure::msg("x")).recover(|f| f.to_string().len() as u32);
        assert_eq!(*recovered.value().unwrap(), 1);

        let cancelled = Future::<u32>::cancelled().recover_value(9);
        assert_eq!(*cancelled.value().unwrap(), 9);

        let seen = Future::<u32>::cancelled().recover(|f| f.is::<Cancelled>() as u32);
        assert_eq!(*seen.value().unwrap(), 1);

        let passthrough = Future::successful(5u32).recover_value(9);
        assert_eq!(*passthrough.value().unwrap(), 5);
    }

    #[test]
    fn recover_with_and_map_failure() {
        let recovered = Future::<u32>::failed(Failure::msg("x"))
            .recover_with(|_| Future::successful(7));
        assert_eq!(*recovered.value().unwrap(), 7);

        let mapped = Future::<u32>::failed(Failure::msg("inner"))
            .map_failure(|f| Failure::msg(format!("outer: {f}")));
        assert_eq!(mapped.error().unwrap().to_string(), "outer: inner");

        let promise = Promise::<u32>::new();
        let recovered = promise
            .future()
            .recover_with(|f| Future::successful(f.to_string().len() as u32));
        let mapped = promise
            .future()
            .map_failure(|f| Failure::msg(format!("wrapped {f}")));
        promise.cancel().unwrap();
        assert_eq!(*recovered.value().unwrap(), "cancelled".len() as u32);
        assert!(mapped.is_failed());
        assert_eq!(mapped.error().unwrap().to_string(), "wrapped cancelled");
    }

    #[test]
    fn on_failure_sees_cancellation() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let promise = Promise::<u8>::new();
        let future = promise.future().on_failure(move |f| {
            if f.is::<Cancelled>() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        promise.cancel().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(future.is_cancelled());
    }

    #[test]
    fn filter_rejects() {
        let kept = Future::successful(4u8).filter(|v| v % 2 == 0);
        assert_eq!(*kept.value().unwrap(), 4);
        let dropped = Future::successful(3u8).filter(|v| v % 2 == 0);
        assert!(dropped.error().unwrap().is::<Rejected>());
        let custom = Future::successful(3u8).filter_or(|_| false, Failure::msg("odd"));
        assert_eq!(custom.error().unwrap().to_string(), "odd");
    }

    #[test]
    fn observers_do_not_alter_outcome() {
        let seen = Arc::new(AtomicUsize::new(0));
        let (a, b, c) = (seen.clone(), seen.clone(), seen.clone());
        let promise = Promise::new();
        let future = promise
            .future()
            .on_success(move |v: &usize| {
                a.fetch_add(*v, Ordering::SeqCst);
            })
            .on_failure(move |_| {
                b.fetch_add(100, Ordering::SeqCst);
            })
            .on_complete(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                panic!("observer panics are contained");
            });
        promise.success(10).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 11);
        assert_eq!(*future.value().unwrap(), 10);
    }

    #[test]
    fn zip_and_flatten() {
        let left = Promise::new();
        let right = Promise::new();
        let zipped = left.future().zip(&right.future());
        right.success("r").unwrap();
        assert!(!zipped.is_completed());
        left.success(1).unwrap();
        assert_eq!(*zipped.value().unwrap(), (1, "r"));

        let failed = Future::successful(1).zip(&Future::<u8>::failed(Failure::msg("no")));
        assert!(failed.is_failed());

        let nested = Future::successful(Future::successful(5u8));
        assert_eq!(*nested.flatten().value().unwrap(), 5);
        assert_eq!(*Future::successful(2).zip_value('x').value().unwrap(), (2, 'x'));
    }

    #[test]
    fn cancelled_derived_skips_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let promise = Promise::new();
        let child = promise.future().map(move |v: u8| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        });
        assert!(child.cancel());
        promise.success(1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(child.is_cancelled());
    }

    #[test]
    fn cancelled_derived_skips_closure_on_executor() {
        let ex = ManualExecutor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let promise = Promise::new();
        let child = promise.future().via(ex.clone()).recover(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            0u8
        });
        promise.failure(Failure::msg("late")).unwrap();
        assert!(child.cancel());
        assert_eq!(ex.run_all(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(child.is_cancelled());
    }

    #[test]
    fn inner_combinators() {
        let items = Future::successful(vec![1u32, 2, 3, 4, 5]);
        assert_eq!(*items.inner_map(|v| v * 10).value().unwrap(), vec![10, 20, 30, 40, 50]);
        assert_eq!(*items.inner_filter(|v| v % 2 == 1).value().unwrap(), vec![1, 3, 5]);
        assert_eq!(*items.inner_reduce(0u64, |acc, v| acc + *v as u64).value().unwrap(), 15);
        let words = items.inner_reduce(String::new(), |mut acc, v| {
            acc.push_str(&v.to_string());
            acc
        });
        assert_eq!(words.value().unwrap(), "12345");

        let nested = Future::successful(vec![vec!['a'], vec![], vec!['b', 'c']]);
        assert_eq!(*nested.inner_flatten().value().unwrap(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn inner_combinators_pass_failure() {
        let source = Failure::msg("no rows");
        let items = Future::<Vec<u8>>::failed(source.clone());
        assert!(Failure::ptr_eq(items.inner_map(|v| *v).error().unwrap(), &source));
        assert!(Failure::ptr_eq(
            items.inner_reduce(0, |acc, _| acc).error().unwrap(),
            &source
        ));
        assert!(Future::<Vec<u8>>::cancelled().inner_filter(|_| true).is_cancelled());

        let panicked = Future::successful(vec![0u8]).inner_map(|_| -> u8 { panic!("bad row") });
        assert!(panicked.error().unwrap().is::<Panicked>());
    }

    #[test]
    fn cancelling_derived_leaves_parent() {
        let promise = Promise::new();
        let parent = promise.future();
        let child = parent.flat_map(|v: u8| Future::successful(v));
        assert!(child.cancel());
        promise.success(1).unwrap();
        assert!(parent.is_succeeded());
        assert!(child.is_cancelled());
    }
}
