use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::failure::Failure;
use crate::future::Future;
use crate::outcome::Outcome;
use crate::shared::SharedState;

const LOG: &str = "skein_future::promise";

/// The producer side of a [`Future`].
///
/// A [`Promise`] is the only way to resolve its shared state. Clones share
/// the same write capability. If the last clone is dropped while the state
/// is still pending, the state becomes [`Status::Cancelled`].
///
/// ```rust
/// use skein_future::Promise;
///
/// let promise = Promise::new();
/// let future = promise.future();
/// assert!(!future.is_completed());
///
/// promise.success(42).unwrap();
/// assert_eq!(*future.value().unwrap(), 42);
/// assert!(promise.success(7).is_err());
/// ```
///
/// [`Status::Cancelled`]: crate::Status::Cancelled
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Arc<SharedState<T>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if self.state.resolve(Outcome::Cancelled) {
            debug!(target: LOG, "promise.broken");
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.inner.state.status())
            .finish()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    /// Construct a pending [`Promise`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: SharedState::new(),
            }),
        }
    }

    /// Returns a [`Future`] observing this promise.
    ///
    /// Every call returns a handle to the same shared state. The future runs
    /// its continuations inline until rebound with [`Future::via`].
    pub fn future(&self) -> Future<T> {
        Future::from_state(self.inner.state.clone(), None)
    }

    /// Resolve with `value`.
    ///
    /// Fails with [`ErrorKind::PromiseAlreadySatisfied`] if already resolved,
    /// leaving the stored outcome untouched.
    ///
    /// [`ErrorKind::PromiseAlreadySatisfied`]: crate::ErrorKind::PromiseAlreadySatisfied
    pub fn success(&self, value: T) -> Result<(), Error> {
        self.report(Outcome::Succeeded(value))
    }

    /// Resolve with `failure`.
    ///
    /// Fails with [`ErrorKind::PromiseAlreadySatisfied`] if already resolved.
    ///
    /// [`ErrorKind::PromiseAlreadySatisfied`]: crate::ErrorKind::PromiseAlreadySatisfied
    pub fn failure(&self, failure: impl Into<Failure>) -> Result<(), Error> {
        self.report(Outcome::Failed(failure.into()))
    }

    /// Resolve as cancelled.
    ///
    /// Fails with [`ErrorKind::PromiseAlreadySatisfied`] if already resolved.
    ///
    /// [`ErrorKind::PromiseAlreadySatisfied`]: crate::ErrorKind::PromiseAlreadySatisfied
    pub fn cancel(&self) -> Result<(), Error> {
        self.report(Outcome::Cancelled)
    }

    /// Resolve with `value` unless already resolved. Returns whether this
    /// call resolved the promise.
    pub fn try_success(&self, value: T) -> bool {
        self.complete(Outcome::Succeeded(value))
    }

    /// Resolve with `failure` unless already resolved.
    pub fn try_failure(&self, failure: impl Into<Failure>) -> bool {
        self.complete(Outcome::Failed(failure.into()))
    }

    /// Resolve as cancelled unless already resolved.
    pub fn try_cancel(&self) -> bool {
        self.complete(Outcome::Cancelled)
    }

    /// Returns `true` once the shared state is resolved, by this promise or
    /// by a cancelled [`Future`].
    pub fn is_completed(&self) -> bool {
        self.inner.state.is_complete()
    }

    pub(crate) fn complete(&self, outcome: Outcome<T>) -> bool {
        self.inner.state.resolve(outcome)
    }

    pub(crate) fn settle(&self, result: Result<T, Failure>) -> bool {
        self.complete(result.into())
    }

    /// Carry a non-success outcome of another future over to this promise.
    pub(crate) fn propagate<U>(&self, outcome: &Outcome<U>) {
        match outcome {
            Outcome::Failed(failure) => {
                self.complete(Outcome::Failed(failure.clone()));
            }
            Outcome::Cancelled => {
                self.complete(Outcome::Cancelled);
            }
            Outcome::Succeeded(_) => unreachable!("propagate called with a value"),
        }
    }

    fn report(&self, outcome: Outcome<T>) -> Result<(), Error> {
        if self.complete(outcome) {
            Ok(())
        } else {
            Err(Error::already_satisfied())
        }
    }
}

impl<T> Promise<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn cancel_token(&self) -> CancelToken {
        CancelToken::new(self.inner.state.clone())
    }
}
