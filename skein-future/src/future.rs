use std::fmt;
use std::future::{Future as StdFuture, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use parking_lot::Mutex;
use skein_executor::Executor;

use crate::error::Error;
use crate::failure::Failure;
use crate::outcome::{Outcome, Status};
use crate::shared::SharedState;

/// The consumer side of an asynchronous computation.
///
/// A [`Future`] is a cheap, cloneable, read-only handle on a shared state
/// that a [`Promise`] eventually resolves to [`Status::Succeeded`],
/// [`Status::Failed`] or [`Status::Cancelled`]. Clones observe the same
/// state.
///
/// Combinators such as [`Future::map`] register continuations on the state.
/// A continuation runs on the executor the handle is bound to, or inline on
/// the resolving thread when unbound. Futures from [`run`] are bound to the
/// executor they were submitted to; futures from a bare [`Promise`] are
/// unbound. Rebind with [`Future::via`] or [`Future::inline`]; the future
/// returned by a combinator inherits the binding of its parent.
///
/// Awaiting a [`Future`] from async code yields `Result<T, Error>`.
///
/// [`Promise`]: crate::Promise
/// [`run`]: crate::tasks::run
pub struct Future<T> {
    pub(crate) state: Arc<SharedState<T>>,
    pub(crate) executor: Option<Arc<dyn Executor>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("status", &self.status())
            .field("inline", &self.executor.is_none())
            .finish()
    }
}

impl<T> Future<T> {
    pub(crate) fn from_state(
        state: Arc<SharedState<T>>,
        executor: Option<Arc<dyn Executor>>,
    ) -> Self {
        Self { state, executor }
    }

    /// Construct a future that already holds `value`.
    pub fn successful(value: T) -> Self {
        Self::from_state(SharedState::resolved(Outcome::Succeeded(value)), None)
    }

    /// Construct a future that already failed with `failure`.
    pub fn failed(failure: impl Into<Failure>) -> Self {
        Self::from_state(SharedState::resolved(Outcome::Failed(failure.into())), None)
    }

    /// Construct a future that is already cancelled.
    pub fn cancelled() -> Self {
        Self::from_state(SharedState::resolved(Outcome::Cancelled), None)
    }

    /// Bind the continuations of this handle to `executor`.
    pub fn via<E>(mut self, executor: E) -> Self
    where
        E: Executor,
    {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Run the continuations of this handle inline, on the thread that
    /// resolves the future.
    pub fn inline(mut self) -> Self {
        self.executor = None;
        self
    }

    /// Returns the current [`Status`].
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Returns `true` once the future reached a terminal state.
    pub fn is_completed(&self) -> bool {
        self.state.is_complete()
    }

    /// Returns `true` if the future holds a value.
    pub fn is_succeeded(&self) -> bool {
        self.status() == Status::Succeeded
    }

    /// Returns `true` if the future holds a failure.
    pub fn is_failed(&self) -> bool {
        self.status() == Status::Failed
    }

    /// Returns `true` if the future was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }

    /// Returns the outcome, if resolved.
    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.state.outcome()
    }

    /// Returns the value without blocking.
    ///
    /// Fails with [`ErrorKind::InvalidState`] unless the future succeeded.
    ///
    /// [`ErrorKind::InvalidState`]: crate::ErrorKind::InvalidState
    pub fn value(&self) -> Result<&T, Error> {
        match self.outcome() {
            Some(Outcome::Succeeded(value)) => Ok(value),
            _ => Err(Error::invalid_state(Status::Succeeded, self.status())),
        }
    }

    /// Returns the failure without blocking.
    ///
    /// Fails with [`ErrorKind::InvalidState`] unless the future failed.
    ///
    /// [`ErrorKind::InvalidState`]: crate::ErrorKind::InvalidState
    pub fn error(&self) -> Result<&Failure, Error> {
        match self.outcome() {
            Some(Outcome::Failed(failure)) => Ok(failure),
            _ => Err(Error::invalid_state(Status::Failed, self.status())),
        }
    }

    /// Block the calling thread until the future is resolved.
    ///
    /// Do not call this from a task or continuation of the same chain: if
    /// every worker of the pool blocks here, nothing is left to resolve it.
    pub fn wait(&self) -> &Outcome<T> {
        self.state.wait()
    }

    /// Block for at most `timeout`. Returns whether the future is resolved.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.state.wait_timeout(timeout)
    }

    /// Block until resolved, then return the value or the reason there is
    /// none.
    pub fn get(&self) -> Result<T, Error>
    where
        T: Clone,
    {
        self.wait().clone().into_result()
    }

    /// Cancel this future if it is still pending.
    ///
    /// Only this future's own state is cancelled: the future it was derived
    /// from, if any, is left alone, and a task already computing it keeps
    /// running. Returns whether this call cancelled it.
    pub fn cancel(&self) -> bool {
        self.state.resolve(Outcome::Cancelled)
    }
}

impl<T> IntoFuture for Future<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error>;
    type IntoFuture = Awaiting<T>;

    fn into_future(self) -> Self::IntoFuture {
        Awaiting {
            state: self.state,
            waker: None,
        }
    }
}

/// The [`std::future::Future`] returned by awaiting a [`Future`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Awaiting<T> {
    state: Arc<SharedState<T>>,
    waker: Option<Arc<Mutex<Option<Waker>>>>,
}

impl<T> fmt::Debug for Awaiting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaiting")
            .field("status", &self.state.status())
            .finish()
    }
}

impl<T> StdFuture for Awaiting<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if let Some(outcome) = this.state.outcome() {
            return Poll::Ready(outcome.clone().into_result());
        }
        if let Some(slot) = &this.waker {
            let mut slot = slot.lock();
            match slot.as_ref() {
                Some(waker) if waker.will_wake(cx.waker()) => {}
                _ => *slot = Some(cx.waker().clone()),
            }
        } else {
            let slot = Arc::new(Mutex::new(Some(cx.waker().clone())));
            let wake = slot.clone();
            this.state.subscribe(None, move |_| {
                if let Some(waker) = wake.lock().take() {
                    waker.wake();
                }
            });
            this.waker = Some(slot);
        }
        // The state may have resolved while the waker was being stored.
        match this.state.outcome() {
            Some(outcome) => Poll::Ready(outcome.clone().into_result()),
            None => Poll::Pending,
        }
    }
}
