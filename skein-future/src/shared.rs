//! The resolution cell shared by a [`Promise`] and its [`Future`]s.
//!
//! [`Promise`]: crate::Promise
//! [`Future`]: crate::Future
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{fmt, mem};

use log::{debug, trace, warn};
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use skein_executor::{panic_message, Executor, Task};

use crate::outcome::{Outcome, Status};
use crate::state::StateCell;

const LOG: &str = "skein_future::shared";

/// A registered continuation. Given the resolved state, it either runs the
/// callback in place or submits it to its executor.
type Continuation<T> = Box<dyn FnOnce(Arc<SharedState<T>>) + Send + 'static>;

pub(crate) struct SharedState<T> {
    flags: StateCell,
    outcome: OnceCell<Outcome<T>>,
    /// Continuations registered while pending. Emptied exactly once, by the
    /// resolver. The outcome is only ever set while holding this lock.
    continuations: Mutex<Vec<Continuation<T>>>,
    condvar: Condvar,
}

impl<T> fmt::Debug for SharedState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("status", &self.status())
            .finish()
    }
}

impl<T> SharedState<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            flags: StateCell::new(),
            outcome: OnceCell::new(),
            continuations: Mutex::new(Vec::new()),
            condvar: Condvar::new(),
        })
    }

    pub(crate) fn resolved(outcome: Outcome<T>) -> Arc<Self> {
        let status = outcome.status();
        let state = Self::new();
        let _ = state.outcome.set(outcome);
        state.flags.complete(status);
        state
    }

    #[inline]
    pub(crate) fn status(&self) -> Status {
        self.flags.status()
    }

    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.flags.is_complete()
    }

    #[inline]
    pub(crate) fn outcome(&self) -> Option<&Outcome<T>> {
        self.outcome.get()
    }

    /// Move the state from pending to `outcome`.
    ///
    /// Returns `false`, dropping `outcome`, if the state was already
    /// resolved. On success every registered continuation is dispatched in
    /// registration order, after the lock has been released.
    pub(crate) fn resolve(self: &Arc<Self>, outcome: Outcome<T>) -> bool {
        if self.flags.is_complete() {
            return false;
        }
        let status = outcome.status();
        let continuations = {
            let mut continuations = self.continuations.lock();
            if self.outcome.set(outcome).is_err() {
                return false;
            }
            self.flags.complete(status);
            mem::take(&mut *continuations)
        };
        if self.flags.has_waiters() {
            self.condvar.notify_all();
        }
        trace!(
            target: LOG,
            "state.resolved status={} continuations={}",
            status,
            continuations.len()
        );
        for continuation in continuations {
            self.dispatch(continuation);
        }
        true
    }

    fn dispatch(self: &Arc<Self>, continuation: Continuation<T>) {
        let state = self.clone();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || continuation(state))) {
            warn!(
                target: LOG,
                "continuation.panicked {}",
                panic_message(payload.as_ref())
            );
        }
    }

    /// Block until resolved.
    pub(crate) fn wait(&self) -> &Outcome<T> {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        let mut guard = self.continuations.lock();
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }
            self.flags.mark_waiters();
            self.condvar.wait(&mut guard);
        }
    }

    /// Block until resolved or until `timeout` elapses. Returns whether the
    /// state is resolved.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_complete() {
            return true;
        }
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.wait();
                return true;
            }
        };
        let mut guard = self.continuations.lock();
        loop {
            if self.outcome.get().is_some() {
                return true;
            }
            self.flags.mark_waiters();
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                return self.outcome.get().is_some();
            }
        }
    }
}

impl<T> SharedState<T>
where
    T: Send + Sync + 'static,
{
    /// Register `callback` to run once the state is resolved.
    ///
    /// With no executor the callback runs on the thread that resolves the
    /// state, or right here if it is already resolved. Otherwise it is
    /// submitted to `executor`; if the executor refuses it, the callback is
    /// dropped without running.
    pub(crate) fn subscribe<F>(self: &Arc<Self>, executor: Option<Arc<dyn Executor>>, callback: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let continuation: Continuation<T> = match executor {
            None => Box::new(move |state: Arc<SharedState<T>>| {
                if let Some(outcome) = state.outcome() {
                    callback(outcome);
                }
            }),
            Some(executor) => Box::new(move |state: Arc<SharedState<T>>| {
                let task = Task::new(move || {
                    if let Some(outcome) = state.outcome() {
                        callback(outcome);
                    }
                });
                if let Err(err) = executor.submit(task) {
                    debug!(target: LOG, "continuation.rejected {}", err);
                }
            }),
        };
        {
            let mut continuations = self.continuations.lock();
            if !self.is_complete() {
                continuations.push(continuation);
                return;
            }
        }
        self.dispatch(continuation);
    }
}
