use std::fmt;
use std::sync::Arc;

use crate::outcome::Status;
use crate::shared::SharedState;

trait Cancellable: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl<T: Send + Sync> Cancellable for SharedState<T> {
    fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }
}

/// Lets a running task notice that its [`Future`] was cancelled.
///
/// Cancellation is cooperative: cancelling a future never interrupts the
/// task computing it. A task started with [`run_cancellable`] receives a
/// [`CancelToken`] and may poll it to stop early.
///
/// [`Future`]: crate::Future
/// [`run_cancellable`]: crate::tasks::run_cancellable
#[derive(Clone)]
pub struct CancelToken {
    source: Arc<dyn Cancellable>,
}

impl CancelToken {
    pub(crate) fn new<T>(state: Arc<SharedState<T>>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self { source: state }
    }

    /// Returns `true` once the future fed by the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.source.is_cancelled()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
