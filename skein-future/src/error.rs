use skein_executor::SubmitError;

use crate::failure::Failure;
use crate::outcome::Status;

/// Error returned by the fallible operations of this crate.
///
/// Contract violations such as resolving a [`Promise`] twice or reading the
/// value of a pending [`Future`] are reported at the call site. The terminal
/// outcome of a future also surfaces as an [`Error`] when it is read as a
/// `Result`, through [`Future::get`] or `.await`.
///
/// [`Promise`]: crate::Promise
/// [`Future`]: crate::Future
/// [`Future::get`]: crate::Future::get
#[derive(thiserror::Error, Debug, Clone)]
#[error(transparent)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn already_satisfied() -> Self {
        Self {
            kind: ErrorKind::PromiseAlreadySatisfied,
        }
    }

    pub(crate) fn invalid_state(expected: Status, actual: Status) -> Self {
        Self {
            kind: ErrorKind::InvalidState { expected, actual },
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
        }
    }

    pub(crate) fn failed(failure: Failure) -> Self {
        Self {
            kind: ErrorKind::Failed(failure),
        }
    }

    /// Returns what went wrong.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns `true` if the future was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns `true` if the future failed.
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Failed(_))
    }

    /// Returns the failure payload if the future failed.
    pub fn failure(&self) -> Option<&Failure> {
        match &self.kind {
            ErrorKind::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<SubmitError> for Error {
    fn from(_: SubmitError) -> Self {
        Self {
            kind: ErrorKind::SchedulerStopped,
        }
    }
}

/// The kinds of [`Error`].
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A promise was resolved more than once.
    #[error("promise already satisfied")]
    PromiseAlreadySatisfied,
    /// A future was read in a state that does not hold the requested data.
    #[error("future is {actual}, expected {expected}")]
    InvalidState {
        /// The state the read requires.
        expected: Status,
        /// The state the future was in.
        actual: Status,
    },
    /// A task was submitted after the scheduler began shutting down.
    #[error("the scheduler has stopped accepting tasks")]
    SchedulerStopped,
    /// The future was cancelled.
    #[error("future cancelled")]
    Cancelled,
    /// The future failed.
    #[error("{0}")]
    Failed(Failure),
}
