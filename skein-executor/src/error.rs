use std::{fmt, io};

use crate::Task;

/// Error returned by [`Executor::submit`] when a task is refused.
///
/// The refused [`Task`] travels with the error. Dropping the error drops the
/// task, which releases any promise it captured.
///
/// [`Executor::submit`]: crate::Executor::submit
#[derive(thiserror::Error)]
#[error("{kind}")]
pub struct SubmitError {
    kind: SubmitErrorKind,
    task: Task,
}

impl SubmitError {
    pub(crate) fn stopped(task: Task) -> Self {
        Self {
            kind: SubmitErrorKind::Stopped,
            task,
        }
    }

    /// Returns the reason the task was refused.
    pub fn kind(&self) -> SubmitErrorKind {
        self.kind
    }

    /// Returns `true` if the executor has stopped accepting tasks.
    pub fn is_stopped(&self) -> bool {
        matches!(self.kind, SubmitErrorKind::Stopped)
    }

    /// Recover the refused task.
    pub fn into_task(self) -> Task {
        self.task
    }
}

impl fmt::Debug for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError")
            .field("kind", &self.kind)
            .finish()
    }
}

/// The reason a task was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    /// The scheduler has begun shutting down.
    #[error("the scheduler has stopped accepting tasks")]
    Stopped,
}

/// Error returned when a [`ThreadPool`] cannot be built.
///
/// [`ThreadPool`]: crate::ThreadPool
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct BuildError {
    kind: BuildErrorKind,
}

impl BuildError {
    pub(crate) fn no_workers() -> Self {
        Self {
            kind: BuildErrorKind::NoWorkers,
        }
    }

    pub(crate) fn invalid_env(var: &'static str, value: &str, reason: impl fmt::Display) -> Self {
        Self {
            kind: BuildErrorKind::InvalidEnv {
                var,
                value: value.to_owned(),
                reason: reason.to_string(),
            },
        }
    }

    pub(crate) fn spawn(err: io::Error) -> Self {
        Self {
            kind: BuildErrorKind::Spawn(err),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum BuildErrorKind {
    #[error("a thread pool needs at least one worker thread")]
    NoWorkers,
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}
