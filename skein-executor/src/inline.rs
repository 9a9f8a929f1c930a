use log::warn;

use crate::error::SubmitError;
use crate::task::Task;
use crate::Executor;

const LOG: &str = "skein_executor::inline";

/// An [`Executor`] that runs each task on the submitting thread, before
/// [`Executor::submit`] returns.
///
/// Priorities and bindings are ignored. A panicking task is caught and
/// logged; the submitter does not observe it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl InlineExecutor {
    /// Construct an [`InlineExecutor`].
    pub fn new() -> Self {
        Self
    }
}

impl Executor for InlineExecutor {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        if let Err(panic) = task.run() {
            warn!(target: LOG, "inline.task_panicked {}", panic);
        }
        Ok(())
    }
}
