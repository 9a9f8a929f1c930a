use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::SubmitError;
use crate::task::Task;
use crate::Executor;

const LOG: &str = "skein_executor::manual";

/// An [`Executor`] that queues tasks until the caller runs them.
///
/// Nothing runs until [`ManualExecutor::run_next`] or
/// [`ManualExecutor::run_all`] is called, which makes the order of every
/// continuation observable from a single test thread. Tasks run in
/// submission order; priorities and bindings are ignored.
///
/// ```rust
/// use skein_executor::{Executor, ManualExecutor, Task};
///
/// let ex = ManualExecutor::new();
/// ex.submit(Task::new(|| println!("Hello world"))).unwrap();
/// assert_eq!(ex.queued(), 1);
/// assert_eq!(ex.run_all(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ManualExecutor {
    shared: Arc<Shared>,
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("queued", &self.queued())
            .finish()
    }
}

#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    runqueue: VecDeque<Task>,
    closed: bool,
}

impl ManualExecutor {
    /// Construct an empty [`ManualExecutor`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the next queued task, if any.
    ///
    /// Returns `false` when the queue was empty.
    pub fn run_next(&self) -> bool {
        // The lock is released before the task runs so that it can submit.
        let next = self.shared.inner.lock().runqueue.pop_front();
        match next {
            Some(task) => {
                if let Err(panic) = task.run() {
                    warn!(target: LOG, "manual.task_panicked {}", panic);
                }
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks submitted while
    /// running. Returns how many tasks ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Returns the number of queued tasks.
    pub fn queued(&self) -> usize {
        self.shared.inner.lock().runqueue.len()
    }

    /// Stop accepting tasks and drop every queued task without running it.
    pub fn close(&self) {
        let dropped = {
            let mut inner = self.shared.inner.lock();
            inner.closed = true;
            mem::take(&mut inner.runqueue)
        };
        debug!(target: LOG, "manual.close dropped={}", dropped.len());
        drop(dropped);
    }
}

impl Executor for ManualExecutor {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return Err(SubmitError::stopped(task));
        }
        inner.runqueue.push_back(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn runs_in_submission_order() {
        let ex = ManualExecutor::new();
        let log = Arc::new(Mutex::new(vec![]));
        for i in 0..3 {
            let log = log.clone();
            ex.submit(Task::new(move || log.lock().push(i))).unwrap();
        }
        assert!(log.lock().is_empty());
        assert!(ex.run_next());
        assert_eq!(*log.lock(), vec![0]);
        assert_eq!(ex.run_all(), 2);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert!(!ex.run_next());
    }

    #[test]
    fn tasks_may_submit_more_tasks() {
        let ex = ManualExecutor::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let inner_ex = ex.clone();
        let counter = hits.clone();
        ex.submit(Task::new(move || {
            let counter = counter.clone();
            inner_ex
                .submit(Task::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }))
        .unwrap();
        assert_eq!(ex.run_all(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_drops_and_rejects() {
        let ex = ManualExecutor::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        ex.submit(Task::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        ex.close();
        assert_eq!(ex.queued(), 0);
        assert_eq!(ex.run_all(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(ex.submit(Task::new(|| {})).unwrap_err().is_stopped());
    }
}
