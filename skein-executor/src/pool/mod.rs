//! A fixed-size pool of worker threads pulling from one shared run queue.
use std::sync::Arc;
use std::{fmt, mem, thread};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use crate::config::{Builder, Config};
use crate::context::Context;
use crate::error::{BuildError, SubmitError};
use crate::task::Task;
use crate::Executor;

mod queue;
mod worker;

use queue::{Lifecycle, Limits, Placement, RunQueue};

const LOG: &str = "skein_executor::pool";

/// What [`ThreadPool::shutdown`] does with tasks that are still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Run every queued task before the workers exit.
    Drain,
    /// Take queued tasks off the queue without running them.
    ///
    /// Discarded tasks are kept, unrun, until the [`ThreadPool`] is dropped.
    /// Futures fed by them stay pending until then; they are not cancelled
    /// by the shutdown itself.
    Discard,
}

/// A pool of worker threads executing [`Task`]s.
///
/// Each worker repeatedly dequeues one task and runs it to completion before
/// dequeuing the next. Unbound tasks are taken in priority order and FIFO
/// within a priority.
///
/// Tasks are submitted through a [`Handle`], obtained with
/// [`ThreadPool::handle`]. Dropping the [`ThreadPool`] shuts it down with
/// [`ShutdownMode::Drain`] and joins the workers.
///
/// ```rust
/// use skein_executor::{Executor, Task, ThreadPool};
/// use std::sync::mpsc;
///
/// let pool = ThreadPool::builder().worker_threads(2).build().unwrap();
/// let (tx, rx) = mpsc::channel();
/// pool.handle()
///     .submit(Task::new(move || tx.send(1 + 1).unwrap()))
///     .unwrap();
/// assert_eq!(rx.recv().unwrap(), 2);
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.shared.config.worker_threads)
            .field("queued", &self.queued())
            .finish()
    }
}

/// A cloneable handle used to submit tasks to a [`ThreadPool`].
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").finish()
    }
}

pub(crate) struct Shared {
    queue: Mutex<RunQueue>,
    condvar: Condvar,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    discarded: Mutex<Vec<Task>>,
    config: Config,
}

impl ThreadPool {
    /// Returns a [`Builder`] for configuring a new [`ThreadPool`].
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Construct a [`ThreadPool`] with `workers` threads and default settings.
    pub fn new(workers: usize) -> Result<Self, BuildError> {
        Builder::new().worker_threads(workers).build()
    }

    pub(crate) fn with_config(config: Config) -> Result<Self, BuildError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(
                RunQueue::new(config.worker_threads, config.bound_workers)
                    .with_limits(Limits::from_config(&config)),
            ),
            condvar: Condvar::new(),
            threads: Mutex::new(Vec::with_capacity(config.worker_threads)),
            discarded: Mutex::new(Vec::new()),
            config,
        });
        let pool = ThreadPool { shared };
        for index in 0..pool.shared.config.worker_threads {
            if let Err(err) = worker::spawn(&pool.shared, index) {
                // Stop the workers that did start before reporting.
                pool.shutdown(ShutdownMode::Discard);
                return Err(err);
            }
        }
        Ok(pool)
    }

    /// Returns a [`Handle`] for submitting tasks to this pool.
    pub fn handle(&self) -> Handle {
        Handle {
            shared: self.shared.clone(),
        }
    }

    /// Returns the number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.shared.config.worker_threads
    }

    /// Returns the number of tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Returns `true` once [`ThreadPool::shutdown`] has begun.
    pub fn is_shutdown(&self) -> bool {
        self.shared.queue.lock().lifecycle() != Lifecycle::Running
    }

    /// Stop accepting tasks and join the worker threads.
    ///
    /// With [`ShutdownMode::Drain`] the workers finish every queued task
    /// first. With [`ShutdownMode::Discard`] queued tasks are set aside
    /// unrun. Any [`Executor::submit`] after this call begins fails with
    /// [`SubmitError`].
    ///
    /// Calling this from one of the pool's own workers stops intake and
    /// wakes the other workers, but cannot join the calling thread. The
    /// pool then stays shutting down until a later call from outside the
    /// pool, such as dropping the [`ThreadPool`], joins that worker. Once
    /// every worker has been joined further calls are no-ops.
    pub fn shutdown(&self, mode: ShutdownMode) {
        {
            let mut queue = self.shared.queue.lock();
            match queue.lifecycle() {
                Lifecycle::Stopped => return,
                Lifecycle::ShuttingDown => {}
                Lifecycle::Running => {
                    queue.set_lifecycle(Lifecycle::ShuttingDown);
                    if mode == ShutdownMode::Discard {
                        let tasks = queue.take_all();
                        debug!(target: LOG, "shutdown.discard count={}", tasks.len());
                        self.shared.discarded.lock().extend(tasks);
                    }
                }
            }
        }
        self.shared.condvar.notify_all();

        let current = thread::current().id();
        let threads = mem::take(&mut *self.shared.threads.lock());
        if threads.is_empty() {
            return;
        }
        let mut skipped = None;
        for handle in threads {
            if handle.thread().id() == current {
                warn!(target: LOG, "shutdown.from_worker");
                skipped = Some(handle);
                continue;
            }
            if handle.join().is_err() {
                warn!(target: LOG, "shutdown.worker_panicked");
            }
        }

        match skipped {
            Some(handle) => self.shared.threads.lock().push(handle),
            None => {
                self.shared.queue.lock().set_lifecycle(Lifecycle::Stopped);
                debug!(target: LOG, "shutdown.stopped mode={:?}", mode);
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown(ShutdownMode::Drain);
        // Release discarded tasks outside of the lock; dropping them may
        // resolve promises and run continuations.
        let discarded = mem::take(&mut *self.shared.discarded.lock());
        drop(discarded);
    }
}

impl Handle {
    /// Returns a [`Handle`] to the pool the current thread works for.
    ///
    /// ### Panics
    /// This function will panic if called from outside of a pool worker.
    pub fn current() -> Self {
        Self::try_current().expect("not running on a pool worker")
    }

    /// Returns a [`Handle`] to the pool the current thread works for, if any.
    pub fn try_current() -> Option<Self> {
        Context::handle()
    }

    /// Returns `true` if the current thread is a worker of this pool.
    pub fn is_current(&self) -> bool {
        Context::handle().is_some_and(|h| Arc::ptr_eq(&h.shared, &self.shared))
    }

    /// Returns the index of the worker running the current thread, if any.
    pub fn current_worker() -> Option<usize> {
        Context::worker_index()
    }
}

impl Executor for Handle {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        let placement = {
            let mut queue = self.shared.queue.lock();
            if queue.lifecycle() != Lifecycle::Running {
                debug!(target: LOG, "submit.rejected");
                return Err(SubmitError::stopped(task));
            }
            queue.push(task)
        };
        match placement {
            Placement::Shared => {
                self.shared.condvar.notify_one();
            }
            Placement::Worker(_) => {
                // Workers share one condvar; wake all so the owner sees it.
                self.shared.condvar.notify_all();
            }
        }
        Ok(())
    }
}
