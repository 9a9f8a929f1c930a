//! Submitting work to an [`Executor`] and getting a [`Future`] back.
//!
//! Every function here wraps the work in a [`Task`] whose body resolves a
//! fresh [`Promise`]. The returned future is bound to the executor, so
//! combinators on it dispatch there as well.
//!
//! If the executor refuses the task, the task and its promise are dropped
//! and the returned future is [`Status::Cancelled`]. If the future is
//! cancelled before a worker picks the task up, the work is skipped.
//!
//! ```rust
//! use skein_executor::ThreadPool;
//! use skein_future::tasks;
//!
//! let pool = ThreadPool::new(2).unwrap();
//! let answer = tasks::run(&pool.handle(), || 6 * 7);
//! assert_eq!(answer.get().unwrap(), 42);
//! ```
//!
//! [`Status::Cancelled`]: crate::Status::Cancelled
use std::sync::Arc;

use log::{debug, trace};
use skein_executor::{Executor, Priority, Task, TaskKind};

use crate::cancel::CancelToken;
use crate::collect::sequence;
use crate::combinators::guarded;
use crate::error::Error;
use crate::failure::Failure;
use crate::future::Future;
use crate::promise::Promise;

const LOG: &str = "skein_future::tasks";

/// Scheduling options for tasks submitted through [`run_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOptions {
    priority: Priority,
    kind: TaskKind,
}

impl TaskOptions {
    /// Default options: [`Priority::Regular`] on the whole pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the task priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Bind the task to `tag`; see [`Task::bound`].
    pub fn bound(mut self, tag: u64) -> Self {
        self.kind = TaskKind::Bound(tag);
        self
    }

    /// Count the task against custom sub-pool `tag`; see [`Task::tagged`].
    pub fn tagged(mut self, tag: u64) -> Self {
        self.kind = TaskKind::Custom(tag);
        self
    }

    /// Mark the task as CPU-heavy; see [`Task::intensive`].
    pub fn intensive(mut self) -> Self {
        self.kind = TaskKind::Intensive;
        self
    }

    fn apply(self, task: Task) -> Task {
        task.with_priority(self.priority).with_kind(self.kind)
    }
}

/// Submit `body` to `executor`, handing it the promise of the returned
/// future.
fn submit<E, T, F>(executor: &E, options: TaskOptions, body: F) -> Future<T>
where
    E: Executor + Clone,
    T: Send + Sync + 'static,
    F: FnOnce(Promise<T>) + Send + 'static,
{
    let promise = Promise::new();
    let future = promise.future().via(executor.clone());
    let task = options.apply(Task::new(move || {
        if promise.is_completed() {
            trace!(target: LOG, "run.skip_cancelled");
            return;
        }
        body(promise);
    }));
    if let Err(err) = executor.submit(task) {
        // Dropping the refused task drops the promise, cancelling the future.
        debug!(target: LOG, "run.rejected {}", err);
    }
    future
}

/// Run `f` on `executor`.
///
/// A panic in `f` fails the returned future with a [`Panicked`] failure.
///
/// [`Panicked`]: crate::Panicked
pub fn run<E, T, F>(executor: &E, f: F) -> Future<T>
where
    E: Executor + Clone,
    T: Send + Sync + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    run_with(executor, TaskOptions::default(), f)
}

/// Run `f` on `executor` with the given [`TaskOptions`].
pub fn run_with<E, T, F>(executor: &E, options: TaskOptions, f: F) -> Future<T>
where
    E: Executor + Clone,
    T: Send + Sync + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    submit(executor, options, move |promise| {
        promise.settle(guarded(f));
    })
}

/// Run the fallible `f` on `executor`. An `Err` fails the future.
pub fn try_run<E, T, X, F>(executor: &E, f: F) -> Future<T>
where
    E: Executor + Clone,
    T: Send + Sync + 'static,
    X: Into<Failure>,
    F: FnOnce() -> Result<T, X> + Send + 'static,
{
    submit(executor, TaskOptions::default(), move |promise| {
        promise.settle(guarded(f).and_then(|res| res.map_err(Into::into)));
    })
}

/// Run `f` on `executor` and continue with the future it returns.
pub fn run_flat<E, T, F>(executor: &E, f: F) -> Future<T>
where
    E: Executor + Clone,
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Future<T> + Send + 'static,
{
    submit(executor, TaskOptions::default(), move |promise| match guarded(f) {
        Ok(inner) => inner.forward(promise),
        Err(failure) => {
            promise.try_failure(failure);
        }
    })
}

/// Run `f` on `executor`, letting it watch for cancellation of the returned
/// future through a [`CancelToken`].
///
/// ```rust
/// use skein_executor::ManualExecutor;
/// use skein_future::tasks;
///
/// let ex = ManualExecutor::new();
/// let future = tasks::run_cancellable(&ex, |token| token.is_cancelled());
/// ex.run_all();
/// assert!(!future.get().unwrap());
/// ```
pub fn run_cancellable<E, T, F>(executor: &E, f: F) -> Future<T>
where
    E: Executor + Clone,
    T: Send + Sync + 'static,
    F: FnOnce(&CancelToken) -> T + Send + 'static,
{
    submit(executor, TaskOptions::default(), move |promise| {
        let token = promise.cancel_token();
        promise.settle(guarded(|| f(&token)));
    })
}

/// Submit a side-effecting job with no future attached.
///
/// Fails with [`ErrorKind::SchedulerStopped`] if the executor refuses the
/// job. A panic in `f` is logged by the executor.
///
/// [`ErrorKind::SchedulerStopped`]: crate::ErrorKind::SchedulerStopped
pub fn run_and_forget<E, F>(executor: &E, f: F) -> Result<(), Error>
where
    E: Executor,
    F: FnOnce() + Send + 'static,
{
    executor.submit(Task::new(f)).map_err(Error::from)
}

/// Run `f` once per item, one task per item, collecting the results in
/// input order.
pub fn run_each<E, I, X, T, F>(executor: &E, items: I, f: F) -> Future<Vec<T>>
where
    E: Executor + Clone,
    I: IntoIterator<Item = X>,
    X: Send + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(X) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let futures: Vec<_> = items
        .into_iter()
        .map(|item| {
            let f = f.clone();
            run(executor, move || (*f)(item))
        })
        .collect();
    sequence(futures).via(executor.clone())
}

/// Run `f` over `items` in contiguous clusters of at least `min_cluster`
/// items, one task per cluster, collecting the results in input order.
///
/// Fewer than `min_cluster` items run as a single cluster. A `min_cluster`
/// of zero is treated as one.
pub fn clustered_run<E, X, T, F>(
    executor: &E,
    items: Vec<X>,
    min_cluster: usize,
    f: F,
) -> Future<Vec<T>>
where
    E: Executor + Clone,
    X: Send + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(X) -> T + Send + Sync + 'static,
{
    if items.is_empty() {
        return Future::successful(Vec::new()).via(executor.clone());
    }
    let sizes = cluster_sizes(items.len(), min_cluster);
    trace!(
        target: LOG,
        "clustered_run.split items={} clusters={}",
        items.len(),
        sizes.len()
    );
    let f = Arc::new(f);
    let mut items = items.into_iter();
    let clusters: Vec<_> = sizes
        .into_iter()
        .map(|size| {
            let chunk: Vec<X> = items.by_ref().take(size).collect();
            let f = f.clone();
            run(executor, move || {
                chunk.into_iter().map(|item| (*f)(item)).collect::<Vec<T>>()
            })
        })
        .collect();
    sequence(clusters)
        .map(|chunks| chunks.into_iter().flatten().collect::<Vec<T>>())
        .via(executor.clone())
}

/// Split `total` items into as many clusters of at least `min_cluster` as
/// possible, spreading the remainder over the first clusters.
fn cluster_sizes(total: usize, min_cluster: usize) -> Vec<usize> {
    let min_cluster = min_cluster.max(1);
    let count = (total / min_cluster).max(1);
    let (base, extra) = (total / count, total % count);
    (0..count).map(|i| base + usize::from(i < extra)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use skein_executor::{InlineExecutor, ManualExecutor};

    use super::*;
    use crate::{Panicked, Status};

    #[test]
    fn run_resolves_through_executor() {
        let ex = ManualExecutor::new();
        let future = run(&ex, || 5);
        assert_eq!(future.status(), Status::Pending);
        assert_eq!(ex.run_all(), 1);
        assert_eq!(*future.value().unwrap(), 5);
    }

    #[test]
    fn refused_task_cancels_future() {
        let ex = ManualExecutor::new();
        ex.close();
        let future = run(&ex, || 5);
        assert!(future.is_cancelled());
        let err = run_and_forget(&ex, || {}).unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::SchedulerStopped));
    }

    #[test]
    fn cancelled_before_start_skips_work() {
        let ex = ManualExecutor::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let future = run(&ex, move || flag.store(true, Ordering::SeqCst));
        assert!(future.cancel());
        ex.run_all();
        assert!(!ran.load(Ordering::SeqCst));
        assert!(future.is_cancelled());
    }

    #[test]
    fn try_run_and_panics() {
        let failed = try_run(&InlineExecutor, || Err::<u8, _>(Failure::msg("nope")));
        assert_eq!(failed.error().unwrap().to_string(), "nope");
        let ok = try_run(&InlineExecutor, || Ok::<_, Failure>(3));
        assert_eq!(*ok.value().unwrap(), 3);
        let panicked = run(&InlineExecutor, || -> u8 { panic!("task blew up") });
        assert!(panicked.error().unwrap().is::<Panicked>());
    }

    #[test]
    fn run_flat_follows_inner() {
        let inner = Promise::new();
        let inner_future = inner.future();
        let future = run_flat(&InlineExecutor, move || inner_future);
        assert!(!future.is_completed());
        inner.success('z').unwrap();
        assert_eq!(*future.value().unwrap(), 'z');
    }

    #[test]
    fn cancel_token_observes_cancellation() {
        let ex = ManualExecutor::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let future = run_cancellable(&ex, move |token| {
            tx.send(token.clone()).unwrap();
        });
        ex.run_all();
        let token = rx.recv().unwrap();
        assert!(!token.is_cancelled());
        assert!(future.is_succeeded());

        let pending = Promise::<()>::new();
        let token = pending.cancel_token();
        pending.future().cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cluster_split() {
        assert_eq!(cluster_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(cluster_sizes(2, 5), vec![2]);
        assert_eq!(cluster_sizes(4, 0), vec![1, 1, 1, 1]);
    }

    #[test]
    fn each_and_clustered_keep_order() {
        let ex = ManualExecutor::new();
        let each = run_each(&ex, 0..5u32, |x| x * x);
        let clustered = clustered_run(&ex, (0..10u32).collect(), 3, |x| x + 1);
        ex.run_all();
        assert_eq!(*each.value().unwrap(), vec![0, 1, 4, 9, 16]);
        assert_eq!(*clustered.value().unwrap(), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn options_reach_the_task() {
        let options = TaskOptions::new().priority(Priority::Background).bound(3);
        let task = options.apply(Task::new(|| {}));
        assert_eq!(task.priority(), Priority::Background);
        assert_eq!(task.affinity(), Some(3));

        let task = TaskOptions::new().tagged(8).apply(Task::new(|| {}));
        assert_eq!(task.kind(), TaskKind::Custom(8));
        let task = TaskOptions::new().intensive().apply(Task::new(|| {}));
        assert_eq!(task.kind(), TaskKind::Intensive);
    }
}
