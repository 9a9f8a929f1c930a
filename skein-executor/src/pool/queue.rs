//! The run queue shared by the workers of a [`ThreadPool`].
//!
//! Unbound tasks sit in one FIFO lane per [`Priority`]. Bound tasks sit in a
//! FIFO lane owned by the worker their tag was assigned to.
//!
//! Intensive and custom-tagged tasks count against a sub-pool. A task whose
//! sub-pool is full stays queued, and the workers take the next task of the
//! same lane that fits.
//!
//! [`ThreadPool`]: crate::ThreadPool
use std::collections::{HashMap, VecDeque};

use crate::config::Config;
use crate::task::{Priority, Task, TaskKind};

/// Lifecycle of a pool: `Running → ShuttingDown → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Running,
    ShuttingDown,
    Stopped,
}

/// Where a pushed task landed, so the caller knows whom to wake.
#[must_use = "this `Placement` must be used to wake a worker"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Any worker may take the task.
    Shared,
    /// Only the given worker may take the task.
    Worker(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SubPool {
    Intensive,
    Custom(u64),
}

impl SubPool {
    fn of(kind: TaskKind) -> Option<Self> {
        match kind {
            TaskKind::Intensive => Some(SubPool::Intensive),
            TaskKind::Custom(0) | TaskKind::Bound(_) => None,
            TaskKind::Custom(tag) => Some(SubPool::Custom(tag)),
        }
    }
}

/// Concurrency caps of the sub-pools and how much of each is in use.
#[derive(Debug, Clone)]
pub(crate) struct Limits {
    intensive: usize,
    default_tag: usize,
    tags: HashMap<u64, usize>,
    running: HashMap<SubPool, usize>,
}

impl Limits {
    /// No sub-pool smaller than the pool itself.
    pub(crate) fn unlimited(workers: usize) -> Self {
        Self {
            intensive: workers,
            default_tag: workers,
            tags: HashMap::new(),
            running: HashMap::new(),
        }
    }

    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            intensive: config.intensive_capacity,
            default_tag: config.default_tag_capacity,
            tags: config.custom_tags.clone(),
            running: HashMap::new(),
        }
    }

    fn capacity(&self, pool: SubPool) -> usize {
        match pool {
            SubPool::Intensive => self.intensive,
            SubPool::Custom(tag) => self.tags.get(&tag).copied().unwrap_or(self.default_tag),
        }
    }

    fn has_room(&self, kind: TaskKind) -> bool {
        match SubPool::of(kind) {
            Some(pool) => self.running.get(&pool).copied().unwrap_or(0) < self.capacity(pool),
            None => true,
        }
    }

    fn acquire(&mut self, kind: TaskKind) {
        if let Some(pool) = SubPool::of(kind) {
            *self.running.entry(pool).or_insert(0) += 1;
        }
    }

    /// Returns `true` if a sub-pool slot was freed.
    fn release(&mut self, kind: TaskKind) -> bool {
        let Some(pool) = SubPool::of(kind) else {
            return false;
        };
        let Some(count) = self.running.get_mut(&pool) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.running.remove(&pool);
        }
        true
    }
}

/// A tag's worker and how many of its tasks are queued or running.
#[derive(Debug, Clone, Copy)]
struct Binding {
    worker: usize,
    outstanding: usize,
}

pub(crate) struct RunQueue {
    lanes: [VecDeque<Task>; Priority::COUNT],
    bound: Vec<VecDeque<Task>>,
    /// Bindings live while the tag has queued or running tasks.
    bindings: HashMap<u64, Binding>,
    /// Number of live tags bound to each bound-capable worker.
    tags_per_worker: Vec<usize>,
    limits: Limits,
    lifecycle: Lifecycle,
    len: usize,
}

impl RunQueue {
    pub(crate) fn new(workers: usize, bound_workers: usize) -> Self {
        assert!(bound_workers > 0 && bound_workers <= workers);
        Self {
            lanes: Default::default(),
            bound: (0..workers).map(|_| VecDeque::new()).collect(),
            bindings: HashMap::new(),
            tags_per_worker: vec![0; bound_workers],
            limits: Limits::unlimited(workers),
            lifecycle: Lifecycle::Running,
            len: 0,
        }
    }

    pub(crate) fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Enqueue `task`.
    pub(crate) fn push(&mut self, task: Task) -> Placement {
        self.len += 1;
        match task.kind() {
            TaskKind::Bound(tag) => {
                let worker = self.bind(tag);
                self.bound[worker].push_back(task);
                Placement::Worker(worker)
            }
            _ => {
                self.lanes[task.priority().index()].push_back(task);
                Placement::Shared
            }
        }
    }

    /// Dequeue the next task for `worker`.
    ///
    /// Tasks bound to `worker` go first, then unbound tasks by priority,
    /// skipping those whose sub-pool is full. Every task returned here must
    /// be reported back through [`RunQueue::finish`] once it has run.
    pub(crate) fn pop(&mut self, worker: usize) -> Option<Task> {
        let task = match self.bound[worker].pop_front() {
            Some(task) => task,
            None => self.pop_unbound()?,
        };
        self.len -= 1;
        Some(task)
    }

    fn pop_unbound(&mut self) -> Option<Task> {
        let Self { lanes, limits, .. } = self;
        for lane in lanes.iter_mut() {
            let Some(pos) = lane.iter().position(|task| limits.has_room(task.kind())) else {
                continue;
            };
            let task = lane.remove(pos)?;
            limits.acquire(task.kind());
            return Some(task);
        }
        None
    }

    /// Account for a finished task of `kind`.
    ///
    /// Returns `true` if queued work may have become runnable.
    pub(crate) fn finish(&mut self, kind: TaskKind) -> bool {
        if let TaskKind::Bound(tag) = kind {
            self.unbind(tag);
        }
        self.limits.release(kind) && self.len > 0
    }

    /// Remove every queued task.
    pub(crate) fn take_all(&mut self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.len);
        for lane in self.bound.iter_mut().chain(self.lanes.iter_mut()) {
            tasks.extend(lane.drain(..));
        }
        for task in &tasks {
            if let Some(tag) = task.affinity() {
                self.unbind(tag);
            }
        }
        self.len = 0;
        tasks
    }

    /// Returns the worker `tag` is bound to, binding it to the least loaded
    /// bound-capable worker if it has no outstanding tasks.
    fn bind(&mut self, tag: u64) -> usize {
        if let Some(binding) = self.bindings.get_mut(&tag) {
            binding.outstanding += 1;
            return binding.worker;
        }
        let worker = self
            .tags_per_worker
            .iter()
            .enumerate()
            .min_by_key(|(_, tags)| **tags)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        self.tags_per_worker[worker] += 1;
        self.bindings.insert(
            tag,
            Binding {
                worker,
                outstanding: 1,
            },
        );
        worker
    }

    fn unbind(&mut self, tag: u64) {
        let Some(binding) = self.bindings.get_mut(&tag) else {
            return;
        };
        binding.outstanding -= 1;
        if binding.outstanding == 0 {
            let worker = binding.worker;
            self.bindings.remove(&tag);
            self.tags_per_worker[worker] -= 1;
        }
    }

    #[cfg(test)]
    fn bound_tags(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorded(log: &Arc<Mutex<Vec<u32>>>, id: u32) -> Task {
        let log = log.clone();
        Task::new(move || log.lock().unwrap().push(id))
    }

    fn drain(queue: &mut RunQueue, worker: usize) {
        while let Some(task) = queue.pop(worker) {
            let kind = task.kind();
            task.run().unwrap();
            let _ = queue.finish(kind);
        }
    }

    fn limited(intensive: usize, tags: &[(u64, usize)]) -> Limits {
        Limits {
            intensive,
            default_tag: 4,
            tags: tags.iter().copied().collect(),
            running: HashMap::new(),
        }
    }

    #[test]
    fn fifo_within_priority() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut queue = RunQueue::new(1, 1);
        for id in 0..5 {
            assert_eq!(queue.push(recorded(&log, id)), Placement::Shared);
        }
        assert_eq!(queue.len(), 5);
        drain(&mut queue, 0);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn priority_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut queue = RunQueue::new(1, 1);
        let _ = queue.push(recorded(&log, 1).with_priority(Priority::Background));
        let _ = queue.push(recorded(&log, 2));
        let _ = queue.push(recorded(&log, 3).with_priority(Priority::Emergency));
        let _ = queue.push(recorded(&log, 4));
        drain(&mut queue, 0);
        assert_eq!(*log.lock().unwrap(), vec![3, 2, 4, 1]);
    }

    #[test]
    fn tags_spread_over_bound_workers() {
        let mut queue = RunQueue::new(4, 2);
        let a = queue.push(Task::new(|| {}).bound(10));
        let b = queue.push(Task::new(|| {}).bound(20));
        let c = queue.push(Task::new(|| {}).bound(10));
        assert_eq!(a, Placement::Worker(0));
        assert_eq!(b, Placement::Worker(1));
        assert_eq!(c, Placement::Worker(0));

        // Workers beyond the bound set never see bound tasks.
        assert!(queue.pop(3).is_none());
        assert!(queue.pop(1).is_some());
        assert!(queue.pop(0).is_some());
        assert!(queue.pop(0).is_some());
        assert!(queue.pop(0).is_none());
    }

    #[test]
    fn bound_tasks_run_before_shared() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut queue = RunQueue::new(1, 1);
        let _ = queue.push(recorded(&log, 1).with_priority(Priority::Emergency));
        let _ = queue.push(recorded(&log, 2).bound(7));
        drain(&mut queue, 0);
        assert_eq!(*log.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn binding_released_once_tag_is_idle() {
        let mut queue = RunQueue::new(2, 2);
        for tag in 0..100 {
            let _ = queue.push(Task::new(|| {}).bound(tag));
            drain(&mut queue, 0);
            drain(&mut queue, 1);
        }
        assert_eq!(queue.bound_tags(), 0);
        assert_eq!(queue.tags_per_worker, vec![0, 0]);
    }

    #[test]
    fn binding_held_while_task_runs() {
        let mut queue = RunQueue::new(2, 2);
        assert_eq!(queue.push(Task::new(|| {}).bound(5)), Placement::Worker(0));
        let running = queue.pop(0).unwrap();
        // Another tag takes the idle worker; tag 5 stays put while running.
        assert_eq!(queue.push(Task::new(|| {}).bound(6)), Placement::Worker(1));
        assert_eq!(queue.push(Task::new(|| {}).bound(5)), Placement::Worker(0));
        let _ = queue.finish(running.kind());
        assert_eq!(queue.bound_tags(), 2);
        drain(&mut queue, 0);
        drain(&mut queue, 1);
        assert_eq!(queue.bound_tags(), 0);
    }

    #[test]
    fn full_sub_pool_is_skipped() {
        let mut queue = RunQueue::new(4, 4).with_limits(limited(1, &[(9, 2)]));
        let _ = queue.push(Task::new(|| {}).intensive());
        let _ = queue.push(Task::new(|| {}).intensive());
        let _ = queue.push(Task::new(|| {}).tagged(9));
        let _ = queue.push(Task::new(|| {}).tagged(9));
        let _ = queue.push(Task::new(|| {}).tagged(9));
        let _ = queue.push(Task::new(|| {}));

        let first = queue.pop(0).unwrap();
        assert_eq!(first.kind(), TaskKind::Intensive);
        // The second intensive task waits; two tagged tasks fit.
        assert_eq!(queue.pop(1).unwrap().kind(), TaskKind::Custom(9));
        assert_eq!(queue.pop(2).unwrap().kind(), TaskKind::Custom(9));
        assert_eq!(queue.pop(3).unwrap().kind(), TaskKind::Custom(0));
        assert!(queue.pop(3).is_none());
        assert_eq!(queue.len(), 2);

        assert!(queue.finish(first.kind()));
        assert_eq!(queue.pop(0).unwrap().kind(), TaskKind::Intensive);
        assert!(queue.finish(TaskKind::Custom(9)));
        assert_eq!(queue.pop(1).unwrap().kind(), TaskKind::Custom(9));
        assert_eq!(queue.len(), 0);
        assert!(!queue.finish(TaskKind::Custom(0)));
    }

    #[test]
    fn unregistered_tags_use_default_capacity() {
        let mut queue = RunQueue::new(4, 4).with_limits(Limits {
            default_tag: 1,
            ..limited(4, &[])
        });
        let _ = queue.push(Task::new(|| {}).tagged(3));
        let _ = queue.push(Task::new(|| {}).tagged(3));
        let _ = queue.push(Task::new(|| {}).tagged(4));
        assert_eq!(queue.pop(0).unwrap().kind(), TaskKind::Custom(3));
        assert_eq!(queue.pop(1).unwrap().kind(), TaskKind::Custom(4));
        assert!(queue.pop(2).is_none());
    }

    #[test]
    fn take_all_empties_queue() {
        let mut queue = RunQueue::new(2, 2);
        let _ = queue.push(Task::new(|| {}));
        let _ = queue.push(Task::new(|| {}).bound(1));
        let _ = queue.push(Task::new(|| {}).with_priority(Priority::Background));
        let tasks = queue.take_all();
        assert_eq!(tasks.len(), 3);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.bound_tags(), 0);
        assert!(queue.pop(0).is_none());
        assert!(queue.pop(1).is_none());
    }
}
