use std::any::Any;
use std::fmt;
use std::panic;

/// Scheduling priority of a [`Task`].
///
/// A [`ThreadPool`] runs every queued [`Priority::Emergency`] task before any
/// [`Priority::Regular`] one, and every regular task before any
/// [`Priority::Background`] one. Tasks of equal priority run in submission
/// order.
///
/// [`ThreadPool`]: crate::ThreadPool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Runs ahead of everything else in the queue.
    Emergency,
    /// The default priority.
    #[default]
    Regular,
    /// Runs only when nothing more urgent is queued.
    Background,
}

impl Priority {
    pub(crate) const COUNT: usize = 3;

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Which part of a [`ThreadPool`] a [`Task`] is accounted against.
///
/// [`ThreadPool`]: crate::ThreadPool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Ordinary work. Tag `0` is the whole pool; any other tag is a sub-pool
    /// whose concurrency is capped by [`Builder::custom_tag`].
    ///
    /// [`Builder::custom_tag`]: crate::Builder::custom_tag
    Custom(u64),
    /// CPU-heavy work, capped by [`Builder::intensive_capacity`].
    ///
    /// [`Builder::intensive_capacity`]: crate::Builder::intensive_capacity
    Intensive,
    /// Work pinned to the worker that owns the tag.
    Bound(u64),
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::Custom(0)
    }
}

/// A unit of work accepted by an [`Executor`].
///
/// A [`Task`] wraps a side-effecting closure. Tasks that feed a future
/// capture the promise they resolve; dropping such a task without running it
/// releases that promise.
///
/// [`Executor`]: crate::Executor
pub struct Task {
    job: Box<dyn FnOnce() + Send + 'static>,
    priority: Priority,
    kind: TaskKind,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Task {
    /// Wrap `job` in a [`Task`] with [`Priority::Regular`] that any worker
    /// may run.
    pub fn new<F>(job: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            job: Box::new(job),
            priority: Priority::default(),
            kind: TaskKind::default(),
        }
    }

    /// Set the priority of this task.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Bind this task to `tag`.
    ///
    /// A [`ThreadPool`] runs every task bound to the same tag on the same
    /// worker thread, in submission order. Executors without worker threads
    /// ignore the binding.
    ///
    /// [`ThreadPool`]: crate::ThreadPool
    pub fn bound(mut self, tag: u64) -> Self {
        self.kind = TaskKind::Bound(tag);
        self
    }

    /// Count this task against the custom sub-pool `tag`.
    ///
    /// At most the capacity registered with [`Builder::custom_tag`] tasks of
    /// one tag run at once. Tag `0` means the whole pool.
    ///
    /// [`Builder::custom_tag`]: crate::Builder::custom_tag
    pub fn tagged(mut self, tag: u64) -> Self {
        self.kind = TaskKind::Custom(tag);
        self
    }

    /// Mark this task as CPU-heavy.
    pub fn intensive(mut self) -> Self {
        self.kind = TaskKind::Intensive;
        self
    }

    /// Set the [`TaskKind`] of this task.
    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the priority of this task.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the [`TaskKind`] of this task.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the tag this task is bound to, if any.
    pub fn affinity(&self) -> Option<u64> {
        match self.kind {
            TaskKind::Bound(tag) => Some(tag),
            _ => None,
        }
    }

    /// Run the task to completion on the current thread.
    ///
    /// A panic raised by the task is caught and returned as [`Panic`] so
    /// that the calling thread survives it.
    pub fn run(self) -> Result<(), Panic> {
        let job = self.job;
        panic::catch_unwind(panic::AssertUnwindSafe(job)).map_err(Panic::new)
    }
}

/// A panic captured while running a [`Task`].
pub struct Panic {
    payload: Box<dyn Any + Send + 'static>,
}

impl Panic {
    fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self { payload }
    }

    /// Returns the panic message, if the payload was a string.
    pub fn message(&self) -> &str {
        panic_message(self.payload.as_ref())
    }

    /// Returns the raw panic payload.
    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }
}

impl fmt::Debug for Panic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Panic").field(&self.message()).finish()
    }
}

impl fmt::Display for Panic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message())
    }
}

impl std::error::Error for Panic {}

/// Extract the message from a panic payload.
///
/// Payloads produced by `panic!` are either `&'static str` or `String`.
/// Anything else yields a placeholder.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
