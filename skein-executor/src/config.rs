//! [`Builder`] for configuring a [`ThreadPool`].
//!
//! Settings are resolved in this order, highest priority first:
//!
//! 1. values set through builder methods,
//! 2. `SKEIN_*` environment variables, when [`Builder::from_env`] is called,
//! 3. built-in defaults.
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `SKEIN_WORKER_THREADS` | `usize` | [`Builder::worker_threads`] |
//! | `SKEIN_THREAD_STACK_SIZE` | `usize` | [`Builder::stack_size`] |
//! | `SKEIN_THREAD_NAME_PREFIX` | `String` | [`Builder::thread_name`] |
//! | `SKEIN_BOUND_WORKERS` | `usize` | [`Builder::bound_workers`] |
//! | `SKEIN_INTENSIVE_CAPACITY` | `usize` | [`Builder::intensive_capacity`] |
//!
//! Builder methods called after [`Builder::from_env`] override the
//! environment, so call it first.
use std::collections::HashMap;

use crate::error::BuildError;
use crate::ThreadPool;

/// Environment variable name for the worker thread count.
pub const ENV_WORKER_THREADS: &str = "SKEIN_WORKER_THREADS";
/// Environment variable name for the worker stack size in bytes.
pub const ENV_THREAD_STACK_SIZE: &str = "SKEIN_THREAD_STACK_SIZE";
/// Environment variable name for the worker thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "SKEIN_THREAD_NAME_PREFIX";
/// Environment variable name for the number of workers that accept bound tasks.
pub const ENV_BOUND_WORKERS: &str = "SKEIN_BOUND_WORKERS";
/// Environment variable name for how many intensive tasks may run at once.
pub const ENV_INTENSIVE_CAPACITY: &str = "SKEIN_INTENSIVE_CAPACITY";

const DEFAULT_THREAD_NAME: &str = "skein-worker";

/// Configures and builds a [`ThreadPool`].
///
/// ```rust
/// let pool = skein_executor::ThreadPool::builder()
///     .worker_threads(2)
///     .thread_name("doc-worker")
///     .build()
///     .unwrap();
/// assert_eq!(pool.worker_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    worker_threads: Option<usize>,
    thread_name: String,
    stack_size: Option<usize>,
    bound_workers: Option<usize>,
    intensive_capacity: Option<usize>,
    custom_tags: HashMap<u64, usize>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Construct a [`Builder`] with default settings.
    pub fn new() -> Self {
        Self {
            worker_threads: None,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
            bound_workers: None,
            intensive_capacity: None,
            custom_tags: HashMap::new(),
        }
    }

    /// Set the number of worker threads.
    ///
    /// Defaults to the number of CPUs.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n);
        self
    }

    /// Set the prefix used to name worker threads.
    ///
    /// Workers are named `{prefix}-{index}`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Set the stack size of worker threads in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Set how many workers may own bound tags.
    ///
    /// Tags passed to [`Task::bound`] are spread over the first `n` workers,
    /// leaving the rest free for unbound work. Clamped to
    /// `1..=worker_threads`; defaults to every worker.
    ///
    /// [`Task::bound`]: crate::Task::bound
    pub fn bound_workers(mut self, n: usize) -> Self {
        self.bound_workers = Some(n);
        self
    }

    /// Set how many [`TaskKind::Intensive`] tasks may run at once.
    ///
    /// Clamped to `1..=worker_threads`; defaults to the number of CPUs.
    ///
    /// [`TaskKind::Intensive`]: crate::TaskKind::Intensive
    pub fn intensive_capacity(mut self, n: usize) -> Self {
        self.intensive_capacity = Some(n);
        self
    }

    /// Cap how many tasks tagged with `tag` may run at once.
    ///
    /// Tasks join a sub-pool through [`Task::tagged`]. Tags never registered
    /// here share the default cap of one task per CPU. Tag `0` is the whole
    /// pool and cannot be capped. The capacity is clamped to
    /// `1..=worker_threads`.
    ///
    /// [`Task::tagged`]: crate::Task::tagged
    pub fn custom_tag(mut self, tag: u64, capacity: usize) -> Self {
        if tag != 0 {
            self.custom_tags.insert(tag, capacity);
        }
        self
    }

    /// Apply `SKEIN_*` environment variable overrides.
    ///
    /// Only variables present in the environment are applied. A variable
    /// that is set but cannot be parsed is an error.
    pub fn from_env(mut self) -> Result<Self, BuildError> {
        if let Some(val) = read_env(ENV_WORKER_THREADS) {
            self.worker_threads = Some(parse_usize(ENV_WORKER_THREADS, &val)?);
        }
        if let Some(val) = read_env(ENV_THREAD_STACK_SIZE) {
            self.stack_size = Some(parse_usize(ENV_THREAD_STACK_SIZE, &val)?);
        }
        if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
            self.thread_name = val;
        }
        if let Some(val) = read_env(ENV_BOUND_WORKERS) {
            self.bound_workers = Some(parse_usize(ENV_BOUND_WORKERS, &val)?);
        }
        if let Some(val) = read_env(ENV_INTENSIVE_CAPACITY) {
            self.intensive_capacity = Some(parse_usize(ENV_INTENSIVE_CAPACITY, &val)?);
        }
        Ok(self)
    }

    /// Spawn the worker threads and return the running [`ThreadPool`].
    pub fn build(self) -> Result<ThreadPool, BuildError> {
        let config = self.into_config()?;
        ThreadPool::with_config(config)
    }

    fn into_config(self) -> Result<Config, BuildError> {
        let worker_threads = self.worker_threads.unwrap_or_else(num_cpus::get);
        if worker_threads == 0 {
            return Err(BuildError::no_workers());
        }
        let bound_workers = self
            .bound_workers
            .unwrap_or(worker_threads)
            .clamp(1, worker_threads);
        let cpus = num_cpus::get().clamp(1, worker_threads);
        let intensive_capacity = self
            .intensive_capacity
            .unwrap_or(cpus)
            .clamp(1, worker_threads);
        let custom_tags = self
            .custom_tags
            .into_iter()
            .map(|(tag, capacity)| (tag, capacity.clamp(1, worker_threads)))
            .collect();
        Ok(Config {
            worker_threads,
            thread_name: self.thread_name,
            stack_size: self.stack_size,
            bound_workers,
            intensive_capacity,
            default_tag_capacity: cpus,
            custom_tags,
        })
    }
}

/// Resolved pool settings.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) worker_threads: usize,
    pub(crate) thread_name: String,
    pub(crate) stack_size: Option<usize>,
    pub(crate) bound_workers: usize,
    pub(crate) intensive_capacity: usize,
    pub(crate) default_tag_capacity: usize,
    pub(crate) custom_tags: HashMap<u64, usize>,
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, BuildError> {
    val.trim()
        .parse::<usize>()
        .map_err(|e| BuildError::invalid_env(var, val, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Builder::new().into_config().unwrap();
        assert_eq!(config.worker_threads, num_cpus::get());
        assert_eq!(config.bound_workers, config.worker_threads);
        assert_eq!(config.thread_name, "skein-worker");
        assert!(config.stack_size.is_none());
        assert_eq!(
            config.intensive_capacity,
            num_cpus::get().min(config.worker_threads)
        );
        assert!(config.custom_tags.is_empty());
    }

    #[test]
    fn sub_pool_capacities_clamped() {
        let config = Builder::new()
            .worker_threads(4)
            .intensive_capacity(0)
            .custom_tag(1, 2)
            .custom_tag(2, 100)
            .custom_tag(0, 1)
            .into_config()
            .unwrap();
        assert_eq!(config.intensive_capacity, 1);
        assert_eq!(config.custom_tags.get(&1), Some(&2));
        assert_eq!(config.custom_tags.get(&2), Some(&4));
        assert!(!config.custom_tags.contains_key(&0));
        assert!(config.default_tag_capacity <= 4);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = Builder::new().worker_threads(0).into_config().unwrap_err();
        assert!(err.to_string().contains("at least one worker"));
    }

    #[test]
    fn bound_workers_clamped() {
        let config = Builder::new()
            .worker_threads(3)
            .bound_workers(10)
            .into_config()
            .unwrap();
        assert_eq!(config.bound_workers, 3);

        let config = Builder::new()
            .worker_threads(3)
            .bound_workers(0)
            .into_config()
            .unwrap();
        assert_eq!(config.bound_workers, 1);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_usize(ENV_WORKER_THREADS, "four").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_WORKER_THREADS), "{msg}");
        assert!(msg.contains("four"), "{msg}");
        assert_eq!(parse_usize(ENV_WORKER_THREADS, " 4 ").unwrap(), 4);
    }
}
