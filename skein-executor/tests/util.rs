use std::time::Duration;

use skein_executor::ThreadPool;

/// How long a test waits for a result before declaring a hang.
#[allow(dead_code)]
pub const TIMEOUT: Duration = Duration::from_secs(10);

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Build a pool with `workers` threads and logging enabled.
#[allow(dead_code)]
pub fn with_test_pool(workers: usize) -> Result<ThreadPool, Box<dyn std::error::Error>> {
    init_logging();
    Ok(ThreadPool::builder()
        .worker_threads(workers)
        .thread_name("skein-test")
        .build()?)
}
