use std::sync::Arc;
use std::thread;

use log::{debug, trace, warn};

use super::queue::Lifecycle;
use super::{Handle, Shared, LOG};
use crate::context::Context;
use crate::error::BuildError;
use crate::task::Task;

/// Start worker `index` and register its join handle with the pool.
pub(super) fn spawn(shared: &Arc<Shared>, index: usize) -> Result<(), BuildError> {
    let mut builder =
        thread::Builder::new().name(format!("{}-{}", shared.config.thread_name, index));
    if let Some(stack_size) = shared.config.stack_size {
        builder = builder.stack_size(stack_size);
    }
    let worker_shared = shared.clone();
    let handle = builder
        .spawn(move || run(worker_shared, index))
        .map_err(BuildError::spawn)?;
    shared.threads.lock().push(handle);
    Ok(())
}

fn run(shared: Arc<Shared>, index: usize) {
    let _guard = Context::enter(
        Handle {
            shared: shared.clone(),
        },
        index,
    );
    debug!(target: LOG, "worker.start index={}", index);
    while let Some(task) = next(&shared, index) {
        let kind = task.kind();
        trace!(target: LOG, "worker.run index={} kind={:?}", index, kind);
        if let Err(panic) = task.run() {
            warn!(target: LOG, "worker.task_panicked index={} {}", index, panic);
        }
        if shared.queue.lock().finish(kind) {
            // A sub-pool slot opened up; idle workers may skip past it.
            shared.condvar.notify_all();
        }
    }
    debug!(target: LOG, "worker.stop index={}", index);
}

/// Block until a task is available for worker `index`.
///
/// Returns `None` once the pool is shutting down and nothing is runnable for
/// this worker. Tasks held back by a full sub-pool are left to the workers
/// holding its slots.
fn next(shared: &Shared, index: usize) -> Option<Task> {
    let mut queue = shared.queue.lock();
    loop {
        if let Some(task) = queue.pop(index) {
            return Some(task);
        }
        if queue.lifecycle() != Lifecycle::Running {
            return None;
        }
        shared.condvar.wait(&mut queue);
    }
}
