use std::cell::RefCell;

use crate::pool::Handle;

thread_local! {
    static CURRENT: RefCell<Option<Worker>> = const { RefCell::new(None) };
}

#[derive(Clone)]
struct Worker {
    handle: Handle,
    index: usize,
}

pub(crate) struct Context;

impl Context {
    /// Mark the current thread as worker `index` of the pool behind `handle`.
    pub(crate) fn enter(handle: Handle, index: usize) -> ContextGuard {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            assert!(current.is_none(), "worker context already set");
            *current = Some(Worker { handle, index });
        });
        ContextGuard {}
    }

    /// Returns the pool the current thread works for.
    pub(crate) fn handle() -> Option<Handle> {
        CURRENT.with(|c| c.borrow().as_ref().map(|w| w.handle.clone()))
    }

    /// Returns the worker index of the current thread.
    pub(crate) fn worker_index() -> Option<usize> {
        CURRENT.with(|c| c.borrow().as_ref().map(|w| w.index))
    }
}

#[derive(Debug)]
pub(crate) struct ContextGuard;

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|current| {
            let old = current.borrow_mut().take();
            assert!(old.is_some(), "worker context not set");
        });
    }
}
