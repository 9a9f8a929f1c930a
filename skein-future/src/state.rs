//! Status flags of a shared state.
use std::sync::atomic::{AtomicU8, Ordering};

use crate::outcome::Status;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    struct Flags: u8 {
        /// Resolved with a value.
        const SUCCEEDED = 1<<0;
        /// Resolved with a failure.
        const FAILED    = 1<<1;
        /// Cancelled.
        const CANCELLED = 1<<2;
        /// A thread is blocked in `wait` and must be notified.
        const WAITERS   = 1<<3;

        const COMPLETE  = Self::SUCCEEDED.bits() | Self::FAILED.bits() | Self::CANCELLED.bits();
    }
}

/// [`StateCell`] publishes the status of a shared state without locking.
///
/// The outcome itself lives next to it; the flags let readers and the
/// resolver agree on whether anyone is blocked waiting for it.
pub(crate) struct StateCell {
    bits: AtomicU8,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    #[inline]
    fn load(&self) -> Flags {
        Flags::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn status(&self) -> Status {
        let flags = self.load();
        if flags.contains(Flags::SUCCEEDED) {
            Status::Succeeded
        } else if flags.contains(Flags::FAILED) {
            Status::Failed
        } else if flags.contains(Flags::CANCELLED) {
            Status::Cancelled
        } else {
            Status::Pending
        }
    }

    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.load().intersects(Flags::COMPLETE)
    }

    /// Record the terminal status.
    ///
    /// # Panic
    /// Panics if a terminal status was already recorded or `status` is
    /// [`Status::Pending`].
    pub(crate) fn complete(&self, status: Status) {
        let flag = match status {
            Status::Succeeded => Flags::SUCCEEDED,
            Status::Failed => Flags::FAILED,
            Status::Cancelled => Flags::CANCELLED,
            Status::Pending => panic!("cannot complete with a pending status"),
        };
        let prev = Flags::from_bits_truncate(self.bits.fetch_or(flag.bits(), Ordering::AcqRel));
        assert!(!prev.intersects(Flags::COMPLETE), "status already set");
    }

    pub(crate) fn mark_waiters(&self) {
        self.bits.fetch_or(Flags::WAITERS.bits(), Ordering::AcqRel);
    }

    pub(crate) fn has_waiters(&self) -> bool {
        self.load().contains(Flags::WAITERS)
    }
}
