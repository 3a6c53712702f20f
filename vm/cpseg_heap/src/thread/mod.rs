//! Per-thread pending-signal state.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::AllocFailure;

/// Execution-thread context passed into every allocation.
///
/// Another thread may post an asynchronous termination request at any
/// time; the next allocation on this thread consumes it and fails.
#[derive(Debug, Default)]
pub struct VmThread {
    pending_termination: AtomicBool,
}

impl VmThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post an asynchronous termination request.
    pub fn raise_async_termination(&self) {
        self.pending_termination.store(true, Ordering::Release);
    }

    /// Check for a pending request without consuming it.
    pub fn has_pending_termination(&self) -> bool {
        self.pending_termination.load(Ordering::Acquire)
    }

    /// Consume a pending request, returning whether one was present.
    pub fn take_pending_termination(&self) -> bool {
        self.pending_termination.swap(false, Ordering::AcqRel)
    }

    /// Fail with `AsyncTermination` if a request is pending.
    pub(crate) fn check_termination(&self) -> Result<(), AllocFailure> {
        if self.take_pending_termination() {
            Err(AllocFailure::AsyncTermination)
        } else {
            Ok(())
        }
    }
}
