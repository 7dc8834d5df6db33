use crate::error::TaskError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag for cooperative cancellation.
///
/// Many tasks may hold clones of the same token; cancelling any clone
/// cancels them all. Cancellation is edge-triggered: the flag is only
/// *observed* when the affected task reaches a check point (a sleep, an
/// I/O wait, or an explicit [`check`](Self::check)), so code already
/// running between two suspension points is never interrupted.
///
/// The token is the one piece of the scheduler that is `Send + Sync`,
/// so an external thread may request cancellation of work running on
/// the scheduler thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Cancellation flag shared between all clones of the token.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    ///
    /// Idempotent: cancelling an already-cancelled token has no further
    /// effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fails with [`TaskError::Cancelled`] once cancellation has been
    /// requested.
    ///
    /// This is the check-point primitive: task bodies call it between
    /// units of work to honor cooperative cancellation.
    pub fn check(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}
