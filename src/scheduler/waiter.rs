use crate::cancel::CancellationToken;

use std::os::fd::RawFd;
use std::time::Instant;

/// A task parked on I/O readiness.
///
/// Waiter lists are append-only between sweeps, so readiness results
/// come back in registration order. The handle is borrowed from the
/// task, never owned here.
pub(crate) struct IoWaiter {
    /// Index of the parked task in the event loop's task set.
    pub(crate) key: usize,

    /// The handle being waited on.
    pub(crate) fd: RawFd,

    /// Absolute deadline for the wait, if any.
    pub(crate) deadline: Option<Instant>,

    /// Cancellation token carried by the underlying wait, if any.
    pub(crate) token: Option<CancellationToken>,

    /// When the task parked; feeds resume-latency metrics.
    pub(crate) since: Instant,
}

impl IoWaiter {
    /// Whether the wait's token has been cancelled.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Whether the waiter should return to the ready queue.
    ///
    /// A waiter wakes when its handle reported events, its deadline
    /// passed, or its token was cancelled. Which of those actually
    /// applies is re-derived by the task itself on its next step;
    /// readiness wins there when several hold at once.
    pub(crate) fn should_wake(&self, revents: libc::c_short, now: Instant) -> bool {
        revents != 0
            || self.deadline.is_some_and(|deadline| now >= deadline)
            || self.is_cancelled()
    }
}
