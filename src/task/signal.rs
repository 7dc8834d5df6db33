use crate::cancel::CancellationToken;
use crate::metrics::SuspendKind;
use crate::scheduler::poller::{self, Interest};

use std::os::fd::RawFd;
use std::thread;
use std::time::Instant;

/// A pending timer wait.
///
/// `wake_at` is an absolute point in time, never a relative duration,
/// so re-suspension after partial scheduler delay stays correct.
#[derive(Debug, Clone)]
pub struct SleepOp {
    /// The time at which the sleeper should be resumed.
    pub wake_at: Instant,

    /// Token that can cut the wait short.
    pub token: Option<CancellationToken>,
}

/// A pending wait for a handle to become readable.
///
/// The handle is borrowed, not owned, by the waiter record; closing it
/// while a task is parked on it is the caller's bug.
#[derive(Debug, Clone)]
pub struct ReadOp {
    /// The handle being waited on.
    pub fd: RawFd,

    /// Absolute deadline for the wait, if any.
    pub deadline: Option<Instant>,

    /// Token that can cut the wait short.
    pub token: Option<CancellationToken>,
}

/// A pending wait for a handle to become writable.
#[derive(Debug, Clone)]
pub struct WriteOp {
    /// The handle being waited on.
    pub fd: RawFd,

    /// Absolute deadline for the wait, if any.
    pub deadline: Option<Instant>,

    /// Token that can cut the wait short.
    pub token: Option<CancellationToken>,
}

/// The reason a coroutine task suspended.
///
/// Suspension futures deposit one of these into the scheduler context
/// as they return `Pending`; the event loop classifies the signal to
/// decide where the task parks.
#[derive(Debug, Clone)]
pub enum SuspendSignal {
    /// Park on the timer heap until the deadline.
    Sleep(SleepOp),

    /// Park on the read-waiter list until the handle is readable.
    Read(ReadOp),

    /// Park on the write-waiter list until the handle is writable.
    Write(WriteOp),
}

impl SuspendSignal {
    /// Maps the signal onto its metrics classification.
    pub fn kind(&self) -> SuspendKind {
        match self {
            SuspendSignal::Sleep(_) => SuspendKind::Sleep,
            SuspendSignal::Read(_) => SuspendKind::Read,
            SuspendSignal::Write(_) => SuspendKind::Write,
        }
    }

    /// Blocks the calling thread until the signal's condition can be
    /// re-checked.
    ///
    /// This is the standalone driving mode: a task resolved through
    /// [`result`](crate::Task::result) outside a scheduler parks the
    /// whole thread instead of an event-loop entry. Readiness errors
    /// are not raised here; the next step re-runs the probe inside the
    /// task's own execution context and surfaces them there.
    pub(crate) fn block_until_ready(&self) {
        match self {
            SuspendSignal::Sleep(op) => {
                let now = Instant::now();
                if op.wake_at > now {
                    thread::sleep(op.wake_at - now);
                }
            }

            SuspendSignal::Read(op) => {
                let timeout = op.deadline.map(|d| d.saturating_duration_since(Instant::now()));
                let _ = poller::poll_interest(op.fd, Interest::READ, timeout);
            }

            SuspendSignal::Write(op) => {
                let timeout = op.deadline.map(|d| d.saturating_duration_since(Instant::now()));
                let _ = poller::poll_interest(op.fd, Interest::WRITE, timeout);
            }
        }
    }
}
