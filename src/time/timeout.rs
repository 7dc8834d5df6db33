use crate::cancel::CancellationToken;
use crate::error::TaskError;
use crate::scheduler::context;
use crate::task::{Step, Task, TaskState};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Bounds a task with a cooperative deadline.
///
/// The returned task drives `task` manually from inside its own
/// coroutine. Each time the inner task suspends, the wrapper checks
/// the deadline before resuming it: past the deadline, the wrapper
/// fails with [`TaskError::DeadlineExceeded`] instead of stepping the
/// inner task again. Otherwise the inner task's suspension signal is
/// re-deposited unchanged, so the enclosing scheduler keeps servicing
/// ordinary sleep and I/O waits transparently.
///
/// The deadline is enforced only at suspension points: an inner task
/// that never suspends runs to completion no matter how long it takes.
/// The timeout layer itself never blocks.
pub fn timeout<T>(limit: Duration, task: Task<T>) -> Task<T>
where
    T: 'static + Unpin,
{
    Task::from_future(TimeoutDrive {
        inner: task,
        limit,
        deadline: None,
        token: None,
    })
}

/// Like [`timeout`], with a cancellation token checked at every
/// resumption.
///
/// Cancellation is reported as [`TaskError::Cancelled`], distinct from
/// the deadline failure, and is checked first.
pub fn timeout_with_token<T>(limit: Duration, task: Task<T>, token: &CancellationToken) -> Task<T>
where
    T: 'static + Unpin,
{
    Task::from_future(TimeoutDrive {
        inner: task,
        limit,
        deadline: None,
        token: Some(token.clone()),
    })
    .with_token(token)
}

/// The outer coroutine driving a deadline-bounded inner task.
struct TimeoutDrive<T: 'static> {
    /// The task being bounded.
    inner: Task<T>,

    /// Allowed duration, applied from the first poll.
    limit: Duration,

    /// Absolute deadline, fixed at first poll.
    deadline: Option<Instant>,

    /// Token checked before every resumption.
    token: Option<CancellationToken>,
}

impl<T: 'static + Unpin> Future for TimeoutDrive<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let deadline = *this
            .deadline
            .get_or_insert_with(|| Instant::now() + this.limit);

        if let Some(token) = &this.token {
            if token.is_cancelled() {
                return Poll::Ready(Err(TaskError::Cancelled));
            }
        }

        // The deadline only intercepts resumptions: it is consulted
        // when the inner task sits at a suspension point, never before
        // its first step and never for a body that ran to completion.
        if this.inner.state() == TaskState::Suspended && Instant::now() >= deadline {
            return Poll::Ready(Err(TaskError::DeadlineExceeded));
        }

        match this.inner.step() {
            Step::Done => Poll::Ready(this.inner.take_outcome()),

            // Re-suspend with the inner task's own signal so the
            // enclosing scheduler still sees sleep/read/write waits.
            Step::Suspended(signal) => {
                context::deposit(signal);
                Poll::Pending
            }

            Step::Yielded => Poll::Pending,
        }
    }
}
