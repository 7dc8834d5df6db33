use crate::cancel::CancellationToken;
use crate::error::TaskError;
use crate::scheduler::context;
use crate::task::signal::{SleepOp, SuspendSignal};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Creates a future that completes after the given duration.
///
/// Awaited inside a task, the sleep suspends the task; the scheduler
/// parks it on its timer heap and resumes it once the deadline passes.
/// Driven standalone (through [`Task::result`](crate::Task::result)
/// outside a scheduler), it blocks the calling thread for the
/// remaining delta instead.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await?;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(duration)
}

/// Creates a future that completes at an absolute deadline.
///
/// Equivalent to [`sleep`] with the remaining delta, but lets several
/// sleepers share one exact deadline; such timers resume in the order
/// they parked.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        wake_at: deadline,
        token: None,
    }
}

/// A future that completes once a specific deadline is reached.
///
/// The deadline is absolute and fixed at construction, so partial
/// scheduler delay before the first poll never stretches the sleep.
///
/// With a token attached, the sleep resolves to
/// [`TaskError::Cancelled`] at its next poll after cancellation; the
/// failure surfaces inside the sleeping task itself, never from the
/// scheduler.
pub struct Sleep {
    /// Absolute point in time when the sleep completes.
    wake_at: Instant,

    /// Token that can cut the sleep short.
    token: Option<CancellationToken>,
}

impl Sleep {
    /// Creates a new `Sleep` future that completes after `duration`.
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            wake_at: Instant::now() + duration,
            token: None,
        }
    }

    /// Attaches a cancellation token to the sleep.
    pub fn with_token(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }
}

impl Future for Sleep {
    /// Resolves to `Ok(())` on wake-up, `Err` on cancellation.
    type Output = Result<(), TaskError>;

    /// Polls the sleep future.
    ///
    /// Checks the token, then the deadline; otherwise deposits a
    /// [`SleepOp`] suspension signal and yields. The signal is
    /// re-deposited on every poll because each resumption reclassifies
    /// the wait from scratch.
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(token) = &this.token {
            if token.is_cancelled() {
                return Poll::Ready(Err(TaskError::Cancelled));
            }
        }

        if Instant::now() >= this.wake_at {
            return Poll::Ready(Ok(()));
        }

        context::deposit(SuspendSignal::Sleep(SleepOp {
            wake_at: this.wake_at,
            token: this.token.clone(),
        }));

        Poll::Pending
    }
}
