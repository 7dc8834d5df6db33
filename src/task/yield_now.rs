use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the driver exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    /// Polls the yield future.
    ///
    /// The first poll returns `Poll::Pending` without depositing a
    /// suspension signal, so the scheduler requeues the task
    /// immediately. The second poll completes.
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.0 {
            self.0 = true;
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}

/// Yields execution back to the scheduler.
///
/// This allows other ready tasks to make progress before the current
/// task continues. The task is requeued rather than parked, so the
/// yield costs one trip through the ready queue and nothing more.
///
/// # Examples
///
/// ```rust,ignore
/// async fn task() {
///     // Allow other tasks to run
///     yield_now().await;
/// }
/// ```
pub async fn yield_now() {
    YieldOnce(false).await
}
