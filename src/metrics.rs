use crate::error::{LimitKind, TaskError};

use std::time::Duration;

/// The reason a task suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendKind {
    /// Parked on a timer.
    Sleep,
    /// Parked until a handle becomes readable.
    Read,
    /// Parked until a handle becomes writable.
    Write,
}

/// Sink for scheduler lifecycle and queue-depth events.
///
/// Every method has an empty default body, so implementors only record
/// the events they care about. The scheduler receives its sink through
/// [`SchedulerBuilder::metrics`](crate::SchedulerBuilder::metrics) and
/// falls back to [`NoopMetrics`]; there is no global sink.
///
/// Implementations must be cheap: the scheduler reports queue depths on
/// every loop iteration.
#[allow(unused_variables)]
pub trait Metrics: Send + Sync {
    /// A task was stepped for the first time.
    fn task_started(&self, name: &str) {}

    /// A task reached a successful terminal state.
    fn task_completed(&self, name: &str, elapsed: Duration) {}

    /// A task reached a failed terminal state.
    fn task_failed(&self, name: &str, error: &TaskError) {}

    /// A task terminated by observing its cancellation token.
    fn task_cancelled(&self, name: &str) {}

    /// A task parked on a timer or I/O wait.
    fn task_suspended(&self, name: &str, kind: SuspendKind) {}

    /// A parked task was moved back to the ready queue.
    fn task_resumed(&self, name: &str, kind: SuspendKind, latency: Duration) {}

    /// Queue depths at the top of an event-loop iteration.
    fn queue_depth(&self, ready: usize, waiting: usize, timers: usize) {}

    /// A resource limit was breached.
    fn resource_limit(&self, kind: LimitKind, current: u64, limit: u64) {}
}

/// A metrics sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}
