use crate::metrics::{Metrics, NoopMetrics};
use crate::scheduler::Scheduler;
use crate::scheduler::limits::Limits;

use std::sync::Arc;
use std::time::Duration;

/// Builder for configuring and creating a scheduler.
///
/// `SchedulerBuilder` sets the advisory resource limits and injects
/// the metrics sink before constructing the scheduler. Every limit is
/// off by default and the default sink records nothing.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .max_concurrent_tasks(64)
///     .max_task_duration(Duration::from_secs(30))
///     .build();
/// ```
pub struct SchedulerBuilder {
    /// Limits accumulated so far.
    limits: Limits,

    /// Metrics sink handed to the scheduler.
    metrics: Arc<dyn Metrics>,
}

impl SchedulerBuilder {
    /// Creates a new `SchedulerBuilder` with default configuration:
    /// no limits, no-op metrics.
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Caps the number of concurrently live spawned tasks.
    ///
    /// Spawning past the cap fails immediately rather than queuing.
    ///
    /// # Panics
    ///
    /// Panics if `limit == 0`.
    pub fn max_concurrent_tasks(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_concurrent_tasks must be > 0");

        self.limits.max_concurrent_tasks = Some(limit);
        self
    }

    /// Caps the wall-clock time a single task may stay live.
    ///
    /// Checked every time the task is stepped; a task over budget is
    /// aborted with a deadline failure instead of being resumed.
    pub fn max_task_duration(mut self, cap: Duration) -> Self {
        self.limits.max_task_duration = Some(cap);
        self
    }

    /// Caps process-wide resident memory, checked once per idle cycle.
    ///
    /// A breach aborts the whole `all`/`race` invocation.
    pub fn max_memory_bytes(mut self, limit: u64) -> Self {
        self.limits.max_memory_bytes = Some(limit);
        self
    }

    /// Caps process-wide open file descriptors, checked once per idle
    /// cycle.
    ///
    /// A breach aborts the whole `all`/`race` invocation.
    pub fn max_open_handles(mut self, limit: u64) -> Self {
        self.limits.max_open_handles = Some(limit);
        self
    }

    /// Injects the metrics sink.
    pub fn metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builds the scheduler with the configured options.
    pub fn build(self) -> Scheduler {
        Scheduler::from_parts(self.limits, self.metrics)
    }
}

impl Default for SchedulerBuilder {
    /// Creates a default `SchedulerBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
