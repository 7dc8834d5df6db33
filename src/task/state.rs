/// Lifecycle states of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// The task exists but has never been stepped.
    NotStarted,

    /// The task body is executing right now.
    ///
    /// Only the task's own call stack can observe this state; between
    /// steps a live task is always [`Suspended`](TaskState::Suspended).
    Running,

    /// The task yielded at a suspension point and is waiting to be
    /// resumed.
    Suspended,

    /// The task reached a terminal state and caches its outcome.
    ///
    /// Covers both success and failure; the outcome itself records
    /// which.
    Completed,
}
