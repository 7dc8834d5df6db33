use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The ways a task can fail.
///
/// The four variants are deliberately distinct so that callers can tell
/// "I cancelled this" apart from "it failed on its own" and from "the
/// scheduler cut it short":
///
/// - [`Failed`](TaskError::Failed): the task body itself returned an error.
/// - [`Cancelled`](TaskError::Cancelled): a cancellation token was observed
///   at a check point.
/// - [`DeadlineExceeded`](TaskError::DeadlineExceeded): a deadline was
///   detected at a suspension point, or the per-task wall-clock cap fired.
/// - [`LimitExceeded`](TaskError::LimitExceeded): a scheduler resource
///   limit was breached.
///
/// The type is `Clone` (the wrapped source error is `Arc`-shared) so a
/// terminal task can re-raise the identical failure on every
/// [`result`](crate::Task::result) call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task body failed; the original error is propagated verbatim.
    #[error("task failed: {0}")]
    Failed(#[source] Arc<dyn Error + Send + Sync + 'static>),

    /// A cancellation token was observed cancelled at a check point.
    #[error("task cancelled")]
    Cancelled,

    /// A deadline passed at a suspension point, or the per-task
    /// wall-clock cap was exceeded.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A scheduler resource limit was breached.
    #[error("resource limit reached: {kind} ({current} of {limit})")]
    LimitExceeded {
        /// Which limit fired.
        kind: LimitKind,
        /// Observed value at the moment of the breach.
        current: u64,
        /// Configured cap.
        limit: u64,
    },
}

impl TaskError {
    /// Wraps an arbitrary error as a task failure.
    pub fn failed<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Failed(Arc::new(err))
    }

    /// Builds a task failure from a plain message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Failed(Arc::new(MessageError(msg.into())))
    }
}

impl From<io::Error> for TaskError {
    fn from(err: io::Error) -> Self {
        Self::failed(err)
    }
}

/// A string-only error used by [`TaskError::message`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageError(String);

/// The resource limits a scheduler can enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Number of concurrently live spawned tasks.
    Concurrency,
    /// Wall-clock time a single task may stay live.
    TaskDuration,
    /// Process-wide resident memory.
    Memory,
    /// Process-wide open file descriptors.
    OpenHandles,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimitKind::Concurrency => "concurrency",
            LimitKind::TaskDuration => "task duration",
            LimitKind::Memory => "memory",
            LimitKind::OpenHandles => "open handles",
        };

        f.write_str(name)
    }
}
