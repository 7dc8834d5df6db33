use crate::cancel::CancellationToken;
use crate::error::TaskError;
use crate::scheduler::context;
use crate::scheduler::registry::Lease;
use crate::task::signal::SuspendSignal;
use crate::task::state::TaskState;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::Instant;

/// Result of advancing a task by one suspension point.
pub(crate) enum Step {
    /// The task reached a terminal state and caches its outcome.
    Done,

    /// The task parked with a classified suspension reason.
    Suspended(SuspendSignal),

    /// The task yielded without a recognized signal.
    ///
    /// The scheduler requeues such a task immediately, so suspension
    /// reasons introduced later degrade to busy polling instead of
    /// stalling the loop.
    Yielded,
}

/// The execution body backing a task.
enum Body<T: 'static> {
    /// No body: the outcome was fixed at construction.
    Immediate,

    /// A callable that runs fully and synchronously on first demand.
    Closure(Option<Box<dyn FnOnce() -> Result<T, TaskError>>>),

    /// A suspendable coroutine, advanced one suspension point per step.
    Coroutine(Pin<Box<dyn Future<Output = Result<T, TaskError>>>>),
}

/// A single unit of cooperative work.
///
/// A `Task` wraps one of three bodies:
///
/// - an **immediate** outcome ([`completed`](Self::completed),
///   [`failed`](Self::failed)): terminal from birth, zero execution
///   cost;
/// - a **closure** ([`from_fn`](Self::from_fn)): runs fully and
///   synchronously the first time its result is demanded; it cannot
///   suspend and cannot be cancelled mid-flight;
/// - a **coroutine** ([`from_future`](Self::from_future)): the
///   suspendable unit. Awaiting one of the crate's suspension futures
///   ([`time::sleep`](crate::time::sleep),
///   [`io::readable`](crate::io::readable), ...) yields control back to
///   whoever is driving the task.
///
/// Exactly one owner drives a task, either directly through
/// [`result`](Self::result) or by handing it to
/// [`Scheduler::all`](crate::Scheduler::all) /
/// [`Scheduler::race`](crate::Scheduler::race). Once terminal, the
/// outcome is cached: repeated `result` calls return the same value or
/// re-raise the same error.
pub struct Task<T: 'static> {
    /// The execution body; exhausted once the outcome is cached.
    body: Body<T>,

    /// Current lifecycle state.
    state: TaskState,

    /// Cached outcome once terminal.
    outcome: Option<Result<T, TaskError>>,

    /// Token observed by the task's suspension points.
    token: Option<CancellationToken>,

    /// Display name reported to the metrics sink.
    name: Option<String>,

    /// When the task started: spawn time for spawned tasks, first step
    /// otherwise.
    started_at: Option<Instant>,

    /// Live-registry membership for spawned tasks.
    lease: Option<Lease>,
}

impl<T: 'static> Task<T> {
    fn new(body: Body<T>, state: TaskState, outcome: Option<Result<T, TaskError>>) -> Self {
        Self {
            body,
            state,
            outcome,
            token: None,
            name: None,
            started_at: None,
            lease: None,
        }
    }

    /// Creates a task that already completed with `value`.
    pub fn completed(value: T) -> Self {
        Self::new(Body::Immediate, TaskState::Completed, Some(Ok(value)))
    }

    /// Creates a task that already failed with `error`.
    pub fn failed(error: TaskError) -> Self {
        Self::new(Body::Immediate, TaskState::Completed, Some(Err(error)))
    }

    /// Creates a task from a synchronous callable.
    ///
    /// The callable runs fully, on the driving thread, the first time
    /// the task is stepped or its result is demanded.
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce() -> Result<T, TaskError> + 'static,
    {
        Self::new(Body::Closure(Some(Box::new(body))), TaskState::NotStarted, None)
    }

    /// Creates a suspendable task from a coroutine.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, TaskError>> + 'static,
    {
        Self::new(Body::Coroutine(Box::pin(future)), TaskState::NotStarted, None)
    }

    /// Attaches a cancellation token.
    ///
    /// [`cancel`](Self::cancel) sets this token; the task's own
    /// suspension points are where the cancellation is observed.
    pub fn with_token(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }

    /// Names the task for metrics reporting.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Whether the task body is executing right now.
    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Whether the task reached a terminal state.
    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }

    /// The task's metrics name.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("task")
    }

    /// Requests cooperative cancellation.
    ///
    /// Best-effort: sets the attached token, if any. A terminal or
    /// token-less task is unaffected. The running body keeps executing
    /// until it reaches its next check point.
    pub fn cancel(&self) {
        if self.is_completed() {
            return;
        }

        if let Some(token) = &self.token {
            token.cancel();
        }
    }

    /// Drives the task to completion and returns its outcome.
    ///
    /// Idempotent: the first call may execute the body; later calls
    /// return the cached value or re-raise the identical cached error.
    ///
    /// Driving outside a scheduler parks the calling thread on each
    /// suspension point: sleeps block for the remaining delta, I/O
    /// waits block on a single-handle readiness poll. Concurrency with
    /// other tasks is lost in this mode, never correctness.
    pub fn result(&mut self) -> Result<&T, TaskError> {
        while self.outcome.is_none() {
            match self.step() {
                Step::Suspended(signal) => signal.block_until_ready(),
                Step::Done | Step::Yielded => {}
            }
        }

        match self.outcome.as_ref().expect("driven task caches an outcome") {
            Ok(value) => Ok(value),
            Err(err) => Err(err.clone()),
        }
    }

    /// Advances the task by at most one suspension point.
    pub(crate) fn step(&mut self) -> Step {
        if self.outcome.is_some() {
            return Step::Done;
        }

        self.mark_started();
        self.state = TaskState::Running;

        let polled = match &mut self.body {
            // Terminal from birth; the outcome check above already returned.
            Body::Immediate => return Step::Done,

            Body::Closure(slot) => slot.take().map(|body| body()),

            Body::Coroutine(future) => {
                context::clear();
                let mut cx = Context::from_waker(Waker::noop());

                match future.as_mut().poll(&mut cx) {
                    Poll::Ready(outcome) => Some(outcome),
                    Poll::Pending => None,
                }
            }
        };

        match polled {
            Some(outcome) => {
                self.finish(outcome);
                Step::Done
            }

            None => {
                self.state = TaskState::Suspended;

                match context::take() {
                    Some(signal) => Step::Suspended(signal),
                    None => Step::Yielded,
                }
            }
        }
    }

    /// Takes the cached outcome of a terminal task.
    pub(crate) fn take_outcome(&mut self) -> Result<T, TaskError> {
        self.outcome.take().expect("terminal task has an outcome")
    }

    /// Forces the task into a failed terminal state.
    ///
    /// Used by the scheduler to abort a task that breached its
    /// wall-clock cap; a task that already completed keeps its outcome.
    pub(crate) fn fail_with(&mut self, error: TaskError) {
        if self.outcome.is_none() {
            self.finish(Err(error));
        }
    }

    /// When the task started, if it has.
    pub(crate) fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Enrolls the task in a scheduler's live registry.
    ///
    /// The start time is the spawn instant, so the wall-clock cap
    /// counts from spawn rather than from first step.
    pub(crate) fn bind(&mut self, lease: Lease, started: Instant) {
        self.lease = Some(lease);
        self.started_at = Some(started);
    }

    fn mark_started(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn finish(&mut self, outcome: Result<T, TaskError>) {
        self.outcome = Some(outcome);
        self.state = TaskState::Completed;

        // The registry entry is removed exactly once, on terminal
        // completion; the lease's drop guard covers abandonment.
        if let Some(lease) = &mut self.lease {
            lease.release();
        }
    }
}

impl<T: 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
