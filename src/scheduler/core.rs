use crate::cancel::CancellationToken;
use crate::error::{LimitKind, TaskError};
use crate::metrics::{Metrics, SuspendKind};
use crate::scheduler::builder::SchedulerBuilder;
use crate::scheduler::limits::Limits;
use crate::scheduler::poller;
use crate::scheduler::registry::{Lease, Registry};
use crate::scheduler::timer::TimerEntry;
use crate::scheduler::waiter::IoWaiter;
use crate::task::{Step, SuspendSignal, Task, TaskState};

use std::cell::RefCell;
use std::collections::{BinaryHeap, VecDeque};
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// The cooperative scheduler.
///
/// A `Scheduler` multiplexes many logical tasks onto the calling
/// thread. Concurrency comes from interleaving at explicit suspension
/// points — sleeps, I/O readiness waits, combinator deadline checks —
/// never from parallel execution, so exactly one task runs at any
/// instant and no locking is needed anywhere in the loop.
///
/// Tasks enter through [`spawn`](Self::spawn) or are built directly;
/// batches are driven by [`all`](Self::all) (exhaustive collection) or
/// [`race`](Self::race) (first success wins). Resource limits and the
/// metrics sink are configured through [`SchedulerBuilder`](crate::SchedulerBuilder).
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = Scheduler::new();
///
/// let task = scheduler.spawn(async {
///     sleep(Duration::from_millis(10)).await?;
///     Ok(42)
/// })?;
///
/// let winner = scheduler.race(vec![task])?;
/// ```
pub struct Scheduler {
    /// Advisory resource limits.
    limits: Limits,

    /// Injected metrics sink; a no-op recorder by default.
    metrics: Arc<dyn Metrics>,

    /// Live-task accounting shared with spawned task leases.
    registry: Rc<RefCell<Registry>>,
}

impl Scheduler {
    /// Creates a scheduler with no limits and a no-op metrics sink.
    pub fn new() -> Self {
        SchedulerBuilder::new().build()
    }

    /// Starts configuring a scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn from_parts(limits: Limits, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            limits,
            metrics,
            registry: Rc::new(RefCell::new(Registry::new())),
        }
    }

    /// Spawns a coroutine as a tracked task.
    ///
    /// The concurrency cap is checked first: spawning the task that
    /// would exceed `max_concurrent_tasks` fails fast with
    /// [`TaskError::LimitExceeded`], before the coroutine is boxed or
    /// any work is scheduled. On success the task is enrolled in the
    /// live registry and leaves it exactly once, when it reaches a
    /// terminal state or is dropped.
    pub fn spawn<T, F>(&self, future: F) -> Result<Task<T>, TaskError>
    where
        T: 'static,
        F: Future<Output = Result<T, TaskError>> + 'static,
    {
        self.spawn_inner(future, None)
    }

    /// Spawns a coroutine with an attached cancellation token.
    ///
    /// The returned task's [`cancel`](Task::cancel) sets this token;
    /// the coroutine observes it at its own check points.
    pub fn spawn_with_token<T, F>(
        &self,
        future: F,
        token: &CancellationToken,
    ) -> Result<Task<T>, TaskError>
    where
        T: 'static,
        F: Future<Output = Result<T, TaskError>> + 'static,
    {
        self.spawn_inner(future, Some(token.clone()))
    }

    fn spawn_inner<T, F>(
        &self,
        future: F,
        token: Option<CancellationToken>,
    ) -> Result<Task<T>, TaskError>
    where
        T: 'static,
        F: Future<Output = Result<T, TaskError>> + 'static,
    {
        let started = Instant::now();

        let lease = {
            let mut registry = self.registry.borrow_mut();

            if let Some(limit) = self.limits.max_concurrent_tasks {
                let current = registry.live_count();
                if current >= limit {
                    self.metrics
                        .resource_limit(LimitKind::Concurrency, current as u64, limit as u64);

                    return Err(TaskError::LimitExceeded {
                        kind: LimitKind::Concurrency,
                        current: current as u64,
                        limit: limit as u64,
                    });
                }
            }

            let id = registry.enroll(started);
            Lease::new(self.registry.clone(), id)
        };

        let mut task = Task::from_future(future);
        if let Some(token) = token {
            task = task.with_token(&token);
        }
        task.bind(lease, started);

        Ok(task)
    }

    /// Number of currently live spawned tasks.
    pub fn live_tasks(&self) -> usize {
        self.registry.borrow().live_count()
    }

    /// Blocks the calling thread for `duration`.
    ///
    /// This is the non-coroutine half of the sleep contract; code
    /// running inside a task uses [`time::sleep`](crate::time::sleep),
    /// which suspends instead of blocking. The token is honored at
    /// entry; once the thread is parked nothing on it can observe a
    /// cancellation anyway.
    pub fn sleep(
        &self,
        duration: Duration,
        token: Option<&CancellationToken>,
    ) -> Result<(), TaskError> {
        if let Some(token) = token {
            token.check()?;
        }

        thread::sleep(duration);
        Ok(())
    }

    /// Drives every task to completion and collects all results.
    ///
    /// Results come back in the original key order regardless of
    /// completion order, so a fixed input always produces an identical
    /// output. The first error encountered while driving any task
    /// aborts the whole batch; callers needing partial results wrap
    /// each task to capture its own outcome.
    pub fn all<K, T>(&self, tasks: Vec<(K, Task<T>)>) -> Result<Vec<(K, T)>, TaskError>
    where
        T: 'static,
    {
        let (keys, mut tasks): (Vec<K>, Vec<Task<T>>) = tasks.into_iter().unzip();

        let mut results: Vec<Option<T>> = Vec::with_capacity(tasks.len());
        results.resize_with(tasks.len(), || None);

        // Already-terminal inputs are read up front; reading a cached
        // failure aborts before anything else is stepped.
        let mut ready = VecDeque::new();
        for (key, task) in tasks.iter_mut().enumerate() {
            if task.is_completed() {
                results[key] = Some(task.take_outcome()?);
            } else {
                ready.push_back(key);
            }
        }

        let mut lp = EventLoop::new(self, &mut tasks, ready);

        while lp.pending > 0 {
            lp.report_depth();

            match lp.ready.pop_front() {
                Some(key) => {
                    if let Some(outcome) = lp.advance(key) {
                        results[key] = Some(outcome?);
                    }
                }
                None => lp.wait_for_progress()?,
            }
        }

        let mut out = Vec::with_capacity(keys.len());
        for (key, slot) in keys.into_iter().zip(results) {
            let value = slot.expect("drained loop completed every task");
            out.push((key, value));
        }

        Ok(out)
    }

    /// Drives the tasks until one succeeds.
    ///
    /// The first successful result wins and is returned immediately;
    /// the remaining tasks are dropped where they stand. Failures are
    /// only raised collectively: if every task fails, the first error
    /// encountered is re-raised, so a later success always beats an
    /// earlier failure. An empty field returns `Ok(None)`.
    pub fn race<T>(&self, tasks: Vec<Task<T>>) -> Result<Option<T>, TaskError>
    where
        T: 'static,
    {
        let mut tasks = tasks;
        let mut first_err: Option<TaskError> = None;

        let mut ready = VecDeque::new();
        for (key, task) in tasks.iter_mut().enumerate() {
            if task.is_completed() {
                match task.take_outcome() {
                    Ok(value) => return Ok(Some(value)),
                    Err(err) => {
                        first_err.get_or_insert(err);
                    }
                }
            } else {
                ready.push_back(key);
            }
        }

        let mut lp = EventLoop::new(self, &mut tasks, ready);

        while lp.pending > 0 {
            lp.report_depth();

            match lp.ready.pop_front() {
                Some(key) => {
                    if let Some(outcome) = lp.advance(key) {
                        match outcome {
                            Ok(value) => return Ok(Some(value)),
                            Err(err) => {
                                first_err.get_or_insert(err);
                            }
                        }
                    }
                }
                None => lp.wait_for_progress()?,
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

impl Default for Scheduler {
    /// Creates a default scheduler.
    fn default() -> Self {
        Self::new()
    }
}

/// One `all`/`race` invocation's run-state.
///
/// The ready queue, timer heap, and waiter lists are exclusively owned
/// by the invocation and discarded with it; nothing persists between
/// calls.
struct EventLoop<'a, T: 'static> {
    scheduler: &'a Scheduler,
    tasks: &'a mut [Task<T>],

    /// FIFO of task keys ready to be stepped.
    ready: VecDeque<usize>,

    /// Min-heap of parked sleepers, ordered by `(wake_at, seq)`.
    timers: BinaryHeap<TimerEntry>,

    /// Tasks parked until a handle becomes readable, in park order.
    reads: Vec<IoWaiter>,

    /// Tasks parked until a handle becomes writable, in park order.
    writes: Vec<IoWaiter>,

    /// Tasks not yet terminal.
    pending: usize,

    /// Timer insertion counter; breaks equal-deadline ties.
    seq: u64,
}

impl<'a, T: 'static> EventLoop<'a, T> {
    fn new(scheduler: &'a Scheduler, tasks: &'a mut [Task<T>], ready: VecDeque<usize>) -> Self {
        let pending = ready.len();

        Self {
            scheduler,
            tasks,
            ready,
            timers: BinaryHeap::new(),
            reads: Vec::new(),
            writes: Vec::new(),
            pending,
            seq: 0,
        }
    }

    fn report_depth(&self) {
        self.scheduler.metrics.queue_depth(
            self.ready.len(),
            self.reads.len() + self.writes.len(),
            self.timers.len(),
        );
    }

    /// Steps the task at `key` once and classifies what happened.
    ///
    /// Returns the outcome when the task reached a terminal state;
    /// otherwise the task has been parked or requeued and `None` comes
    /// back.
    fn advance(&mut self, key: usize) -> Option<Result<T, TaskError>> {
        // The wall-clock cap is consulted before the step: a task over
        // budget is aborted instead of being given more time, even if
        // it would otherwise have made progress.
        if let Some(cap) = self.scheduler.limits.max_task_duration {
            if let Some(started) = self.tasks[key].started_at() {
                let elapsed = started.elapsed();
                if elapsed > cap {
                    self.scheduler.metrics.resource_limit(
                        LimitKind::TaskDuration,
                        elapsed.as_millis() as u64,
                        cap.as_millis() as u64,
                    );

                    self.tasks[key].fail_with(TaskError::DeadlineExceeded);
                    self.scheduler
                        .metrics
                        .task_failed(self.tasks[key].name(), &TaskError::DeadlineExceeded);

                    self.pending -= 1;
                    return Some(self.tasks[key].take_outcome());
                }
            }
        }

        if self.tasks[key].state() == TaskState::NotStarted {
            self.scheduler.metrics.task_started(self.tasks[key].name());
        }

        match self.tasks[key].step() {
            Step::Done => {
                self.pending -= 1;

                let outcome = self.tasks[key].take_outcome();
                let task = &self.tasks[key];
                let elapsed = task
                    .started_at()
                    .map(|started| started.elapsed())
                    .unwrap_or_default();

                match &outcome {
                    Ok(_) => self.scheduler.metrics.task_completed(task.name(), elapsed),
                    Err(TaskError::Cancelled) => {
                        self.scheduler.metrics.task_cancelled(task.name())
                    }
                    Err(err) => self.scheduler.metrics.task_failed(task.name(), err),
                }

                Some(outcome)
            }

            Step::Suspended(signal) => {
                self.park(key, signal);
                None
            }

            // Pending without a recognized signal: requeue immediately
            // so unknown suspension reasons degrade to busy polling.
            Step::Yielded => {
                self.ready.push_back(key);
                None
            }
        }
    }

    fn park(&mut self, key: usize, signal: SuspendSignal) {
        self.scheduler
            .metrics
            .task_suspended(self.tasks[key].name(), signal.kind());

        let now = Instant::now();

        match signal {
            SuspendSignal::Sleep(op) => {
                self.seq += 1;
                self.timers.push(TimerEntry {
                    wake_at: op.wake_at,
                    seq: self.seq,
                    key,
                    token: op.token,
                    since: now,
                });
            }

            SuspendSignal::Read(op) => self.reads.push(IoWaiter {
                key,
                fd: op.fd,
                deadline: op.deadline,
                token: op.token,
                since: now,
            }),

            SuspendSignal::Write(op) => self.writes.push(IoWaiter {
                key,
                fd: op.fd,
                deadline: op.deadline,
                token: op.token,
                since: now,
            }),
        }
    }

    /// Blocks once until some parked task can be resumed.
    ///
    /// Runs the idle-cycle aggregate limit checks, then multiplexes
    /// readiness across every waited handle with the earliest
    /// timer/waiter deadline as the timeout — or sleeps plainly when
    /// nothing waits on I/O.
    fn wait_for_progress(&mut self) -> Result<(), TaskError> {
        self.scheduler
            .limits
            .check_process(self.scheduler.metrics.as_ref())?;

        // A token cancelled while other tasks ran must not keep its
        // waiter parked for the full timeout.
        if self.sweep_cancelled() {
            return Ok(());
        }

        let deadline = self.earliest_deadline();

        if self.reads.is_empty() && self.writes.is_empty() {
            if let Some(when) = deadline {
                let now = Instant::now();
                if when > now {
                    thread::sleep(when - now);
                }
            }

            self.expire_timers(Instant::now());
            return Ok(());
        }

        let mut fds: Vec<libc::pollfd> = Vec::with_capacity(self.reads.len() + self.writes.len());
        for waiter in &self.reads {
            fds.push(libc::pollfd {
                fd: waiter.fd,
                events: libc::POLLIN,
                revents: 0,
            });
        }
        for waiter in &self.writes {
            fds.push(libc::pollfd {
                fd: waiter.fd,
                events: libc::POLLOUT,
                revents: 0,
            });
        }

        let timeout = deadline.map(|when| when.saturating_duration_since(Instant::now()));
        poller::sys_poll(&mut fds, timeout)?;

        // Readiness results resume first, in registration order, then
        // expired timers in heap order.
        let now = Instant::now();
        self.sweep_io(&fds, now);
        self.expire_timers(now);

        Ok(())
    }

    fn earliest_deadline(&self) -> Option<Instant> {
        let mut deadline = self.timers.peek().map(|timer| timer.wake_at);

        for waiter in self.reads.iter().chain(self.writes.iter()) {
            if let Some(d) = waiter.deadline {
                deadline = Some(match deadline {
                    Some(current) => current.min(d),
                    None => d,
                });
            }
        }

        deadline
    }

    /// Requeues every waiter whose token was cancelled.
    ///
    /// The waiter is resumed rather than failed here: cancellation is
    /// only ever raised inside the task's own execution context, at its
    /// next step.
    fn sweep_cancelled(&mut self) -> bool {
        let mut woke = false;

        if self.timers.iter().any(TimerEntry::is_cancelled) {
            let mut entries: Vec<TimerEntry> = self.timers.drain().collect();
            entries.sort_by_key(|timer| timer.seq);

            for timer in entries {
                if timer.is_cancelled() {
                    self.resume(timer.key, SuspendKind::Sleep, timer.since);
                    woke = true;
                } else {
                    self.timers.push(timer);
                }
            }
        }

        let reads = std::mem::take(&mut self.reads);
        for waiter in reads {
            if waiter.is_cancelled() {
                self.resume(waiter.key, SuspendKind::Read, waiter.since);
                woke = true;
            } else {
                self.reads.push(waiter);
            }
        }

        let writes = std::mem::take(&mut self.writes);
        for waiter in writes {
            if waiter.is_cancelled() {
                self.resume(waiter.key, SuspendKind::Write, waiter.since);
                woke = true;
            } else {
                self.writes.push(waiter);
            }
        }

        woke
    }

    fn sweep_io(&mut self, fds: &[libc::pollfd], now: Instant) {
        let read_count = self.reads.len();

        let reads = std::mem::take(&mut self.reads);
        for (waiter, pollfd) in reads.into_iter().zip(&fds[..read_count]) {
            if waiter.should_wake(pollfd.revents, now) {
                self.resume(waiter.key, SuspendKind::Read, waiter.since);
            } else {
                self.reads.push(waiter);
            }
        }

        let writes = std::mem::take(&mut self.writes);
        for (waiter, pollfd) in writes.into_iter().zip(&fds[read_count..]) {
            if waiter.should_wake(pollfd.revents, now) {
                self.resume(waiter.key, SuspendKind::Write, waiter.since);
            } else {
                self.writes.push(waiter);
            }
        }
    }

    fn expire_timers(&mut self, now: Instant) {
        while self
            .timers
            .peek()
            .is_some_and(|top| top.wake_at <= now || top.is_cancelled())
        {
            if let Some(timer) = self.timers.pop() {
                self.resume(timer.key, SuspendKind::Sleep, timer.since);
            }
        }
    }

    fn resume(&mut self, key: usize, kind: SuspendKind, since: Instant) {
        self.scheduler
            .metrics
            .task_resumed(self.tasks[key].name(), kind, since.elapsed());

        self.ready.push_back(key);
    }
}
