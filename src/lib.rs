//! # Fibra
//!
//! **Fibra** is a cooperative, single-threaded task scheduler. It
//! multiplexes many logical tasks onto one thread of execution,
//! suspending them on sleep and I/O readiness waits, resuming the right
//! task when its condition is satisfied, and composing batches with
//! `all`/`race` semantics.
//!
//! There is no parallelism and no preemption: exactly one task runs at
//! any instant, and a task only loses the thread at its own suspension
//! points. That makes data races impossible inside a scheduler and
//! keeps the whole loop lock-free, at the cost of a task that never
//! yields holding everyone else up.
//!
//! The scheduler offers:
//!
//! - **Tasks** in three flavors: pre-resolved, synchronous closures,
//!   and suspendable coroutines
//! - **Batch driving** via [`Scheduler::all`] (collect everything, in
//!   input order) and [`Scheduler::race`] (first success wins)
//! - **Cooperative cancellation** through shared [`CancellationToken`]s
//! - **Cooperative deadlines** with [`time::timeout`], which intercepts
//!   the inner task's suspension points without ever blocking itself
//! - **Advisory resource limits**: spawn-time concurrency caps,
//!   per-task wall-clock caps, and process-wide memory/handle caps
//! - **Injected metrics** via the [`Metrics`] trait; the default sink
//!   records nothing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fibra::{Scheduler, time::sleep};
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new();
//!
//! let fast = scheduler.spawn(async {
//!     sleep(Duration::from_millis(5)).await?;
//!     Ok("fast")
//! })?;
//!
//! let slow = scheduler.spawn(async {
//!     sleep(Duration::from_secs(5)).await?;
//!     Ok("slow")
//! })?;
//!
//! // Returns "fast" without waiting out the five seconds.
//! let winner = scheduler.race(vec![fast, slow])?;
//! ```
//!
//! ## Modules
//!
//! - [`task`]: task variants, lifecycle states, suspension signals
//! - [`scheduler`]: the event loop, builder, and resource limits
//! - [`time`]: sleep and cooperative timeout
//! - [`io`]: readiness waits and non-blocking read/write
//! - [`tools`]: the repeating-task helper
//! - [`metrics`]: the injectable metrics sink

mod cancel;
mod error;

pub mod io;
pub mod metrics;
pub mod scheduler;
pub mod task;
pub mod time;
pub mod tools;

pub use cancel::CancellationToken;
pub use error::{LimitKind, TaskError};
pub use metrics::{Metrics, NoopMetrics, SuspendKind};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{Task, TaskState};
