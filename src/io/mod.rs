//! Readiness-driven I/O waits.
//!
//! This module provides the I/O suspension primitives:
//!
//! - [`readable`] / [`writable`] park the task until a handle is
//!   ready, with optional deadline and cancellation token,
//! - [`read`] / [`write`] perform the actual operation on a
//!   non-blocking handle, suspending whenever it would block.
//!
//! Handles are plain `RawFd`s borrowed from the caller; the scheduler
//! never owns or closes them.

mod future;

#[doc(inline)]
pub use future::{Readable, Writable, read, readable, writable, write};
