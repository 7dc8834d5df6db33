//! Timer utilities.
//!
//! This module provides the time-related suspension primitives:
//!
//! - [`sleep`] for parking a task until a deadline,
//! - [`timeout`] for bounding a task with a cooperative deadline.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};

#[doc(inline)]
pub use timeout::{timeout, timeout_with_token};
