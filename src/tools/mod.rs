//! Task-building utilities.
//!
//! This module provides helpers that assemble common task shapes out
//! of plain callables.
//!
//! The main entry point is [`repeat`], which runs a callable a fixed
//! number of times with an optional pause between iterations and
//! collects every result.

mod repeating;

#[doc(inline)]
pub use repeating::{Repeat, repeat};
