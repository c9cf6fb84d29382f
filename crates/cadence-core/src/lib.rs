//! Cadence Core - Foundational types for the Cadence game loop
//!
//! This crate provides the core types that all other Cadence crates depend on:
//! - `TimeSpan` - Signed nanosecond time intervals
//! - `Clock`, `SystemClock`, `ManualClock` - Monotonic time sources
//! - Error types and Result alias
//! - Logger initialization

mod clock;
mod error;
pub mod logging;
mod time;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CadenceError, Result};
pub use time::TimeSpan;
