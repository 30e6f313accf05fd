//! Per-invocation packet counting.
//!
//! Tallies observations by remote address and turns each drained tally
//! into a reply.

pub mod tally;
pub mod transform;

pub use transform::{process_with_clock, Clock, SystemClock};
