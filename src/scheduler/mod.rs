//! Throttled job submission.
//!
//! - [`Scheduler`] single-lane throttle with last-write-wins coalescing

#[allow(clippy::module_inception)]
mod scheduler;

pub use scheduler::Scheduler;
