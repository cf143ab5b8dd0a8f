//! Worker pool executing queued jobs.
//!
//! - [`Executor`] fixed pool of workers draining a shared FIFO deque
//! - [`Job`] one-shot unit of work handed to a single worker
//! - [`Indexed`] first-serve result tagged with its submission index

mod collect;
#[allow(clippy::module_inception)]
mod executor;
mod job;
mod sinks;

pub use collect::Indexed;
pub use executor::Executor;
pub use job::{BoxJobFuture, Job};
