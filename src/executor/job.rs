//! # Job: one-shot unit of work.
//!
//! A [`Job`] wraps a closure `FnOnce(CancellationToken) -> Fut`. It is owned by the
//! executor's deque until exactly one worker pops and runs it (at-most-once execution).
//!
//! ## Example
//! ```rust
//! use jobvisor::{Job, JobError};
//! use tokio_util::sync::CancellationToken;
//!
//! let job: Job<u32> = Job::new(|ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(JobError::Canceled);
//!     }
//!     Ok(42)
//! });
//! # let _ = job;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// Boxed future returned by a job.
pub type BoxJobFuture<T> = Pin<Box<dyn Future<Output = Result<T, JobError>> + Send + 'static>>;

type JobFn<T> = Box<dyn FnOnce(CancellationToken) -> BoxJobFuture<T> + Send + 'static>;

/// One-shot unit of work producing `T` (or `()` for fire-and-forget jobs).
pub struct Job<T = ()> {
    f: JobFn<T>,
}

impl<T: Send + 'static> Job<T> {
    /// Wraps a closure that *creates* the job future when a worker picks it up.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, JobError>> + Send + 'static,
    {
        Self {
            f: Box::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Consumes the job and returns its future.
    pub(crate) fn run(self, ctx: CancellationToken) -> BoxJobFuture<T> {
        (self.f)(ctx)
    }
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}
