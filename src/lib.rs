//! # jobvisor
//!
//! **Jobvisor** is a small set of composable concurrency primitives for tokio
//! applications: a wake-up flag, a concurrent deque, a job executor, a throttling
//! scheduler and a service supervisor.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!    post_job / collect*                post_throttled_job           add_service
//!           │                                  │                          │
//!           ▼                                  ▼                          ▼
//! ┌───────────────────┐   forwards   ┌───────────────────┐   ┌───────────────────────┐
//! │     Executor      │◄─────────────│     Scheduler     │   │      Supervisor       │
//! │ ConcurrentDeque   │  (1 worker)  │ throttle window   │   │ start gate (SyncFlag) │
//! │ SyncFlag has_work │              │ pending slot      │   │ ErrorHandlers         │
//! │ N workers         │              └───────────────────┘   │ ServiceTokens         │
//! │ error sinks       │                                      └───────────┬───────────┘
//! └─────────┬─────────┘                                                  │
//!           │ publishes                                        publishes │
//!           ▼                                                            ▼
//! ┌──────────────────────────────────────────────────────────────────────────────────┐
//! │                             Bus (broadcast channel)                              │
//! └─────────────────────────────────────────┬────────────────────────────────────────┘
//!                                           ▼
//!                                    SubscriberSet
//!                                (per-subscriber queues)
//! ```
//!
//! ### Scopes
//! Every component owns a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! scope. Scopes form a tree: a scheduler's executor is a child of the scheduler, a
//! service token is a child of its supervisor. Cancelling a scope stops everything
//! beneath it.
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                         |
//! |-------------------|-------------------------------------------------------------|--------------------------------------------|
//! | **Sync**          | Resettable wake-up flag and mutex-guarded deque.            | [`SyncFlag`], [`ConcurrentDeque`]          |
//! | **Execution**     | Worker pool with ordered and first-serve result collection. | [`Executor`], [`Job`], [`Indexed`]         |
//! | **Throttling**    | At most one job per window, last-write-wins coalescing.     | [`Scheduler`]                              |
//! | **Supervision**   | `init → run → clean` loops with panic recovery.             | [`Supervisor`], [`Service`], [`ServiceFn`] |
//! | **Subscriber API**| Hook into runtime events (logging, metrics).                | [`Subscribe`], [`Event`], [`EventKind`]    |
//! | **Errors**        | Typed errors for rejections, jobs and services.             | [`ExecutorError`], [`JobError`], [`ServiceError`] |
//! | **Configuration** | Centralized settings per component.                         | [`ExecutorConfig`], [`SupervisorConfig`]   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{Executor, ExecutorConfig, Job, JobError, ServiceError, ServiceFn, Supervisor, SupervisorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fan work out over a pool and collect results in submission order.
//!     let exec = Executor::new(ExecutorConfig::with_workers(4));
//!     exec.start();
//!     let jobs: Vec<Job<u64>> = (1..=3u64)
//!         .map(|n| Job::new(move |_ctx| async move { Ok::<_, JobError>(n * n) }))
//!         .collect();
//!     assert_eq!(exec.collect(jobs).await?, vec![1, 4, 9]);
//!     exec.shutdown().await;
//!
//!     // Keep a service alive until shutdown.
//!     let sup = Supervisor::new(SupervisorConfig::default());
//!     let svc = sup.add_service(ServiceFn::arc("heartbeat", |ctx: CancellationToken| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => Ok(()),
//!             _ = tokio::time::sleep(Duration::from_millis(10)) => Ok::<_, ServiceError>(()),
//!         }
//!     }));
//!     sup.start();
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     sup.shutdown().await;
//!     assert_eq!(svc.errors_count(), 0);
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod executor;
mod policies;
mod scheduler;
mod subscribers;
mod supervisor;
mod sync;

// ---- Public re-exports ----

pub use config::{ExecutorConfig, SchedulerConfig, SupervisorConfig};
pub use error::{ExecutorError, JobError, Phase, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use executor::{BoxJobFuture, Executor, Indexed, Job};
pub use policies::BackoffPolicy;
pub use scheduler::Scheduler;
pub use subscribers::{Subscribe, SubscriberSet};
pub use supervisor::{
    ErrorHandler, Service, ServiceFn, ServiceRef, ServiceToken, Supervisor, SupervisorBuilder,
};
pub use sync::{ConcurrentDeque, SyncFlag};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
