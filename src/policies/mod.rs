//! Restart pacing policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how the pause between service restarts evolves
//!   (first / factor / max)
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { restart_backoff: BackoffPolicy, .. }
//!      └─► supervising loop pauses backoff.next(streak - 1) after a failed iteration
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → immediate restart (cooperative yield only).

mod backoff;

pub use backoff::BackoffPolicy;
