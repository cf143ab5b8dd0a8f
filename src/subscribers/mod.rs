//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out for
//! handling runtime events broadcast through the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Executor / Scheduler / Supervisor ── publish(Event) ──► Bus
//!                                                          │
//!                                              SubscriberSet::listen()
//!                                                          │
//!                                        ┌─────────────────┼──────────────┐
//!                                        ▼                 ▼              ▼
//!                                    LogWriter          Metrics        Custom
//! ```
//!
//! ## Optional
//! - `logging` feature: exports [`LogWriter`] (stdout printer, demo/reference only).

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
