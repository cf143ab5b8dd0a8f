//! Service supervision.
//!
//! - [`Service`] / [`ServiceFn`] long-running units with `init → run → clean`
//! - [`ServiceToken`] per-service scope and counters
//! - [`ErrorHandler`] ordered error callbacks
//! - [`Supervisor`] / [`SupervisorBuilder`] owner of all supervising tasks

mod alive;
mod builder;
mod handler;
mod service;
#[allow(clippy::module_inception)]
mod supervisor;
mod token;
mod worker;

pub use builder::SupervisorBuilder;
pub use handler::ErrorHandler;
pub use service::{Service, ServiceFn, ServiceRef};
pub use supervisor::Supervisor;
pub use token::ServiceToken;
