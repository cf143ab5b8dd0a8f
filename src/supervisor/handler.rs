//! Error handler contract.
//!
//! Handlers are invoked synchronously by the supervising task, in registration order,
//! for every reported service error. A panicking handler is isolated: the panic is
//! logged to stderr and the remaining handlers still run.

use super::token::ServiceToken;
use crate::error::ServiceError;

/// Receives every error reported by any service of a supervisor.
///
/// Implemented for plain closures:
/// ```
/// use jobvisor::{ServiceError, ServiceToken, Supervisor, SupervisorConfig};
///
/// # #[tokio::main] async fn main() {
/// let sup = Supervisor::new(SupervisorConfig::default());
/// sup.add_error_handler(|svc: &ServiceToken, err: &ServiceError| {
///     eprintln!("{} failed: {err}", svc.name());
/// });
/// # }
/// ```
pub trait ErrorHandler: Send + Sync + 'static {
    /// Called once per reported error. Must not block for long.
    fn on_service_error(&self, service: &ServiceToken, err: &ServiceError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&ServiceToken, &ServiceError) + Send + Sync + 'static,
{
    fn on_service_error(&self, service: &ServiceToken, err: &ServiceError) {
        self(service, err)
    }
}
