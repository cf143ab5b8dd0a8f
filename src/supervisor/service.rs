//! # Service abstraction and function-backed service implementation.
//!
//! A [`Service`] is a long-running unit with a three-phase lifecycle driven by the
//! [`Supervisor`](crate::Supervisor):
//!
//! ```text
//! init(ctx) ──ok──► run(ctx) ──► clean(ctx) ──► (next iteration)
//!     │
//!     └──err──► (next iteration, clean skipped)
//! ```
//!
//! Every phase receives the service's [`CancellationToken`]; implementations should
//! return promptly once it is cancelled. The common handle type is [`ServiceRef`].

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// # Long-running supervised unit.
///
/// Only [`run`](Service::run) is required; [`init`](Service::init) and
/// [`clean`](Service::clean) default to no-ops.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use jobvisor::{Service, ServiceError};
/// use tokio_util::sync::CancellationToken;
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Service for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
///         ctx.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Human-readable service name (used in events).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Prepares the service for one iteration. An error skips `run` and `clean`.
    async fn init(&self, _ctx: CancellationToken) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Main body of one iteration.
    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError>;

    /// Releases per-iteration resources; runs after every successful `init`.
    async fn clean(&self, _ctx: CancellationToken) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Function-backed service: `run` calls the closure, `init`/`clean` are no-ops.
///
/// The closure *creates* a new future per iteration; share state across iterations
/// through an explicit `Arc<...>`.
///
/// ## Example
/// ```rust
/// use jobvisor::{ServiceError, ServiceFn, ServiceRef};
/// use tokio_util::sync::CancellationToken;
///
/// let svc: ServiceRef = ServiceFn::arc("poller", |ctx: CancellationToken| async move {
///     ctx.cancelled().await;
///     Ok::<_, ServiceError>(())
/// });
/// assert_eq!(svc.name(), "poller");
/// ```
#[derive(Debug)]
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new function-backed service.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        (self.f)(ctx).await
    }
}
