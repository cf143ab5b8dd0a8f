//! # Supervisor: keeps services running until told to stop.
//!
//! The [`Supervisor`] owns a root scope, an ordered list of [`ErrorHandler`]s and a
//! start gate. Each [`Supervisor::add_service`] call creates a [`ServiceToken`] (a child
//! scope plus counters) and spawns one supervising task for it.
//!
//! ## Architecture
//! ```text
//! add_service(svc) ──► ServiceToken(child scope) ──► spawn_worker()
//!                                                        │
//!                         start() ──► open gate ────────►│
//!                                                        ▼
//!                                   init → run → clean → pause → ...
//!                                        │ error / panic
//!                                        ▼
//!                        report(): errors += 1 ──► handler 1 ──► handler 2 ──► ...
//!
//! stop() ──► cancel root scope ──► every service scope cancelled
//! ```
//!
//! ## Rules
//! - Services added before `start()` wait for it; added after, they begin at once.
//! - Handlers run synchronously on the supervising task, in registration order.
//! - `stop()` is cooperative: loops exit after the current phase returns.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::alive::AliveTracker;
use super::builder::SupervisorBuilder;
use super::handler::ErrorHandler;
use super::service::ServiceRef;
use super::token::ServiceToken;
use super::worker::spawn_worker;
use crate::config::SupervisorConfig;
use crate::error::{ServiceError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::sync::SyncFlag;

/// State shared by the supervisor handle and its supervising tasks.
pub(crate) struct Shared {
    pub(crate) token: CancellationToken,
    pub(crate) handlers: Mutex<Vec<Arc<dyn ErrorHandler>>>,
    pub(crate) start_gate: SyncFlag,
    pub(crate) bus: Bus,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) alive: AliveTracker,
    listener: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Shared {
    pub(crate) fn new(
        cfg: &SupervisorConfig,
        token: CancellationToken,
        bus: Bus,
        listener: Option<(CancellationToken, JoinHandle<()>)>,
    ) -> Self {
        Self {
            token,
            handlers: Mutex::new(Vec::new()),
            start_gate: SyncFlag::new(false),
            bus,
            backoff: cfg.restart_backoff,
            alive: AliveTracker::default(),
            listener: Mutex::new(listener),
        }
    }

    /// Counts the error and hands it to every handler in registration order.
    pub(crate) fn report(&self, svc: &ServiceToken, err: &ServiceError) {
        svc.record_error();
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            let call = AssertUnwindSafe(|| handler.on_service_error(svc, err));
            if let Err(payload) = std::panic::catch_unwind(call) {
                eprintln!(
                    "[jobvisor] error handler panicked for service '{}': {}",
                    svc.name(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

/// Supervisor of long-running services.
///
/// Cheap to clone; clones control the same services.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl Supervisor {
    /// Creates a supervisor with its own root scope and event bus and no subscribers.
    pub fn new(cfg: SupervisorConfig) -> Self {
        SupervisorBuilder::new(cfg).build()
    }

    /// Returns a builder for wiring a parent scope, a shared bus or subscribers.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn from_shared(shared: Shared) -> Self {
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Appends a handler receiving every service error.
    pub fn add_error_handler<H: ErrorHandler>(&self, handler: H) {
        self.shared.handlers.lock().push(Arc::new(handler));
    }

    /// Registers a service and spawns its supervising task.
    ///
    /// Must be called inside a tokio runtime. The service starts once [`Supervisor::start`]
    /// was called (immediately if it already was).
    pub fn add_service(&self, service: ServiceRef) -> ServiceToken {
        let svc = ServiceToken::new(service, &self.shared.token);
        self.shared
            .bus
            .publish(Event::new(EventKind::ServiceAdded).with_name(svc.name()));
        spawn_worker(Arc::clone(&self.shared), svc.clone());
        svc
    }

    /// Opens the start gate for every registered and future service.
    pub fn start(&self) {
        if self.shared.start_gate.is_set() {
            return;
        }
        self.shared.start_gate.set();
        self.shared
            .bus
            .publish(Event::new(EventKind::SupervisorStarted));
    }

    /// Cancels the root scope and with it every service.
    pub fn stop(&self) {
        if self.shared.token.is_cancelled() {
            return;
        }
        self.shared.token.cancel();
        self.shared
            .bus
            .publish(Event::new(EventKind::SupervisorStopped));
    }

    /// Stops the supervisor, waits for every supervising task and then for subscribers.
    pub async fn shutdown(&self) {
        self.stop();
        self.shared.alive.wait_idle().await;

        let listener = self.shared.listener.lock().take();
        if let Some((stop, handle)) = listener {
            stop.cancel();
            let _ = handle.await;
        }
    }

    /// True once `start()` was called.
    pub fn is_started(&self) -> bool {
        self.shared.start_gate.is_set()
    }

    /// True once the root scope was cancelled.
    pub fn is_stopped(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Number of supervising tasks currently alive.
    pub fn alive(&self) -> usize {
        self.shared.alive.count()
    }

    /// Root scope of the supervisor.
    pub fn token(&self) -> &CancellationToken {
        &self.shared.token
    }

    /// Event bus the supervisor publishes into.
    pub fn bus(&self) -> &Bus {
        &self.shared.bus
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("started", &self.is_started())
            .field("stopped", &self.is_stopped())
            .field("alive", &self.alive())
            .field("handlers", &self.shared.handlers.lock().len())
            .finish()
    }
}
