use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::supervisor::{Shared, Supervisor};
use crate::config::SupervisorConfig;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Supervisor`] with optional wiring.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    parent: Option<CancellationToken>,
    bus: Option<Bus>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            parent: None,
            bus: None,
            subscribers: Vec::new(),
        }
    }

    /// Derives the supervisor's root scope from `parent`.
    ///
    /// Cancelling `parent` stops every service.
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Publishes into an existing bus (e.g. one shared with an executor).
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor.
    ///
    /// Must be called inside a tokio runtime when subscribers were set (their workers
    /// are spawned here). They keep receiving events until `Supervisor::shutdown`.
    pub fn build(self) -> Supervisor {
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.cfg.bus_capacity_clamped()));
        let token = match &self.parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let stop = CancellationToken::new();
            let handle = SubscriberSet::new(self.subscribers, bus.clone()).listen(stop.clone());
            Some((stop, handle))
        };

        Supervisor::from_shared(Shared::new(&self.cfg, token, bus, listener))
    }
}
