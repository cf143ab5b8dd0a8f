//! # Event observers
//!
//! Executors, schedulers and supervisors report what they do as [`Event`]s on a
//! [`Bus`](crate::Bus). A type implementing [`Subscribe`] sees those events once it is
//! handed to a [`SubscriberSet`](crate::SubscriberSet) (directly, or through
//! `SupervisorBuilder::with_subscribers`).
//!
//! The set gives every subscriber its own task and its own bounded queue:
//! a subscriber that stalls only loses its own events, reported as
//! `SubscriberOverflow`. A panic inside `on_event` is reported as
//! `SubscriberPanicked` and the subscriber keeps receiving later events.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use async_trait::async_trait;
//! use jobvisor::{Event, EventKind, Subscribe};
//!
//! /// Tallies failed and panicked jobs.
//! #[derive(Default)]
//! struct JobFailures(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for JobFailures {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::JobFailed | EventKind::JobPanicked) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn queue_capacity(&self) -> usize {
//!         64
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives events published by jobvisor components.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per delivered event, in publish order.
    async fn on_event(&self, event: &Event);

    /// Label used in `SubscriberOverflow`/`SubscriberPanicked` events.
    ///
    /// Defaults to the implementing type's path.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before newer ones are dropped.
    ///
    /// Values below 1 are treated as 1.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl Subscribe for Silent {
        async fn on_event(&self, _event: &Event) {}
    }

    #[test]
    fn test_defaults_name_the_type_and_buffer_1024() {
        assert!(Silent.name().ends_with("Silent"));
        assert_eq!(Silent.queue_capacity(), 1024);
    }
}
