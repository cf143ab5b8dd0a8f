//! # Runtime events emitted by executors, schedulers and supervisors.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Executor events**: worker pool lifecycle and job failures
//! - **Scheduler events**: throttle window bookkeeping
//! - **Supervisor events**: service lifecycle, failures and panics
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, service name,
//! phase, reasons and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_name("ingest")
//!     .with_phase(Phase::Run)
//!     .with_reason("boom")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::ServiceFailed);
//! assert_eq!(ev.name.as_deref(), Some("ingest"));
//! assert_eq!(ev.delay_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::error::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Executor events ===
    /// Worker pool spawned.
    ///
    /// Sets:
    /// - `workers`: number of workers spawned by this `start()`
    ExecutorStarted,

    /// Executor scope cancelled; workers are exiting.
    ///
    /// Sets:
    /// - `attempt`: number of queued jobs dropped without running
    ExecutorStopped,

    /// A job returned an error (fanned out to the error sinks).
    ///
    /// Sets:
    /// - `reason`: error message
    JobFailed,

    /// A job panicked; the worker recovered and keeps serving.
    ///
    /// Sets:
    /// - `reason`: panic payload
    JobPanicked,

    // === Scheduler events ===
    /// A submission fell inside an open throttle window and a deferred release was armed.
    ///
    /// Sets:
    /// - `delay_ms`: time until the window closes
    JobThrottled,

    /// A pending throttled job was replaced by a newer submission (last-write-wins).
    JobCoalesced,

    /// The throttle window closed and the pending job was resubmitted.
    ThrottleReleased,

    // === Supervisor events ===
    /// `Supervisor::start()` opened the start gate.
    SupervisorStarted,

    /// `Supervisor::stop()` cancelled the supervisor scope.
    SupervisorStopped,

    /// A service was registered and its supervising task spawned.
    ///
    /// Sets:
    /// - `name`: service name
    ServiceAdded,

    /// A service iteration is starting (`init` about to be called).
    ///
    /// Sets:
    /// - `name`: service name
    /// - `attempt`: iteration number (1-based, per supervising task lifetime of the token)
    ServiceStarting,

    /// A service call returned an error.
    ///
    /// Sets:
    /// - `name`: service name
    /// - `phase`: failing phase
    /// - `reason`: error message
    ServiceFailed,

    /// A service call panicked; the supervising task terminated.
    ///
    /// Sets:
    /// - `name`: service name
    /// - `phase`: panicking phase
    /// - `reason`: panic payload
    ServicePanicked,

    /// A fresh supervising task replaced one that panicked.
    ///
    /// Sets:
    /// - `name`: service name
    /// - `attempt`: panics so far
    ServiceRespawned,

    /// The service scope was cancelled and its supervising loop exited.
    ///
    /// Sets:
    /// - `name`: service name
    ServiceStopped,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the service or subscriber, if applicable.
    pub name: Option<Arc<str>>,
    /// Service phase, if applicable.
    pub phase: Option<Phase>,
    /// Human-readable reason (errors, panic payloads, overflow details).
    pub reason: Option<Arc<str>>,
    /// Attempt/iteration counter (meaning depends on the kind).
    pub attempt: Option<u64>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Number of workers.
    pub workers: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
            phase: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            workers: None,
        }
    }

    /// Attaches a service/subscriber name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a service phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a worker count.
    #[inline]
    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }

    /// True for events describing subscriber delivery problems.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::JobFailed);
        let b = Event::new(EventKind::JobFailed);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates_to_u32() {
        let ev = Event::new(EventKind::JobThrottled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_event());
        assert_eq!(ev.name.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
        assert!(!Event::new(EventKind::ServiceAdded).is_subscriber_event());
    }
}
