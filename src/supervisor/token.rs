//! # ServiceToken: handle to one supervised service.
//!
//! Returned by [`Supervisor::add_service`](crate::Supervisor::add_service). It owns the
//! service's child scope and its counters:
//!
//! - `errors`: every reported fault (failures and panics)
//! - `panics`: recovered panics only
//!
//! Counters are monotonic for the token's lifetime. The failure streak used for
//! restart pacing is internal and resets after an iteration without errors.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use super::service::ServiceRef;

/// Cheaply cloneable handle to a supervised service.
#[derive(Clone)]
pub struct ServiceToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    service: ServiceRef,
    token: CancellationToken,
    errors: AtomicU64,
    panics: AtomicU64,
    streak: AtomicU32,
}

impl ServiceToken {
    pub(crate) fn new(service: ServiceRef, parent: &CancellationToken) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                service,
                token: parent.child_token(),
                errors: AtomicU64::new(0),
                panics: AtomicU64::new(0),
                streak: AtomicU32::new(0),
            }),
        }
    }

    /// Number of errors reported for this service so far.
    pub fn errors_count(&self) -> u64 {
        self.inner.errors.load(Ordering::SeqCst)
    }

    /// Number of panics recovered for this service so far.
    pub fn panics_count(&self) -> u64 {
        self.inner.panics.load(Ordering::SeqCst)
    }

    /// Service name.
    pub fn name(&self) -> &str {
        self.inner.service.name()
    }

    /// The supervised service.
    pub fn service(&self) -> &ServiceRef {
        &self.inner.service
    }

    /// Scope passed to every phase of the service.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Cancels this service only; its loop exits after the current phase returns.
    pub fn stop(&self) {
        self.inner.token.cancel();
    }

    /// True once this service (or its supervisor) was stopped.
    pub fn is_stopped(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub(crate) fn record_error(&self) -> u64 {
        self.inner.errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn record_panic(&self) -> u64 {
        self.inner.panics.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn failure_streak(&self) -> u32 {
        self.inner.streak.load(Ordering::Relaxed)
    }

    pub(crate) fn bump_streak(&self) {
        let _ = self
            .inner
            .streak
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                Some(s.saturating_add(1))
            });
    }

    pub(crate) fn reset_streak(&self) {
        self.inner.streak.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceToken")
            .field("name", &self.name())
            .field("errors", &self.errors_count())
            .field("panics", &self.panics_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::supervisor::ServiceFn;

    fn token(parent: &CancellationToken) -> ServiceToken {
        let svc: ServiceRef = ServiceFn::arc("idle", |_ctx: CancellationToken| async {
            Ok::<_, ServiceError>(())
        });
        ServiceToken::new(svc, parent)
    }

    #[test]
    fn test_counters_and_streak() {
        let t = token(&CancellationToken::new());
        assert_eq!(t.record_error(), 1);
        assert_eq!(t.record_panic(), 1);
        assert_eq!(t.errors_count(), 1);
        assert_eq!(t.panics_count(), 1);

        t.bump_streak();
        t.bump_streak();
        assert_eq!(t.failure_streak(), 2);
        t.reset_streak();
        assert_eq!(t.failure_streak(), 0);
    }

    #[test]
    fn test_stop_is_scoped_to_one_service() {
        let parent = CancellationToken::new();
        let a = token(&parent);
        let b = token(&parent);

        a.stop();
        assert!(a.is_stopped());
        assert!(!b.is_stopped());

        parent.cancel();
        assert!(b.is_stopped());
        assert_eq!(b.name(), "idle");
    }
}
