//! # Live supervising-task counter.
//!
//! Lets `Supervisor::shutdown` wait until every supervising task has exited.
//!
//! ```text
//! spawn_worker() ──► enter() ──► AliveGuard ── dropped on task exit ──► count -= 1
//!                                                              │
//!                                              count == 0 ──► notify idle waiters
//! ```
//!
//! A respawning task enters its replacement before its own guard drops, so the count
//! never touches zero while a service is being replaced.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct AliveTracker {
    inner: Arc<AliveInner>,
}

#[derive(Default)]
struct AliveInner {
    count: AtomicUsize,
    idle: Notify,
}

pub(crate) struct AliveGuard {
    inner: Arc<AliveInner>,
}

impl AliveTracker {
    pub(crate) fn enter(&self) -> AliveGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        AliveGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Resolves once no supervising task is alive.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_idle_resolves_after_last_guard() {
        let tracker = AliveTracker::default();
        let a = tracker.enter();
        let b = tracker.enter();
        assert_eq!(tracker.count(), 2);

        drop(a);
        let pending = tokio::time::timeout(Duration::from_millis(50), tracker.wait_idle()).await;
        assert!(pending.is_err());

        drop(b);
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_idle())
            .await
            .expect("tracker should be idle");
    }
}
