//! # Scheduler: throttled submission in front of a single-worker executor.
//!
//! Every [`Scheduler`] owns a one-worker [`Executor`] and one throttle lane shared by all
//! of its jobs. A submission either runs now or becomes **the** pending job:
//!
//! ```text
//! post_throttled_job(job, delay)
//!   │
//!   ├─ last == None or now - last >= delay ──► last = now ──► executor.post(job)
//!   │
//!   └─ inside the window ──► pending = job (older pending job is dropped)
//!                               │
//!                               └─ slot was empty? ──► timer(delay - elapsed)
//!                                                        │   (or scope cancelled)
//!                                                        ▼
//!                                           take(pending) ──► post_throttled_job(job, delay)
//! ```
//!
//! In a burst inside one window only the first and the last submissions run
//! (last-write-wins coalescing).
//!
//! ## Lock order
//! `last` → `runtime` → `pending`. The timer task takes `pending` on its own and
//! releases it before resubmitting.
//!
//! ## Runtime
//! Release timers are spawned on the runtime seen by `new`/`start`, so plain threads
//! may submit too. The timer is resolved before the slot is written: a submission that
//! cannot arm one is rejected and leaves the slot untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::error::{ExecutorError, JobError};
use crate::events::{Bus, Event, EventKind};
use crate::executor::{Executor, Job};

/// Throttling front-end over a single-worker executor.
///
/// Cheap to clone; clones share the throttle window and the pending slot.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    executor: Executor,
    token: CancellationToken,
    last: Mutex<Option<Instant>>,
    pending: Mutex<Option<Job>>,
    runtime: Mutex<Option<Handle>>,
    bus: Bus,
}

impl Scheduler {
    /// Creates a scheduler with its own root scope and event bus.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self::build(&cfg, CancellationToken::new())
    }

    /// Creates a scheduler whose scope is a child of `parent`.
    pub fn with_parent(cfg: SchedulerConfig, parent: &CancellationToken) -> Self {
        Self::build(&cfg, parent.child_token())
    }

    fn build(cfg: &SchedulerConfig, token: CancellationToken) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let executor = Executor::with_bus(cfg.executor_config(), &token, bus.clone());
        Self {
            inner: Arc::new(Inner {
                executor,
                token,
                last: Mutex::new(None),
                pending: Mutex::new(None),
                runtime: Mutex::new(Handle::try_current().ok()),
                bus,
            }),
        }
    }

    /// Starts the inner executor.
    ///
    /// Must be called inside a tokio runtime; release timers are spawned on it.
    pub fn start(&self) {
        if let Ok(handle) = Handle::try_current() {
            *self.inner.runtime.lock() = Some(handle);
        }
        self.inner.executor.start();
    }

    /// Stops the inner executor, cancels pending releases and drops the pending job.
    pub fn stop(&self) {
        self.inner.executor.stop();
        self.inner.token.cancel();
        self.inner.pending.lock().take();
    }

    /// Stops the scheduler and waits for the worker to exit.
    pub async fn shutdown(&self) {
        self.stop();
        self.inner.executor.shutdown().await;
    }

    /// Posts a job with no throttle window.
    ///
    /// Equivalent to `post_throttled_job(f, Duration::ZERO)`: it still records the
    /// execution time seen by later throttled submissions.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] after `stop()`.
    pub fn post_job<F, Fut>(&self, f: F) -> Result<(), ExecutorError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.post_throttled_job(f, Duration::ZERO)
    }

    /// Posts a job that runs at most once per `delay` window.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] after `stop()`, and
    /// [`ExecutorError::NoRuntime`] when the job must wait but the scheduler never saw
    /// a tokio runtime.
    pub fn post_throttled_job<F, Fut>(&self, f: F, delay: Duration) -> Result<(), ExecutorError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.post_throttled(Job::new(f), delay)
    }

    /// Throttled submission of an already built [`Job`].
    ///
    /// # Errors
    /// Same as [`Scheduler::post_throttled_job`].
    pub fn post_throttled(&self, job: Job, delay: Duration) -> Result<(), ExecutorError> {
        Inner::submit(&self.inner, job, delay)
    }

    /// Registers a sink receiving every job error.
    pub fn error_chan(&self, sink: mpsc::Sender<JobError>) {
        self.inner.executor.error_chan(sink);
    }

    /// Number of jobs queued in the inner executor (the pending throttled job is not counted).
    pub fn len(&self) -> usize {
        self.inner.executor.len()
    }

    /// True if the inner executor has nothing queued.
    pub fn is_empty(&self) -> bool {
        self.inner.executor.is_empty()
    }

    /// True if a throttled job is waiting for its window to close.
    pub fn has_pending(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    /// Scheduler scope.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Event bus shared by the scheduler and its executor.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }
}

impl Inner {
    fn submit(this: &Arc<Self>, job: Job, delay: Duration) -> Result<(), ExecutorError> {
        if this.token.is_cancelled() {
            return Err(ExecutorError::Stopped);
        }

        let mut last = this.last.lock();
        // Read under the lock so racing submitters never move `last` backwards.
        let now = Instant::now();
        if let Some(prev) = *last {
            let elapsed = now.saturating_duration_since(prev);
            if elapsed < delay {
                return Self::defer(this, job, delay, delay - elapsed);
            }
        }
        *last = Some(now);
        this.executor.post(job)
    }

    fn defer(
        this: &Arc<Self>,
        job: Job,
        delay: Duration,
        wait: Duration,
    ) -> Result<(), ExecutorError> {
        let Some(runtime) = this.timer_runtime() else {
            return Err(ExecutorError::NoRuntime);
        };
        if this.pending.lock().replace(job).is_some() {
            this.bus.publish(Event::new(EventKind::JobCoalesced));
            return Ok(());
        }
        this.bus
            .publish(Event::new(EventKind::JobThrottled).with_delay(wait));

        let inner = Arc::clone(this);
        runtime.spawn(async move {
            tokio::select! {
                _ = inner.token.cancelled() => {}
                _ = tokio::time::sleep(wait) => {
                    let Some(job) = inner.pending.lock().take() else {
                        return;
                    };
                    inner.bus.publish(Event::new(EventKind::ThrottleReleased));
                    if let Err(e) = Self::submit(&inner, job, delay) {
                        eprintln!("[jobvisor] throttled job dropped: {e}");
                    }
                }
            }
        });
        Ok(())
    }

    fn timer_runtime(&self) -> Option<Handle> {
        self.runtime
            .lock()
            .clone()
            .or_else(|| Handle::try_current().ok())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.len())
            .field("pending", &self.has_pending())
            .field("stopped", &self.inner.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Runs = Arc<Mutex<Vec<(&'static str, Instant)>>>;

    fn recorder(runs: &Runs, label: &'static str) -> Job {
        let runs = Arc::clone(runs);
        Job::new(move |_ctx| async move {
            runs.lock().push((label, Instant::now()));
            Ok(())
        })
    }

    async fn wait_runs(runs: &Runs, n: usize) {
        tokio::time::timeout(Duration::from_secs(3), async {
            while runs.lock().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs did not run in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_job_waits_for_window() {
        let sched = Scheduler::new(SchedulerConfig::default());
        sched.start();
        let runs: Runs = Arc::default();
        let delay = Duration::from_millis(500);
        let t0 = Instant::now();

        sched.post_throttled(recorder(&runs, "a"), delay).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sched.post_throttled(recorder(&runs, "b"), delay).unwrap();

        wait_runs(&runs, 2).await;
        let runs = runs.lock().clone();
        assert_eq!(runs[0].0, "a");
        assert_eq!(runs[1].0, "b");
        assert!(runs[1].1.duration_since(t0) >= delay);
        sched.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_burst_keeps_first_and_last() {
        let sched = Scheduler::new(SchedulerConfig::default());
        sched.start();
        let runs: Runs = Arc::default();
        let delay = Duration::from_millis(500);

        sched.post_throttled(recorder(&runs, "t0"), delay).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sched.post_throttled(recorder(&runs, "t50"), delay).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sched.post_throttled(recorder(&runs, "t100"), delay).unwrap();

        wait_runs(&runs, 2).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let labels: Vec<_> = runs.lock().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["t0", "t100"]);
        sched.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_after_stop_is_rejected() {
        let sched = Scheduler::new(SchedulerConfig::default());
        sched.start();
        sched.stop();

        assert_eq!(
            sched.post_job(|_ctx| async { Ok(()) }),
            Err(ExecutorError::Stopped)
        );
        assert!(
            sched
                .post_throttled_job(|_ctx| async { Ok(()) }, Duration::from_secs(1))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_stop_drops_pending_job() {
        let sched = Scheduler::new(SchedulerConfig::default());
        sched.start();
        let runs: Runs = Arc::default();
        let delay = Duration::from_millis(200);

        sched.post_throttled(recorder(&runs, "first"), delay).unwrap();
        sched.post_throttled(recorder(&runs, "second"), delay).unwrap();
        assert!(sched.has_pending());

        wait_runs(&runs, 1).await;
        sched.stop();
        assert!(!sched.has_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(runs.lock().len(), 1);
        sched.shutdown().await;
    }

    #[tokio::test]
    async fn test_throttle_events_are_published() {
        let sched = Scheduler::new(SchedulerConfig::default());
        let mut events = sched.bus().subscribe();
        let delay = Duration::from_secs(5);

        sched.post_throttled_job(|_ctx| async { Ok(()) }, delay).unwrap();
        sched.post_throttled_job(|_ctx| async { Ok(()) }, delay).unwrap();
        sched.post_throttled_job(|_ctx| async { Ok(()) }, delay).unwrap();
        assert_eq!(sched.len(), 1);

        let throttled = events.recv().await.unwrap();
        assert_eq!(throttled.kind, EventKind::JobThrottled);
        assert!(throttled.delay_ms.unwrap() <= 5_000);
        assert_eq!(events.recv().await.unwrap().kind, EventKind::JobCoalesced);
        sched.stop();
    }

    #[tokio::test]
    async fn test_errors_reach_sink() {
        let sched = Scheduler::new(SchedulerConfig::default());
        let (tx, mut rx) = mpsc::channel(1);
        sched.error_chan(tx);
        sched.start();

        sched
            .post_job(|_ctx| async { Err(JobError::fail("throttled failure")) })
            .unwrap();
        let err = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(err, Some(JobError::fail("throttled failure")));
        sched.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_throttled_posts_from_plain_thread() {
        let sched = Scheduler::new(SchedulerConfig::default());
        sched.start();
        let runs: Runs = Arc::default();
        let delay = Duration::from_millis(200);

        let poster = {
            let sched = sched.clone();
            let runs = Arc::clone(&runs);
            std::thread::spawn(move || {
                sched.post_throttled(recorder(&runs, "first"), delay)?;
                sched.post_throttled(recorder(&runs, "middle"), delay)?;
                sched.post_throttled(recorder(&runs, "last"), delay)
            })
        };
        assert_eq!(poster.join().unwrap(), Ok(()));

        wait_runs(&runs, 2).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let labels: Vec<_> = runs.lock().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["first", "last"]);
        assert!(!sched.has_pending());
        sched.shutdown().await;
    }

    #[test]
    fn test_deferral_without_runtime_leaves_slot_empty() {
        let sched = Scheduler::new(SchedulerConfig::default());
        let runs: Runs = Arc::default();
        let delay = Duration::from_secs(1);

        assert_eq!(sched.post_throttled(recorder(&runs, "now"), delay), Ok(()));
        assert_eq!(
            sched.post_throttled(recorder(&runs, "later"), delay),
            Err(ExecutorError::NoRuntime)
        );
        assert!(!sched.has_pending());
        assert_eq!(sched.len(), 1);
        sched.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_submitters_keep_last_monotonic() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let sched = Scheduler::new(SchedulerConfig::default());
        sched.start();
        let ran = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let sched = sched.clone();
                let ran = Arc::clone(&ran);
                std::thread::spawn(move || {
                    let mut seen: Option<Instant> = None;
                    for _ in 0..50 {
                        let ran = Arc::clone(&ran);
                        sched
                            .post_job(move |_ctx| async move {
                                ran.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            })
                            .unwrap();
                        let last = *sched.inner.last.lock();
                        assert!(last >= seen, "last execution time went backwards");
                        seen = last;
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        tokio::time::timeout(Duration::from_secs(3), async {
            while ran.load(Ordering::SeqCst) < 200 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("every unthrottled job should run");
        assert!(!sched.has_pending());
        sched.shutdown().await;
    }
}
