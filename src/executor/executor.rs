//! # Executor: fixed pool of workers over a shared job deque.
//!
//! The [`Executor`] owns a [`ConcurrentDeque`] of pending jobs and a [`SyncFlag`]
//! that signals "work available". `start()` spawns `workers` tasks, each running:
//!
//! ```text
//! loop:
//!   wait(has_work) ◄──────── or scope cancelled ──► exit
//!     │
//!     ▼
//!   pop_front()
//!     ├─ None ──► reset(has_work) ──► (re-signal if a push raced in) ──► loop
//!     └─ Some(job)
//!          │
//!          ▼
//!        job.run(scope)  ── panic caught ──► JobError::Panicked
//!          ├─ Ok  ──► loop
//!          └─ Err ──► publish JobFailed/JobPanicked ──► every error sink ──► loop
//! ```
//!
//! ## Rules
//! - Each posted job runs at most once; FIFO dispatch order.
//! - `post_job` wakes one idle worker; bulk submissions wake all of them.
//! - After `stop()` nothing is accepted and queued jobs are dropped without running.
//!   Cancelling a parent scope drops them as well, once a worker or a waiting
//!   `collect` observes it.
//! - A failing or panicking job never takes a worker down.
//!
//! ## Collecting results
//! - [`Executor::collect_chan`] yields results in **submission order**.
//! - [`Executor::collect_chan_first_serve`] yields [`Indexed`] results in completion order.
//! - Failed jobs, jobs that finish after the scope was cancelled, and jobs dropped by
//!   `stop()` produce no result; the stream simply ends earlier.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::collect::{Indexed, OrderedPublisher};
use super::job::Job;
use super::sinks::ErrorSinks;
use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, JobError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::sync::{ConcurrentDeque, SyncFlag};

/// Worker pool executing posted jobs.
///
/// Cheap to clone; clones share the same queue, workers and scope.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<Inner>,
}

struct Inner {
    deque: ConcurrentDeque<Job>,
    has_work: SyncFlag,
    workers: usize,
    sinks: ErrorSinks,
    token: CancellationToken,
    bus: Bus,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Executor {
    /// Creates an executor with its own root scope and event bus.
    pub fn new(cfg: ExecutorConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::build(&cfg, CancellationToken::new(), bus)
    }

    /// Creates an executor whose scope is a child of `parent`.
    ///
    /// Cancelling `parent` stops the executor.
    pub fn with_parent(cfg: ExecutorConfig, parent: &CancellationToken) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::build(&cfg, parent.child_token(), bus)
    }

    /// Creates an executor scoped under `parent` that publishes into an existing bus.
    pub fn with_bus(cfg: ExecutorConfig, parent: &CancellationToken, bus: Bus) -> Self {
        Self::build(&cfg, parent.child_token(), bus)
    }

    fn build(cfg: &ExecutorConfig, token: CancellationToken, bus: Bus) -> Self {
        Self {
            inner: Arc::new(Inner {
                deque: ConcurrentDeque::new(),
                has_work: SyncFlag::new(false),
                workers: cfg.workers_clamped(),
                sinks: ErrorSinks::default(),
                token,
                bus,
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Spawns the worker tasks.
    ///
    /// Must be called inside a tokio runtime. Jobs posted before `start()` stay queued
    /// and are picked up once the workers are running.
    pub fn start(&self) {
        let mut handles = self.inner.handles.lock();
        for _ in 0..self.inner.workers {
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(async move { inner.work().await }));
        }
        self.inner.bus.publish(
            Event::new(EventKind::ExecutorStarted).with_workers(self.inner.workers),
        );
    }

    /// Cancels the executor scope, wakes every worker and drops queued jobs.
    ///
    /// Running jobs observe the cancelled scope; they are not interrupted forcibly.
    pub fn stop(&self) {
        if self.inner.token.is_cancelled() && self.inner.deque.is_empty() {
            return;
        }
        self.inner.token.cancel();
        self.inner.has_work.set();
        let dropped = self.inner.deque.clear();
        self.inner
            .bus
            .publish(Event::new(EventKind::ExecutorStopped).with_attempt(dropped as u64));
    }

    /// Stops the executor and waits for every worker to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handles = std::mem::take(&mut *self.inner.handles.lock());
        for h in handles {
            let _ = h.await;
        }
    }

    /// Enqueues a job at the back of the queue and wakes one idle worker.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] once the scope is cancelled.
    pub fn post(&self, job: Job) -> Result<(), ExecutorError> {
        self.ensure_running()?;
        self.inner.deque.push_back(job);
        if self.inner.token.is_cancelled() {
            // Lost a race with cancellation: no worker is left to pop it.
            self.inner.deque.clear();
            return Err(ExecutorError::Stopped);
        }
        self.inner.has_work.set_one();
        Ok(())
    }

    /// Wraps `f` into a [`Job`] and posts it.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] once the scope is cancelled.
    pub fn post_job<F, Fut>(&self, f: F) -> Result<(), ExecutorError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.post(Job::new(f))
    }

    /// Registers a sink that receives a copy of every job error.
    pub fn error_chan(&self, sink: mpsc::Sender<JobError>) {
        self.inner.sinks.register(sink);
    }

    /// Submits `jobs` in bulk and returns a stream of their results in submission order.
    ///
    /// The stream closes after the last job resolved. Jobs that fail or finish after
    /// cancellation are skipped, so fewer values than jobs may arrive.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] once the scope is cancelled.
    pub fn collect_chan<T>(
        &self,
        jobs: impl IntoIterator<Item = Job<T>>,
    ) -> Result<mpsc::UnboundedReceiver<T>, ExecutorError>
    where
        T: Send + 'static,
    {
        self.ensure_running()?;
        let jobs: Vec<Job<T>> = jobs.into_iter().collect();
        let (tx, rx) = mpsc::unbounded_channel();
        let publisher = OrderedPublisher::new(jobs.len(), tx);

        let wrapped = jobs.into_iter().enumerate().map(|(index, job)| {
            let slot = publisher.slot(index);
            Job::new(move |ctx: CancellationToken| async move {
                let value = job.run(ctx.clone()).await?;
                if !ctx.is_cancelled() {
                    slot.fill(value);
                }
                Ok::<(), JobError>(())
            })
        });
        self.post_bulk(wrapped)?;
        Ok(rx)
    }

    /// Like [`Executor::collect_chan`], but emits each result as soon as its job
    /// finishes, tagged with the job's submission index.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] once the scope is cancelled.
    pub fn collect_chan_first_serve<T>(
        &self,
        jobs: impl IntoIterator<Item = Job<T>>,
    ) -> Result<mpsc::UnboundedReceiver<Indexed<T>>, ExecutorError>
    where
        T: Send + 'static,
    {
        self.ensure_running()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let wrapped: Vec<Job> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let tx = tx.clone();
                Job::new(move |ctx: CancellationToken| async move {
                    let value = job.run(ctx.clone()).await?;
                    if !ctx.is_cancelled() {
                        let _ = tx.send(Indexed { index, value });
                    }
                    Ok::<(), JobError>(())
                })
            })
            .collect();
        drop(tx);
        self.post_bulk(wrapped)?;
        Ok(rx)
    }

    /// Submits `jobs` and waits for all of them, returning results in submission order.
    ///
    /// Returns early when the scope is cancelled: queued jobs are dropped and only
    /// jobs already running are awaited.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Stopped`] once the scope is cancelled.
    pub async fn collect<T>(
        &self,
        jobs: impl IntoIterator<Item = Job<T>>,
    ) -> Result<Vec<T>, ExecutorError>
    where
        T: Send + 'static,
    {
        let mut rx = self.collect_chan(jobs)?;
        let mut out = Vec::new();
        let mut dropped = false;
        loop {
            tokio::select! {
                biased;
                v = rx.recv() => match v {
                    Some(v) => out.push(v),
                    None => break,
                },
                // Covers executors that were never started.
                _ = self.inner.token.cancelled(), if !dropped => {
                    self.inner.deque.clear();
                    dropped = true;
                }
            }
        }
        Ok(out)
    }

    /// Number of queued jobs not yet picked up by a worker.
    pub fn len(&self) -> usize {
        self.inner.deque.size()
    }

    /// True if no job is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.deque.is_empty()
    }

    /// Configured number of workers.
    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    /// True once the executor scope was cancelled.
    pub fn is_stopped(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Executor scope handed to every job.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Event bus the executor publishes into.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    fn ensure_running(&self) -> Result<(), ExecutorError> {
        if self.inner.token.is_cancelled() {
            Err(ExecutorError::Stopped)
        } else {
            Ok(())
        }
    }

    fn post_bulk(&self, jobs: impl IntoIterator<Item = Job>) -> Result<(), ExecutorError> {
        self.inner.deque.extend_back(jobs);
        if self.inner.token.is_cancelled() {
            self.inner.deque.clear();
            return Err(ExecutorError::Stopped);
        }
        self.inner.has_work.set();
        Ok(())
    }
}

impl Inner {
    async fn work(&self) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    // Queued jobs hold collect slots; dropping them closes the streams.
                    self.deque.clear();
                    break;
                }
                _ = self.has_work.wait_async() => {}
            }

            let Some(job) = self.deque.pop_front() else {
                self.has_work.reset();
                // A push may land between the empty pop and the reset.
                if !self.deque.is_empty() {
                    self.has_work.set_one();
                }
                continue;
            };
            self.execute(job).await;
        }
    }

    async fn execute(&self, job: Job) {
        let ctx = self.token.clone();
        let res = AssertUnwindSafe(async move { job.run(ctx).await })
            .catch_unwind()
            .await;

        let err = match res {
            Ok(Ok(())) => return,
            Ok(Err(err)) => {
                self.bus.publish(
                    Event::new(EventKind::JobFailed).with_reason(err.as_message()),
                );
                err
            }
            Err(payload) => {
                let info = panic_message(payload.as_ref());
                self.bus
                    .publish(Event::new(EventKind::JobPanicked).with_reason(info.clone()));
                JobError::Panicked { info }
            }
        };
        self.sinks.emit(err).await;
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("workers", &self.inner.workers)
            .field("queued", &self.inner.deque.size())
            .field("stopped", &self.inner.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn executor(workers: usize) -> Executor {
        Executor::new(ExecutorConfig::with_workers(workers))
    }

    fn value_after(ms: u64, v: u32) -> Job<u32> {
        Job::new(move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(v)
        })
    }

    #[tokio::test]
    async fn test_posted_job_runs() {
        let exec = executor(2);
        exec.start();

        let (tx, rx) = oneshot::channel();
        exec.post_job(move |_ctx| async move {
            let _ = tx.send(7);
            Ok(())
        })
        .unwrap();

        let got = tokio::time::timeout(Duration::from_secs(2), rx).await;
        assert_eq!(got.unwrap().unwrap(), 7);
        exec.shutdown().await;
    }

    #[tokio::test]
    async fn test_jobs_posted_before_start_are_queued() {
        let exec = executor(1);
        exec.post_job(|_ctx| async { Ok(()) }).unwrap();
        exec.post_job(|_ctx| async { Ok(()) }).unwrap();
        assert_eq!(exec.len(), 2);

        exec.start();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !exec.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue should drain");
        exec.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_after_stop_is_rejected() {
        let exec = executor(1);
        exec.start();
        exec.stop();

        assert!(exec.is_stopped());
        assert_eq!(
            exec.post_job(|_ctx| async { Ok(()) }),
            Err(ExecutorError::Stopped)
        );
        assert!(exec.collect_chan(vec![value_after(0, 1)]).is_err());
    }

    #[tokio::test]
    async fn test_stop_drops_queued_jobs() {
        let exec = executor(1);
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            exec.post_job(move |_ctx| async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        }

        exec.stop();
        assert_eq!(exec.len(), 0);
        exec.start();
        exec.shutdown().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_errors_reach_every_sink() {
        let exec = executor(1);
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        exec.error_chan(tx1);
        exec.error_chan(tx2);
        exec.start();

        exec.post_job(|_ctx| async { Err(JobError::fail("bad input")) })
            .unwrap();

        let e1 = tokio::time::timeout(Duration::from_secs(2), rx1.recv()).await;
        let e2 = tokio::time::timeout(Duration::from_secs(2), rx2.recv()).await;
        assert_eq!(e1.unwrap(), Some(JobError::fail("bad input")));
        assert_eq!(e2.unwrap(), Some(JobError::fail("bad input")));
        exec.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_job_is_reported_and_worker_survives() {
        let exec = executor(1);
        let (tx, mut rx) = mpsc::channel(4);
        exec.error_chan(tx);
        exec.start();

        exec.post_job(|_ctx| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
        .unwrap();
        let err = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            err,
            JobError::Panicked {
                info: "kaboom".to_string()
            }
        );

        let got = exec.collect(vec![value_after(0, 5)]).await.unwrap();
        assert_eq!(got, vec![5]);
        exec.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_collect_preserves_submission_order() {
        let exec = executor(2);
        exec.start();

        let got = exec
            .collect(vec![value_after(300, 0), value_after(0, 1)])
            .await
            .unwrap();
        assert_eq!(got, vec![0, 1]);
        exec.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_first_serve_yields_in_completion_order() {
        let exec = executor(2);
        exec.start();

        let mut rx = exec
            .collect_chan_first_serve(vec![value_after(300, 10), value_after(0, 11)])
            .unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first, Indexed { index: 1, value: 11 });
        assert_eq!(second, Indexed { index: 0, value: 10 });
        assert!(rx.recv().await.is_none());
        exec.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_job_is_skipped_in_collect() {
        let exec = executor(2);
        exec.start();

        let failing: Job<u32> = Job::new(|_ctx| async { Err(JobError::fail("no")) });
        let got = exec
            .collect(vec![value_after(0, 1), failing, value_after(0, 3)])
            .await
            .unwrap();
        assert_eq!(got, vec![1, 3]);
        exec.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_result_after_cancellation_is_dropped() {
        let exec = executor(2);
        exec.start();

        let waits: Job<u32> = Job::new(|ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok(0)
        });
        let mut rx = exec.collect_chan(vec![waits, value_after(0, 1)]).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        exec.stop();

        let mut got = Vec::new();
        while let Ok(Some(v)) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            got.push(v);
        }
        assert_eq!(got, vec![1]);
        exec.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_closes_pending_collect_stream() {
        let exec = executor(1);
        let mut rx = exec
            .collect_chan(vec![value_after(0, 1), value_after(0, 2)])
            .unwrap();

        exec.stop();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_start_and_stop_are_published() {
        let exec = executor(3);
        let mut events = exec.bus().subscribe();
        exec.start();
        exec.shutdown().await;

        let started = events.recv().await.unwrap();
        assert_eq!(started.kind, EventKind::ExecutorStarted);
        assert_eq!(started.workers, Some(3));
        assert_eq!(events.recv().await.unwrap().kind, EventKind::ExecutorStopped);
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_executor() {
        let parent = CancellationToken::new();
        let exec = Executor::with_parent(ExecutorConfig::with_workers(1), &parent);
        exec.start();

        parent.cancel();
        assert!(exec.is_stopped());
        assert!(exec.post_job(|_ctx| async { Ok(()) }).is_err());
        exec.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parent_cancel_unblocks_pending_collect() {
        let parent = CancellationToken::new();
        let exec = Executor::with_parent(ExecutorConfig::with_workers(1), &parent);
        exec.start();

        let waiter = {
            let exec = exec.clone();
            tokio::spawn(async move {
                exec.collect(vec![value_after(200, 1), value_after(0, 2)])
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        parent.cancel();

        let got = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("collect should return after the parent is cancelled")
            .unwrap();
        // The running job finished after cancellation, the queued one never ran.
        assert_eq!(got, Ok(vec![]));
        assert_eq!(exec.len(), 0);
        exec.shutdown().await;
    }

    #[tokio::test]
    async fn test_parent_cancel_unblocks_collect_on_idle_executor() {
        let parent = CancellationToken::new();
        let exec = Executor::with_parent(ExecutorConfig::with_workers(1), &parent);

        let waiter = {
            let exec = exec.clone();
            tokio::spawn(async move { exec.collect(vec![value_after(0, 1)]).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(exec.len(), 1);
        parent.cancel();

        let got = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("collect should return without any worker")
            .unwrap();
        assert_eq!(got, Ok(vec![]));
        assert!(exec.is_empty());
    }

    #[tokio::test]
    async fn test_worker_drops_queue_on_parent_cancel() {
        let parent = CancellationToken::new();
        let exec = Executor::with_parent(ExecutorConfig::with_workers(1), &parent);
        let mut rx = exec
            .collect_chan(vec![value_after(0, 1), value_after(0, 2)])
            .unwrap();

        parent.cancel();
        exec.start();
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert_eq!(closed.unwrap(), None);
        assert_eq!(exec.len(), 0);
        exec.shutdown().await;
    }
}
