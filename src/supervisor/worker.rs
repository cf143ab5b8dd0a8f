//! # Supervising task: drives one service through its lifecycle.
//!
//! One tokio task per [`ServiceToken`]. It waits for the supervisor's start gate and
//! then loops until the token's scope is cancelled:
//!
//! ```text
//! wait(start gate) ◄── or cancelled ──► ServiceStopped
//!   │
//!   ▼
//! loop:
//!   ├─► publish ServiceStarting(iteration)
//!   ├─► init ──err──► report ──────────────────┐
//!   │    ok                                     │
//!   ├─► run ───err──► report                    │
//!   ├─► clean ─err──► report                    │
//!   └─► pause(backoff on failure streak) ◄──────┘
//!
//! panic in any phase:
//!   panics += 1 ──► report Panicked{phase} ──► task ends
//!                    └─► scope live? ──► ServiceRespawned ──► spawn fresh task
//! ```
//!
//! ## Rules
//! - Phases of one service never overlap.
//! - `clean` runs after every successful `init`, even if `run` failed.
//! - A panic ends the current task; the replacement starts a fresh iteration.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::supervisor::Shared;
use super::token::ServiceToken;
use crate::error::{Phase, ServiceError, panic_message};
use crate::events::{Event, EventKind};

/// Panic caught at a phase boundary.
struct Crash {
    phase: Phase,
    info: String,
}

/// Spawns the supervising task for `svc`.
pub(crate) fn spawn_worker(shared: Arc<Shared>, svc: ServiceToken) {
    let alive = shared.alive.enter();
    tokio::spawn(async move {
        let _alive = alive;
        supervise(shared, svc).await;
    });
}

async fn supervise(shared: Arc<Shared>, svc: ServiceToken) {
    let ctx = svc.token().clone();

    tokio::select! {
        biased;
        _ = ctx.cancelled() => {
            stopped(&shared, &svc);
            return;
        }
        _ = shared.start_gate.wait_async() => {}
    }

    let Err(crash) = iterate(&shared, &svc, &ctx).await else {
        stopped(&shared, &svc);
        return;
    };

    let panics = svc.record_panic();
    let err = ServiceError::Panicked {
        phase: crash.phase,
        info: crash.info,
    };
    shared.bus.publish(
        Event::new(EventKind::ServicePanicked)
            .with_name(svc.name())
            .with_phase(crash.phase)
            .with_reason(err.as_message()),
    );
    shared.report(&svc, &err);
    svc.bump_streak();

    if ctx.is_cancelled() || !pause(&shared, &svc, &ctx).await {
        stopped(&shared, &svc);
        return;
    }
    shared.bus.publish(
        Event::new(EventKind::ServiceRespawned)
            .with_name(svc.name())
            .with_attempt(panics),
    );
    spawn_worker(Arc::clone(&shared), svc);
}

async fn iterate(
    shared: &Shared,
    svc: &ServiceToken,
    ctx: &CancellationToken,
) -> Result<(), Crash> {
    let service = Arc::clone(svc.service());
    let mut iteration: u64 = 0;

    while !ctx.is_cancelled() {
        iteration += 1;
        shared.bus.publish(
            Event::new(EventKind::ServiceStarting)
                .with_name(svc.name())
                .with_attempt(iteration),
        );

        let mut failed = false;
        match guarded(Phase::Init, service.init(ctx.clone())).await? {
            Ok(()) => {
                if let Err(e) = guarded(Phase::Run, service.run(ctx.clone())).await? {
                    failed = true;
                    fault(shared, svc, Phase::Run, &e);
                }
                if let Err(e) = guarded(Phase::Clean, service.clean(ctx.clone())).await? {
                    failed = true;
                    fault(shared, svc, Phase::Clean, &e);
                }
            }
            Err(e) => {
                failed = true;
                fault(shared, svc, Phase::Init, &e);
            }
        }

        if failed {
            svc.bump_streak();
        } else {
            svc.reset_streak();
        }
        if !pause(shared, svc, ctx).await {
            break;
        }
    }
    Ok(())
}

async fn guarded<F>(phase: Phase, fut: F) -> Result<Result<(), ServiceError>, Crash>
where
    F: Future<Output = Result<(), ServiceError>>,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| Crash {
            phase,
            info: panic_message(payload.as_ref()),
        })
}

fn fault(shared: &Shared, svc: &ServiceToken, phase: Phase, err: &ServiceError) {
    shared.bus.publish(
        Event::new(EventKind::ServiceFailed)
            .with_name(svc.name())
            .with_phase(phase)
            .with_reason(err.as_message()),
    );
    shared.report(svc, err);
}

/// Waits between iterations. Returns `false` if the scope was cancelled meanwhile.
async fn pause(shared: &Shared, svc: &ServiceToken, ctx: &CancellationToken) -> bool {
    let streak = svc.failure_streak();
    let delay = if streak == 0 {
        Duration::ZERO
    } else {
        shared.backoff.next(streak - 1)
    };

    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !ctx.is_cancelled();
    }
    tokio::select! {
        _ = ctx.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

fn stopped(shared: &Shared, svc: &ServiceToken) {
    shared
        .bus
        .publish(Event::new(EventKind::ServiceStopped).with_name(svc.name()));
}
