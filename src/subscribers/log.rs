//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos; implement [`Subscribe`] for structured logging.
//!
//! ## Example output
//! ```text
//! [executor-started] workers=4
//! [job-failed] err="disk full"
//! [throttled] delay=420ms
//! [service-starting] service="ingest" attempt=1
//! [service-failed] service="ingest" phase=run err="connection refused"
//! [service-panicked] service="ingest" phase=run info="boom"
//! [service-respawned] service="ingest" panics=1
//! [supervisor-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as a single log line.
    pub fn format(e: &Event) -> String {
        let name = e.name.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        let phase = e.phase.map(|p| p.as_str()).unwrap_or("-");
        match e.kind {
            EventKind::ExecutorStarted => {
                format!("[executor-started] workers={}", e.workers.unwrap_or(0))
            }
            EventKind::ExecutorStopped => {
                format!("[executor-stopped] dropped={}", e.attempt.unwrap_or(0))
            }
            EventKind::JobFailed => format!("[job-failed] err={reason:?}"),
            EventKind::JobPanicked => format!("[job-panicked] info={reason:?}"),
            EventKind::JobThrottled => {
                format!("[throttled] delay={}ms", e.delay_ms.unwrap_or(0))
            }
            EventKind::JobCoalesced => "[coalesced]".to_string(),
            EventKind::ThrottleReleased => "[throttle-released]".to_string(),
            EventKind::SupervisorStarted => "[supervisor-started]".to_string(),
            EventKind::SupervisorStopped => "[supervisor-stopped]".to_string(),
            EventKind::ServiceAdded => format!("[service-added] service={name:?}"),
            EventKind::ServiceStarting => format!(
                "[service-starting] service={name:?} attempt={}",
                e.attempt.unwrap_or(0)
            ),
            EventKind::ServiceFailed => {
                format!("[service-failed] service={name:?} phase={phase} err={reason:?}")
            }
            EventKind::ServicePanicked => {
                format!("[service-panicked] service={name:?} phase={phase} info={reason:?}")
            }
            EventKind::ServiceRespawned => format!(
                "[service-respawned] service={name:?} panics={}",
                e.attempt.unwrap_or(0)
            ),
            EventKind::ServiceStopped => format!("[service-stopped] service={name:?}"),
            EventKind::SubscriberOverflow => {
                format!("[subscriber-overflow] subscriber={name:?} reason={reason:?}")
            }
            EventKind::SubscriberPanicked => {
                format!("[subscriber-panicked] subscriber={name} info={reason}")
            }
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::format(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
