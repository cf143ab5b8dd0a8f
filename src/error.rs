//! Error types used by the executor, scheduler and supervisor.
//!
//! This module defines three enums:
//!
//! - [`ExecutorError`] synchronous rejections returned to the caller.
//! - [`JobError`] failures of individual jobs, delivered through error sinks.
//! - [`ServiceError`] failures of supervised services, delivered to error handlers.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::fmt;

use thiserror::Error;

/// Lifecycle phase of a supervised service.
///
/// Used to tag panics recovered by the supervisor and the events it publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// [`Service::init`](crate::Service::init).
    Init,
    /// [`Service::run`](crate::Service::run).
    Run,
    /// [`Service::clean`](crate::Service::clean).
    Clean,
}

impl Phase {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Run => "run",
            Phase::Clean => "clean",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Rejections produced by the executor and scheduler.
///
/// Returned synchronously and never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// A job was submitted after the executor (or its parent scope) was stopped.
    #[error("executor is stopped")]
    Stopped,

    /// A throttled job needed a release timer but no tokio runtime was reachable.
    #[error("no tokio runtime to arm the throttle timer")]
    NoRuntime,
}

impl ExecutorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobvisor::ExecutorError;
    ///
    /// assert_eq!(ExecutorError::Stopped.as_label(), "executor_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecutorError::Stopped => "executor_stopped",
            ExecutorError::NoRuntime => "no_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ExecutorError::Stopped => "executor stopped, job rejected".to_string(),
            ExecutorError::NoRuntime => {
                "throttled job rejected: no tokio runtime to release it".to_string()
            }
        }
    }
}

/// # Errors produced by job execution.
///
/// Jobs are never retried by the executor; errors are only fanned out to the
/// registered sinks. The type is `Clone` so that every sink gets its own copy.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Job execution failed.
    #[error("job failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job observed cancellation of its scope and gave up.
    #[error("job cancelled")]
    Canceled,

    /// Job panicked; the worker caught the panic and kept running.
    #[error("job panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl JobError {
    /// Shorthand for [`JobError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobvisor::JobError;
    ///
    /// assert_eq!(JobError::fail("boom").as_label(), "job_failed");
    /// assert_eq!(JobError::Canceled.as_label(), "job_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
            JobError::Panicked { .. } => "job_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            JobError::Fail { error } => format!("error: {error}"),
            JobError::Canceled => "context cancelled".to_string(),
            JobError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// # Errors produced by supervised services.
///
/// Every reported `ServiceError` increments the token's error counter and drives
/// the supervisor's restart loop; only cancellation of the token's scope ends it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Service call failed.
    #[error("service failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Service observed cancellation of its scope.
    #[error("service cancelled")]
    Canceled,

    /// Service panicked during `phase`; the supervising task was replaced.
    #[error("service panicked during {phase}: {info}")]
    Panicked {
        /// Phase that panicked.
        phase: Phase,
        /// Panic payload rendered as text.
        info: String,
    },
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ServiceError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobvisor::{Phase, ServiceError};
    ///
    /// let err = ServiceError::Panicked { phase: Phase::Run, info: "boom".into() };
    /// assert_eq!(err.as_label(), "service_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Canceled => "service_canceled",
            ServiceError::Panicked { .. } => "service_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::Fail { error } => format!("error: {error}"),
            ServiceError::Canceled => "context cancelled".to_string(),
            ServiceError::Panicked { phase, info } => format!("panic in {phase}: {info}"),
        }
    }

    /// True if the error is a recovered panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, ServiceError::Panicked { .. })
    }
}

/// Renders a panic payload caught by `catch_unwind` as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
