//! # Runtime configuration.
//!
//! Provides centralized settings for the three runtime components:
//! - [`ExecutorConfig`] worker pool size and event bus capacity;
//! - [`SchedulerConfig`] event bus capacity of the scheduler's own bus;
//! - [`SupervisorConfig`] event bus capacity and restart pacing.
//!
//! ## Sentinel values
//! - `workers = 0` → one worker (clamped by [`ExecutorConfig::workers_clamped`])
//! - `bus_capacity = 0` → capacity 1 (clamped by the `Bus`)

use std::num::NonZeroUsize;

use crate::policies::BackoffPolicy;

const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Configuration for an [`Executor`](crate::Executor).
///
/// ## Field semantics
/// - `workers`: number of worker tasks spawned by `start()` (`0` is treated as `1`)
/// - `bus_capacity`: event bus ring buffer size when the executor creates its own bus
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Number of worker tasks.
    pub workers: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl ExecutorConfig {
    /// Configuration with `workers` workers and the default bus capacity.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Returns the worker count clamped to a minimum of 1.
    #[inline]
    pub fn workers_clamped(&self) -> usize {
        self.workers.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ExecutorConfig {
    /// Default configuration:
    ///
    /// - `workers = available parallelism` (1 if unknown)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// The scheduler always runs a single-worker executor; only the bus is tunable.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl SchedulerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Executor configuration used for the scheduler's inner executor.
    pub(crate) fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            workers: 1,
            bus_capacity: self.bus_capacity,
        }
    }
}

impl Default for SchedulerConfig {
    /// Default configuration: `bus_capacity = 1024`.
    fn default() -> Self {
        Self {
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

/// Configuration for a [`Supervisor`](crate::Supervisor).
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size when the supervisor creates its own bus
/// - `restart_backoff`: pause between iterations after failures; the failure streak is
///   reset by an iteration that completes without any reported error
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Restart pacing after failed iterations.
    ///
    /// Defaults to [`BackoffPolicy::immediate`]: services are restarted right away.
    pub restart_backoff: BackoffPolicy,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `restart_backoff = BackoffPolicy::immediate()`
    fn default() -> Self {
        Self {
            bus_capacity: DEFAULT_BUS_CAPACITY,
            restart_backoff: BackoffPolicy::immediate(),
        }
    }
}
