//! # Backoff policy for restarting services.
//!
//! [`BackoffPolicy`] controls how the pause between supervisor restarts grows after
//! repeated failures. It is parameterized by:
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for failure streak `n` (0-indexed) is `first × factor^n`, clamped to `max`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//!
//! assert_eq!(BackoffPolicy::immediate().next(7), Duration::ZERO);
//! ```

use std::time::Duration;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure of a streak.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
}

impl BackoffPolicy {
    /// Restart without pausing (the supervisor still yields to the runtime).
    pub const fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
        }
    }

    /// Constant delay of `d` between restarts.
    pub const fn constant(d: Duration) -> Self {
        Self {
            first: d,
            max: d,
            factor: 1.0,
        }
    }

    /// Pause after a failure streak of `streak + 1` consecutive failed iterations.
    ///
    /// `factor == 1.0` keeps the delay at `first`; larger factors grow it up to `max`.
    /// Results that overflow or are not finite become `max`.
    pub fn next(&self, streak: u32) -> Duration {
        let exp = i32::try_from(streak).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if secs.is_finite() && (0.0..=self.max.as_secs_f64()).contains(&secs) {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        }
    }

    /// True if the policy never pauses.
    pub fn is_immediate(&self) -> bool {
        self.first.is_zero() || self.max.is_zero()
    }
}

impl Default for BackoffPolicy {
    /// Returns [`BackoffPolicy::immediate`].
    fn default() -> Self {
        Self::immediate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(50),
            max: Duration::from_secs(1),
            factor: 2.0,
        }
    }

    #[test]
    fn test_streak_doubles_until_cap() {
        let policy = doubling();
        let delays: Vec<u64> = (0..7).map(|s| policy.next(s).as_millis() as u64).collect();
        assert_eq!(delays, vec![50, 100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_huge_streak_clamps_to_max() {
        assert_eq!(doubling().next(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_first_above_max_is_capped() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(3),
            ..doubling()
        };
        assert_eq!(policy.next(0), Duration::from_secs(1));
    }

    #[test]
    fn test_constant_and_immediate() {
        let constant = BackoffPolicy::constant(Duration::from_millis(250));
        assert!((0..20).all(|s| constant.next(s) == Duration::from_millis(250)));
        assert!(!constant.is_immediate());

        let immediate = BackoffPolicy::default();
        assert!(immediate.is_immediate());
        assert_eq!(immediate.next(42), Duration::ZERO);
    }
}
