//! Retry policy for portal requests.

use std::time::Duration;

/// Default number of attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default exponential backoff base.
pub const DEFAULT_BACKOFF_BASE: u32 = 2;

/// How many times a request is attempted and how long to wait in between.
///
/// The delay before retry `n` (0-based attempt index of the attempt that
/// just failed) is `backoff_unit * backoff_base^n`, so the defaults wait
/// 1 s, then 2 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit: Duration::ZERO,
        }
    }

    /// Sets the unit the exponential factor multiplies.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn with_backoff_base(mut self, base: u32) -> Self {
        self.backoff_base = base;
        self
    }

    /// Delay after the attempt with the given 0-based index failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.saturating_pow(attempt);
        self.backoff_unit.saturating_mul(factor)
    }

    /// Whether another attempt follows the one with the given 0-based index.
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit: Duration::from_secs(1),
        }
    }
}
