use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::constants::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, MAX_BACKOFF_EXPONENT};

/// Capped exponential backoff without jitter.
///
/// The delay before attempt `n + 1` (after `n` failures) is
/// `min(max_delay, base_delay * 2^(n - 1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Upper bound on any delay
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base_delay: DEFAULT_BASE_DELAY, max_delay: DEFAULT_MAX_DELAY }
    }
}

impl BackoffPolicy {
    /// Doubling delays from `base_delay`, capped at `max_delay`
    pub const fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self { base_delay, max_delay }
    }

    /// Delay after `retry_count` consecutive failures. Zero failures means no
    /// delay.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry_count - 1).min(MAX_BACKOFF_EXPONENT);
        let multiplier = 1u32 << exponent;
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    /// Wall-clock deadline before which the next attempt must not start.
    pub fn next_attempt_at(&self, now: DateTime<Utc>, retry_count: u32) -> DateTime<Utc> {
        let delay = TimeDelta::from_std(self.delay_for(retry_count)).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
