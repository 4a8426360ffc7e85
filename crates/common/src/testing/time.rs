//! Controllable clock for retry and debounce tests

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};

use crate::time::Clock;

/// Mock clock for deterministic testing
///
/// Time only moves when [`MockClock::advance`] or [`MockClock::set_elapsed`]
/// is called. Clones share the same elapsed time.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether_common::testing::MockClock;
/// use tether_common::time::Clock;
///
/// let clock = MockClock::new();
/// let before = clock.utc_now();
///
/// // Past a 2s retry backoff
/// clock.advance(Duration::from_secs(2));
///
/// assert_eq!((clock.utc_now() - before).num_seconds(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    /// Create a new mock clock starting at the current real time
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Create a mock clock whose wall clock starts at `start`
    pub fn at(start: DateTime<Utc>) -> Self {
        Self::starting_at(start.into())
    }

    fn starting_at(base_system_time: SystemTime) -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time,
        }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += duration;
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed = duration;
    }

    /// Get the current elapsed time
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn monotonic_and_wall_time_move_together() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let clock = MockClock::at(start);
        let instant = clock.now();
        assert_eq!(clock.utc_now(), start);

        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now().duration_since(instant), Duration::from_secs(90));
        assert_eq!(clock.utc_now(), start + chrono::Duration::seconds(90));
    }

    #[test]
    fn clones_share_elapsed_time() {
        let scheduler_view = MockClock::new();
        let test_view = scheduler_view.clone();

        test_view.advance(Duration::from_secs(2));
        assert_eq!(scheduler_view.elapsed(), Duration::from_secs(2));

        scheduler_view.set_elapsed(Duration::from_millis(500));
        assert_eq!(test_view.elapsed(), Duration::from_millis(500));
    }
}
