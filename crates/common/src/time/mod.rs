//! Time abstraction for testability
//!
//! Services that schedule retries or debounce probes read time through
//! [`Clock`] so tests can drive it with `testing::MockClock`.

mod clock;

pub use clock::{Clock, SystemClock};
