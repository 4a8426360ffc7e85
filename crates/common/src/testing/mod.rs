//! Testing utilities and helpers
//!
//! - **[`time`]**: controllable clock for deterministic retry and debounce tests
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tether_common::testing::MockClock;
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.elapsed(), Duration::from_secs(5));
//! ```

pub mod time;

pub use time::MockClock;
