//! Modular common utilities shared across Tether crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification, validation
//! - `runtime`: clocks and retry scheduling
//! - `test-utils`: deterministic clocks for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod validation;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod sync;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "runtime")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use sync::retry::BackoffPolicy;
#[cfg(feature = "runtime")]
pub use time::{Clock, SystemClock};
#[cfg(feature = "foundation")]
pub use validation::{
    CollectionValidator, FieldError, FieldValidator, RangeValidator, StringValidator,
    ValidationError, ValidationResult,
};
