//! Logging setup and the tracing-backed notification observer

pub mod logging;
pub mod notifier;

pub use logging::{build_filter, init_logging};
pub use notifier::TracingNotifier;
