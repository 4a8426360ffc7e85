//! Background schedulers
//!
//! Both schedulers follow the same lifecycle:
//! - Explicit `start`/`stop`
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on joins

pub mod error;
pub mod monitor_scheduler;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use monitor_scheduler::MonitorScheduler;
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
