//! Domain types

pub mod conflict;
pub mod integrity;
pub mod queue;
pub mod reminder;
pub mod remote;
pub mod status;
pub mod sync;

pub use conflict::{ConflictRecord, ConflictStrategy};
pub use integrity::{IntegrityIssue, IntegrityReport, ValidationReport};
pub use queue::{EntityType, OperationKind, OperationStatus, QueuedOperation, QueuedPayload};
pub use reminder::{Recurrence, Reminder, ReminderInput, Task};
pub use remote::{BackupOutcome, BackupVerification, OrphanTask, RemoteStatus, VersionedWrite};
pub use status::{
    ConnectionStatus, FallbackMode, FallbackStatus, MutationOutcome, MutationResult,
    NotificationSeverity, PreservationStatus,
};
pub use sync::{SyncOutcome, SyncReport, SyncSkipReason};
