//! SQLite storage: connection pool, key-value store and backups

pub mod backup;
pub mod kv_store;
pub mod manager;

pub use backup::SqliteBackupExecutor;
pub use kv_store::SqliteKeyValueStore;
pub use manager::{DbManager, SqliteConnection};
