//! Snapshot backups of the SQLite fallback database

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use tether_common::Clock;
use tether_core::preservation::ports::BackupExecutor;
use tether_domain::{BackupOutcome, BackupVerification, Result, TetherError};
use tracing::{info, instrument, warn};

use super::manager::{map_sql_error, DbManager};
use crate::errors::InfraError;

const BACKUP_PAGES_PER_STEP: std::ffi::c_int = 256;

/// Writes `VACUUM INTO` snapshots to a directory and restores them with the
/// online backup API.
pub struct SqliteBackupExecutor {
    db: Arc<DbManager>,
    directory: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SqliteBackupExecutor {
    /// Backups are written under `directory`
    pub fn new(db: Arc<DbManager>, directory: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self { db, directory: directory.into(), clock }
    }

    fn next_backup_path(&self) -> PathBuf {
        let stamp = self.clock.utc_now().format("%Y%m%dT%H%M%S%.3fZ");
        self.directory.join(format!("tether-{stamp}.db"))
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| TetherError::Internal(format!("backup task failed: {err}")))?
}

fn snapshot(db: &DbManager, directory: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(directory).map_err(InfraError::from)?;
    let target_str = target.to_str().ok_or_else(|| {
        TetherError::Config(format!("backup path {} is not UTF-8", target.display()))
    })?;
    let conn = db.get_connection()?;
    conn.execute("VACUUM INTO ?1", [target_str]).map_err(map_sql_error)?;
    Ok(())
}

fn verify(path: &Path) -> BackupVerification {
    let check = || -> rusqlite::Result<Option<String>> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let status: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if status != "ok" {
            return Ok(Some(format!("integrity check reported: {status}")));
        }
        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv_store'",
            [],
            |row| row.get(0),
        )?;
        Ok((tables == 0).then(|| "backup has no kv_store table".to_string()))
    };

    if !path.is_file() {
        let error = format!("{} does not exist", path.display());
        return BackupVerification { valid: false, error: Some(error) };
    }
    match check() {
        Ok(None) => BackupVerification { valid: true, error: None },
        Ok(Some(problem)) => BackupVerification { valid: false, error: Some(problem) },
        Err(err) => BackupVerification { valid: false, error: Some(err.to_string()) },
    }
}

fn restore(db: &DbManager, source: &Path) -> Result<()> {
    let src = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(map_sql_error)?;
    let mut dst = db.get_connection()?;
    let backup = Backup::new(&src, &mut dst).map_err(map_sql_error)?;
    backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None).map_err(map_sql_error)?;
    Ok(())
}

#[async_trait]
impl BackupExecutor for SqliteBackupExecutor {
    #[instrument(skip(self))]
    async fn create_backup(&self) -> Result<BackupOutcome> {
        let db = Arc::clone(&self.db);
        let directory = self.directory.clone();
        let target = self.next_backup_path();

        let written = target.clone();
        let result = blocking(move || snapshot(&db, &directory, &written)).await;
        Ok(match result {
            Ok(()) => {
                info!(path = %target.display(), "backup written");
                BackupOutcome::created(target)
            }
            Err(err) => {
                warn!(error = %err, "backup failed");
                BackupOutcome::failed(err.to_string())
            }
        })
    }

    async fn verify_backup(&self, path: &Path) -> Result<BackupVerification> {
        let path = path.to_path_buf();
        blocking(move || Ok(verify(&path))).await
    }

    #[instrument(skip(self))]
    async fn restore_backup(&self, path: &Path) -> Result<()> {
        let db = Arc::clone(&self.db);
        let source = path.to_path_buf();
        blocking(move || restore(&db, &source)).await?;
        info!(path = %path.display(), "backup restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tether_common::testing::MockClock;
    use tether_core::preservation::ports::KeyValueStore;

    use super::*;
    use crate::database::SqliteKeyValueStore;

    fn setup(dir: &TempDir) -> (Arc<DbManager>, SqliteBackupExecutor) {
        let db = Arc::new(DbManager::new(dir.path().join("live.db"), 2).unwrap());
        let executor = SqliteBackupExecutor::new(
            Arc::clone(&db),
            dir.path().join("backups"),
            Arc::new(MockClock::new()),
        );
        (db, executor)
    }

    #[tokio::test]
    async fn backup_round_trip_restores_earlier_state() {
        let dir = TempDir::new().unwrap();
        let (db, executor) = setup(&dir);
        let kv = SqliteKeyValueStore::new(Arc::clone(&db));
        kv.set("tether:queue", "[1]").unwrap();

        let outcome = executor.create_backup().await.unwrap();
        assert!(outcome.success);
        let path = outcome.path.unwrap();
        assert!(executor.verify_backup(&path).await.unwrap().valid);

        kv.set("tether:queue", "[1,2]").unwrap();
        executor.restore_backup(&path).await.unwrap();
        assert_eq!(kv.get("tether:queue").unwrap().as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn verification_rejects_missing_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let (_db, executor) = setup(&dir);

        let missing = executor.verify_backup(&dir.path().join("nope.db")).await.unwrap();
        assert!(!missing.valid);

        let foreign = dir.path().join("foreign.db");
        let conn = Connection::open(&foreign).unwrap();
        conn.execute_batch("CREATE TABLE other (id INTEGER);").unwrap();
        drop(conn);
        let verdict = executor.verify_backup(&foreign).await.unwrap();
        assert!(!verdict.valid);
        assert!(verdict.error.unwrap().contains("kv_store"));

        let garbage = dir.path().join("garbage.db");
        std::fs::write(&garbage, b"definitely not sqlite").unwrap();
        assert!(!executor.verify_backup(&garbage).await.unwrap().valid);
    }
}
