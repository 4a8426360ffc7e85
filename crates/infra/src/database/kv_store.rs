//! SQLite-backed key-value store for fallback state

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tether_core::preservation::ports::KeyValueStore;
use tether_domain::Result;

use super::manager::{map_sql_error, DbManager};

/// Key-value rows in the `kv_store` table
pub struct SqliteKeyValueStore {
    db: Arc<DbManager>,
}

impl SqliteKeyValueStore {
    /// Key-value rows live in the `kv_store` table of `db`
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.get_connection()?;
        conn.query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(map_sql_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp()],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key]).map_err(map_sql_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> SqliteKeyValueStore {
        let db = DbManager::new(dir.path().join("kv.db"), 2).expect("db");
        SqliteKeyValueStore::new(Arc::new(db))
    }

    #[test]
    fn set_get_overwrite_and_remove() {
        let dir = TempDir::new().unwrap();
        let kv = store(&dir);

        assert_eq!(kv.get("tether:mode").unwrap(), None);
        kv.set("tether:mode", r#"{"active":true}"#).unwrap();
        kv.set("tether:mode", r#"{"active":false}"#).unwrap();
        assert_eq!(kv.get("tether:mode").unwrap().as_deref(), Some(r#"{"active":false}"#));

        kv.remove("tether:mode").unwrap();
        kv.remove("tether:mode").unwrap();
        assert_eq!(kv.get("tether:mode").unwrap(), None);
    }

    #[test]
    fn values_survive_reopening() {
        let dir = TempDir::new().unwrap();
        store(&dir).set("tether:queue", "[]").unwrap();
        assert_eq!(store(&dir).get("tether:queue").unwrap().as_deref(), Some("[]"));
    }
}
