//! Shared Container Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SharedStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

const DB_FILE_NAME: &str = "shared.db";

/// SQLite-backed shared container.
///
/// Each container id maps to `<base_dir>/<container_id>/shared.db`. Any
/// process that opens the same base directory with the same id sees the same
/// values; a different id sees an empty store.
///
/// The pool connects lazily so a store can be built during synchronous
/// configuration. The table is created on first use.
pub struct SqliteSharedStore {
    container_id: String,
    pool: SqlitePool,
    schema: OnceCell<()>,
}

impl SqliteSharedStore {
    /// Open a container under `base_dir`, creating the directory if needed.
    pub fn open_in(base_dir: impl AsRef<Path>, container_id: impl Into<String>) -> Result<Self> {
        let container_id = container_id.into();
        let dir = base_dir.as_ref().join(&container_id);
        std::fs::create_dir_all(&dir)?;

        let options = SqliteConnectOptions::new()
            .filename(dir.join(DB_FILE_NAME))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        // No maintenance tasks: the pool may be built outside a runtime.
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(options);

        debug!(container = %container_id, path = ?dir, "Opened shared store");

        Ok(Self {
            container_id,
            pool,
            schema: OnceCell::new(),
        })
    }

    /// Open a container in the per-user default location.
    pub fn open_default(container_id: impl Into<String>) -> Result<Self> {
        Self::open_in(default_shared_dir()?, container_id)
    }

    /// Create an in-memory store (for testing). Not shared across processes.
    pub async fn in_memory(container_id: impl Into<String>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid in-memory options: {}", e))
        })?;

        // A single connection that is never recycled keeps the database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        let store = Self {
            container_id: container_id.into(),
            pool,
            schema: OnceCell::new(),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS shared_values (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL
                    )
                    "#,
                )
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(|e| {
                    BridgeError::OperationFailed(format!("Failed to create table: {}", e))
                })
            })
            .await
            .map(|_| ())
    }
}

/// Per-user directory holding shared containers on this machine.
pub fn default_shared_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("playback-continuity").join("containers"))
        .ok_or_else(|| BridgeError::NotAvailable("No local data directory".to_string()))
}

#[async_trait]
impl SharedStore for SqliteSharedStore {
    fn container_id(&self) -> &str {
        &self.container_id
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO shared_values (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to write value: {}", e)))?;

        debug!(container = %self.container_id, key = key, "Stored shared value");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT value FROM shared_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to read value: {}", e)))?;

        Ok(row.map(|row| row.get(0)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("DELETE FROM shared_values WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to delete value: {}", e)))?;

        debug!(container = %self.container_id, key = key, "Deleted shared value");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT 1 FROM shared_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = SqliteSharedStore::in_memory("group.test").await.unwrap();

        store.set_string("test_key", "test_value").await.unwrap();
        assert_eq!(
            store.get_string("test_key").await.unwrap(),
            Some("test_value".to_string())
        );
        assert!(store.has_key("test_key").await.unwrap());

        store.delete("test_key").await.unwrap();
        assert_eq!(store.get_string("test_key").await.unwrap(), None);
        assert!(!store.has_key("test_key").await.unwrap());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = SqliteSharedStore::in_memory("group.test").await.unwrap();

        store.set_string("k", "first").await.unwrap();
        store.set_string("k", "second").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let store = SqliteSharedStore::in_memory("group.test").await.unwrap();
        store.delete("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_same_container_is_shared_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SqliteSharedStore::open_in(dir.path(), "group.shared").unwrap();
        let reader = SqliteSharedStore::open_in(dir.path(), "group.shared").unwrap();

        writer.set_string("playback.snapshot", "{}").await.unwrap();
        assert_eq!(
            reader.get_string("playback.snapshot").await.unwrap(),
            Some("{}".to_string())
        );
    }

    #[tokio::test]
    async fn test_mismatched_container_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SqliteSharedStore::open_in(dir.path(), "group.a").unwrap();
        let reader = SqliteSharedStore::open_in(dir.path(), "group.b").unwrap();

        writer.set_string("playback.snapshot", "{}").await.unwrap();
        assert_eq!(reader.get_string("playback.snapshot").await.unwrap(), None);
        assert_eq!(reader.container_id(), "group.b");
    }
}
