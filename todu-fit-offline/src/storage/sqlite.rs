//! SQLite-backed key/value store.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::kv::{validate_key, KvStore};
use super::lock::StoreLock;
use crate::error::StorageError;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// Stores every key as one row of the `kv` table. Each write runs in its own
/// transaction.
///
/// A store opened from a file also locks `<name>.lock` beside it, so queue
/// commits from separate processes do not interleave.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
    lock_path: Option<PathBuf>,
}

impl SqliteKvStore {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| StorageError::database("parse connection url", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::database("connect", e))?;

        let mut store = Self::from_pool(pool).await?;
        store.lock_path = Some(path.with_extension("lock"));
        Ok(store)
    }

    /// A private in-memory database; gone when the store is dropped.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::database("parse connection url", e))?;

        // Every connection to :memory: is a separate database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::database("connect", e))?;

        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, creating the `kv` table if it is missing.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| StorageError::database("create kv table", e))?;
        Ok(Self {
            pool,
            lock_path: None,
        })
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;

        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::database(format!("read {}", key), e))?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let context = || format!("write {}", key);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::database(context(), e))?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::database(context(), e))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::database(context(), e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::database(format!("remove {}", key), e))?;

        Ok(())
    }

    async fn lock(&self) -> Result<StoreLock, StorageError> {
        match &self.lock_path {
            Some(path) => StoreLock::acquire(path.clone()).await,
            None => Ok(StoreLock::default()),
        }
    }
}
