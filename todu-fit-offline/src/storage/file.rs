//! File-backed key/value store.
//!
//! Each key is stored as `<key>.json` in the data directory. A write goes to
//! its own uniquely named `<key>.json.*.tmp` file, is flushed to disk, and is
//! then renamed over the live file, so a crash leaves either the old or the
//! new contents and concurrent writers never share a temp file. On Unix the
//! directory is flushed after the rename so the rename itself survives power
//! loss.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::kv::{validate_key, KvStore};
use super::lock::StoreLock;
use crate::error::StorageError;

const RECORD_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = ".tmp";
const LOCK_FILE: &str = "queue.lock";

#[derive(Debug, Clone)]
pub struct FileKvStore {
    data_dir: PathBuf,
}

impl FileKvStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the file holding `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", key, RECORD_EXTENSION))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let path = self.path(key);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;

        let data_dir = self.data_dir.clone();
        let path = self.path(key);
        let prefix = format!("{}.{}.", key, RECORD_EXTENSION);
        let bytes = value.to_vec();

        let target = path.clone();
        let written =
            tokio::task::spawn_blocking(move || write_atomic(&data_dir, &prefix, &target, &bytes))
                .await;
        match written {
            Ok(result) => result?,
            Err(e) => return Err(StorageError::io(&path, io::Error::other(e))),
        }

        debug!(key, bytes = value.len(), path = %path.display(), "wrote record");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.path(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn lock(&self) -> Result<StoreLock, StorageError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StorageError::io(&self.data_dir, e))?;
        StoreLock::acquire(self.data_dir.join(LOCK_FILE)).await
    }
}

fn write_atomic(
    data_dir: &Path,
    prefix: &str,
    path: &Path,
    value: &[u8],
) -> Result<(), StorageError> {
    std::fs::create_dir_all(data_dir).map_err(|e| StorageError::io(data_dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(TMP_SUFFIX)
        .tempfile_in(data_dir)
        .map_err(|e| StorageError::io(data_dir, e))?;
    let tmp_path = tmp.path().to_path_buf();

    tmp.write_all(value)
        .map_err(|e| StorageError::io(&tmp_path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(&tmp_path, e))?;

    // Dropping an unpersisted temp file deletes it.
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;

    sync_dir(data_dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    std::fs::File::open(dir)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| StorageError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}
