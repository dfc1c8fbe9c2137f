//! Cross-process lock around read-modify-write cycles.
//!
//! The lock is a file created with `create_new`, so only one holder can exist
//! at a time on any platform. Dropping the guard removes the file. A lock
//! file left behind by a crashed process is broken once it is older than
//! [`STALE_LOCK_AGE`]; a holder only keeps it for one commit.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::StorageError;

const STALE_LOCK_AGE: Duration = Duration::from_secs(30);
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_RETRY: Duration = Duration::from_millis(10);

/// Exclusive access to a store until dropped.
///
/// Stores that have nothing to share across processes hand out an empty
/// guard.
#[derive(Debug, Default)]
pub struct StoreLock {
    path: Option<PathBuf>,
}

impl StoreLock {
    pub(crate) async fn acquire(path: PathBuf) -> Result<Self, StorageError> {
        Self::acquire_within(path, LOCK_TIMEOUT).await
    }

    pub(crate) async fn acquire_within(
        path: PathBuf,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let deadline = Instant::now() + timeout;

        loop {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match created {
                Ok(mut file) => {
                    let owner = format!("{}\n", std::process::id());
                    file.write_all(owner.as_bytes())
                        .await
                        .map_err(|e| StorageError::io(&path, e))?;
                    return Ok(Self { path: Some(path) });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(&path).await {
                        warn!(path = %path.display(), "breaking stale store lock");
                        match fs::remove_file(&path).await {
                            Ok(()) => continue,
                            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                            Err(e) => return Err(StorageError::io(&path, e)),
                        }
                    }
                    if Instant::now() >= deadline {
                        return Err(StorageError::Locked { path });
                    }
                    tokio::time::sleep(LOCK_RETRY).await;
                }
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "released store lock"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to release store lock"),
        }
    }
}

async fn is_stale(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path).await else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}
