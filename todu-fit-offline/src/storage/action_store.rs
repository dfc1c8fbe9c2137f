//! Typed durable store for the queue's three records.
//!
//! | key                      | contents                          |
//! |--------------------------|-----------------------------------|
//! | `offline_queue`          | JSON array of pending actions     |
//! | `offline_failed_actions` | JSON array of quarantined actions |
//! | `last_sync_at`           | RFC 3339 timestamp string         |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::kv::KvStore;
use super::lock::StoreLock;
use crate::error::StorageError;
use crate::models::QueuedAction;
use crate::queue::QueueState;

pub const QUEUE_KEY: &str = "offline_queue";
pub const QUARANTINE_KEY: &str = "offline_failed_actions";
pub const LAST_SYNC_KEY: &str = "last_sync_at";

/// Which collection gained entries in a combined write.
///
/// The receiving side is written first. If the process dies between the two
/// writes the action is in both collections, and [`ActionStore::load_state`]
/// resolves that in favour of the quarantine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    ToQuarantine,
    ToPending,
}

#[derive(Clone)]
pub struct ActionStore {
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for ActionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionStore").finish_non_exhaustive()
    }
}

impl ActionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn load_queue(&self) -> Result<Vec<QueuedAction>, StorageError> {
        self.load_actions(QUEUE_KEY).await
    }

    pub async fn save_queue(&self, actions: &[QueuedAction]) -> Result<(), StorageError> {
        self.save_actions(QUEUE_KEY, actions).await
    }

    pub async fn load_quarantine(&self) -> Result<Vec<QueuedAction>, StorageError> {
        self.load_actions(QUARANTINE_KEY).await
    }

    pub async fn save_quarantine(&self, actions: &[QueuedAction]) -> Result<(), StorageError> {
        self.save_actions(QUARANTINE_KEY, actions).await
    }

    pub async fn load_last_sync(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let Some(bytes) = self.kv.get(LAST_SYNC_KEY).await? else {
            return Ok(None);
        };

        let text = String::from_utf8(bytes).map_err(|e| StorageError::Corrupt {
            key: LAST_SYNC_KEY.to_string(),
            reason: e.to_string(),
        })?;

        DateTime::parse_from_rfc3339(text.trim())
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| StorageError::Corrupt {
                key: LAST_SYNC_KEY.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn save_last_sync(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.kv
            .set(LAST_SYNC_KEY, at.to_rfc3339().as_bytes())
            .await
    }

    /// Holds off other writers of the same storage until dropped.
    pub async fn lock(&self) -> Result<StoreLock, StorageError> {
        self.kv.lock().await
    }

    /// Loads both collections, restoring the id-uniqueness invariant if an
    /// interrupted move left an action in both.
    pub async fn load_state(&self) -> Result<QueueState, StorageError> {
        let pending = self.load_queue().await?;
        let quarantined = self.load_quarantine().await?;

        let mut state = QueueState::new(pending, quarantined);
        let dropped = state.normalize();
        if dropped > 0 {
            warn!(
                dropped,
                "pending entries duplicated in quarantine or queue, keeping one copy"
            );
        }
        Ok(state)
    }

    /// Writes both collections, receiving side first.
    pub async fn commit_move(
        &self,
        state: &QueueState,
        direction: MoveDirection,
    ) -> Result<(), StorageError> {
        match direction {
            MoveDirection::ToQuarantine => {
                self.save_quarantine(&state.quarantined).await?;
                self.save_queue(&state.pending).await
            }
            MoveDirection::ToPending => {
                self.save_queue(&state.pending).await?;
                self.save_quarantine(&state.quarantined).await
            }
        }
    }

    async fn load_actions(&self, key: &str) -> Result<Vec<QueuedAction>, StorageError> {
        let Some(bytes) = self.kv.get(key).await? else {
            debug!(key, "record not found, starting empty");
            return Ok(Vec::new());
        };

        serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn save_actions(&self, key: &str, actions: &[QueuedAction]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(actions).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        self.kv.set(key, &json).await?;
        debug!(key, count = actions.len(), "saved actions");
        Ok(())
    }
}
