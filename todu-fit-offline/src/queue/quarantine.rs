use tracing::info;

use super::{OfflineQueue, QueueEvent, Transition};
use crate::error::StorageError;
use crate::models::QueuedAction;

impl OfflineQueue {
    /// Actions that exhausted their retries or were rejected.
    pub async fn quarantined(&self) -> Result<Vec<QueuedAction>, StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        Ok(self.inner.store.load_state().await?.quarantined)
    }

    /// Moves every quarantined action back to pending with a fresh retry
    /// budget and requests a run. Returns how many were revived.
    pub async fn retry_all(&self) -> Result<usize, StorageError> {
        let revived = match self.commit(QueueEvent::QuarantineRevived).await? {
            Transition::Revived(count) => count,
            _ => 0,
        };

        if revived > 0 {
            info!(count = revived, "quarantined actions returned to the queue");
            self.request_sync();
        }
        Ok(revived)
    }

    /// Permanently discards the quarantine. Returns how many were dropped.
    pub async fn clear_all(&self) -> Result<usize, StorageError> {
        let cleared = match self.commit(QueueEvent::QuarantineCleared).await? {
            Transition::Cleared(count) => count,
            _ => 0,
        };

        if cleared > 0 {
            info!(count = cleared, "quarantined actions discarded");
        }
        Ok(cleared)
    }
}
