use tracing::{info, warn};

use super::{OfflineQueue, QueueEvent, Transition};
use crate::error::StorageError;
use crate::models::{ActionDescriptor, QueuedAction};

impl OfflineQueue {
    /// Stamps `descriptor` and persists it to the pending queue.
    ///
    /// Returns only after the write succeeded. When online, a sync run is
    /// requested without waiting for it.
    pub async fn enqueue(&self, descriptor: ActionDescriptor) -> Result<QueuedAction, StorageError> {
        let config = &self.inner.config;
        let action = QueuedAction::from_descriptor(
            descriptor,
            self.inner.clock.now(),
            config.default_priority,
            config.default_max_retries,
        );

        match self.commit(QueueEvent::Enqueued(action.clone())).await? {
            Transition::Appended => info!(
                action_id = %action.id,
                kind = action.kind(),
                priority = action.priority,
                endpoint = %action.endpoint,
                "action queued"
            ),
            other => warn!(action_id = %action.id, transition = ?other, "action already queued"),
        }

        if self.is_online() {
            self.request_sync();
        }

        Ok(action)
    }
}
