//! The offline queue service.
//!
//! [`OfflineQueue`] owns the durable store, the executor, the single-flight
//! flag and the status feed. Cloning it is cheap and every clone drives the
//! same queue.
//!
//! - enqueue: record an intent durably, then nudge the driver
//! - sync: drain eligible actions in order, one at a time
//! - quarantine: revive or discard actions that ran out of retries
//! - driver: the background loop that turns requests into runs

mod driver;
mod enqueue;
mod processor;
mod quarantine;
mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex, Notify};

pub use driver::SyncHandles;
pub use state::{QueueEvent, QueueState, Transition};

use crate::clock::{Clock, SystemClock};
use crate::config::QueueConfig;
use crate::connectivity::ConnectivityProvider;
use crate::error::StorageError;
use crate::executor::{ActionExecutor, ApiClient};
use crate::models::QueuedAction;
use crate::storage::{ActionStore, MoveDirection};

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub processed_count: usize,
    pub failed_count: usize,
    /// Actions that failed and were rescheduled with backoff.
    pub retried_count: usize,
    /// Actions skipped because their backoff had not elapsed.
    pub skipped_count: usize,
    /// The run ended before the ordered list was exhausted (stop request or
    /// lost connectivity).
    pub stopped_early: bool,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed_count == 0 && self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(SyncReport),
    /// Another run was already in progress; this request was folded into it.
    Coalesced,
}

/// Snapshot published to observers after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub quarantined: usize,
    pub in_progress: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_run: Option<SyncReport>,
}

#[derive(Clone)]
pub struct OfflineQueue {
    inner: Arc<Inner>,
}

struct Inner {
    store: ActionStore,
    executor: ActionExecutor,
    connectivity: Arc<dyn ConnectivityProvider>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    /// Serializes every load-modify-save of the durable collections.
    write_lock: Mutex<()>,
    in_progress: AtomicBool,
    stop_requested: AtomicBool,
    /// Holds at most one permit, so any number of requests made while a run
    /// is underway collapse into a single follow-up run.
    sync_requested: Notify,
    status: watch::Sender<QueueStatus>,
}

pub struct OfflineQueueBuilder {
    store: ActionStore,
    client: Arc<dyn ApiClient>,
    connectivity: Arc<dyn ConnectivityProvider>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl OfflineQueueBuilder {
    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> OfflineQueue {
        let (status, _rx) = watch::channel(QueueStatus::default());
        let executor = ActionExecutor::new(self.client, self.config.action_timeout);

        OfflineQueue {
            inner: Arc::new(Inner {
                store: self.store,
                executor,
                connectivity: self.connectivity,
                clock: self.clock,
                config: self.config,
                write_lock: Mutex::new(()),
                in_progress: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                sync_requested: Notify::new(),
                status,
            }),
        }
    }
}

impl OfflineQueue {
    pub fn builder(
        store: ActionStore,
        client: Arc<dyn ApiClient>,
        connectivity: Arc<dyn ConnectivityProvider>,
    ) -> OfflineQueueBuilder {
        OfflineQueueBuilder {
            store,
            client,
            connectivity,
            clock: Arc::new(SystemClock),
            config: QueueConfig::default(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    pub fn connectivity(&self) -> &Arc<dyn ConnectivityProvider> {
        &self.inner.connectivity
    }

    pub fn store(&self) -> &ActionStore {
        &self.inner.store
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_connected()
    }

    pub fn is_sync_in_progress(&self) -> bool {
        self.inner.in_progress.load(Ordering::Acquire)
    }

    /// Latest published status.
    pub fn status(&self) -> QueueStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueStatus> {
        self.inner.status.subscribe()
    }

    /// Pending actions in execution order.
    pub async fn pending(&self) -> Result<Vec<QueuedAction>, StorageError> {
        let state = self.inner.store.load_state().await?;
        Ok(state.ordered_pending())
    }

    /// Reloads counts and the last sync time from storage and publishes them.
    pub async fn refresh_status(&self) -> Result<QueueStatus, StorageError> {
        let state = self.inner.store.load_state().await?;
        let last_sync_at = self.inner.store.load_last_sync().await?;
        self.inner.status.send_modify(|status| {
            status.pending = state.pending.len();
            status.quarantined = state.quarantined.len();
            status.last_sync_at = last_sync_at;
        });
        Ok(self.status())
    }

    /// Asks the driver for a run. Requests made while a run is underway
    /// collapse into one follow-up run.
    pub fn request_sync(&self) {
        self.inner.sync_requested.notify_one();
    }

    /// Ends the current run before its next action. Actions not yet attempted
    /// stay queued untouched. No effect when idle.
    pub fn request_stop(&self) {
        if self.is_sync_in_progress() {
            self.inner.stop_requested.store(true, Ordering::Release);
        }
    }

    /// Applies one event to the durable collections under the write lock.
    ///
    /// The current state is re-read first, so changes made since a run took
    /// its snapshot are kept. The store lock extends that to other processes
    /// sharing the same storage.
    async fn commit(&self, event: QueueEvent) -> Result<Transition, StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        let _store_lock = self.inner.store.lock().await?;
        let mut state = self.inner.store.load_state().await?;
        let transition = state.apply(event);

        let store = &self.inner.store;
        match &transition {
            Transition::Appended | Transition::Completed | Transition::Rescheduled { .. } => {
                store.save_queue(&state.pending).await?
            }
            Transition::Quarantined { .. } => {
                store.commit_move(&state, MoveDirection::ToQuarantine).await?
            }
            Transition::Revived(_) => store.commit_move(&state, MoveDirection::ToPending).await?,
            Transition::Cleared(_) => store.save_quarantine(&state.quarantined).await?,
            Transition::DuplicateId | Transition::Missing => return Ok(transition),
        }

        self.publish_counts(&state);
        Ok(transition)
    }

    fn publish_counts(&self, state: &QueueState) {
        self.inner.status.send_modify(|status| {
            status.pending = state.pending.len();
            status.quarantined = state.quarantined.len();
        });
    }
}
