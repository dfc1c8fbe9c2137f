//! Todu Fit Offline Library
//!
//! Durable action queue and sync engine. Mutations made while the device may
//! be offline are recorded as [`QueuedAction`]s and replayed against the
//! remote API in priority order, with bounded retry, exponential backoff and
//! a quarantine for actions that keep failing.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod executor;
pub mod models;
pub mod queue;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use backoff::{BackoffPolicy, MAX_BACKOFF_DELAY};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientErrorPolicy, QueueConfig};
pub use connectivity::{
    check_server, ConnectivityMonitor, ConnectivityProvider, HttpProbeConnectivity,
    ManualConnectivity,
};
pub use error::{ApiError, StorageError, SyncError};
pub use executor::{ActionExecutor, ApiClient, ApiRequest, ApiResponse, HttpApiClient};
pub use models::{
    ActionDescriptor, ActionPayload, HttpMethod, MealEntry, MealType, QueuedAction, RecordRef,
    Reminder,
};
pub use queue::{OfflineQueue, OfflineQueueBuilder, QueueStatus, RunOutcome, SyncHandles, SyncReport};
pub use storage::{
    ActionStore, FileKvStore, KvStore, MemoryKvStore, SqliteKvStore, StoreLock,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
