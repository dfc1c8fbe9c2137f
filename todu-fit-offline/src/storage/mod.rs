//! Durable storage for the offline queue.
//!
//! [`KvStore`] is the byte-level contract; [`ActionStore`] layers the typed
//! queue, quarantine and last-sync records on top of any backend.

mod action_store;
mod file;
mod kv;
mod lock;
mod sqlite;

pub use action_store::{ActionStore, MoveDirection, LAST_SYNC_KEY, QUARANTINE_KEY, QUEUE_KEY};
pub use file::FileKvStore;
pub use kv::{KvStore, MemoryKvStore};
pub use lock::StoreLock;
pub use sqlite::SqliteKvStore;
