//! Error types for the offline queue.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Durable read/write failures.
///
/// Losing a queue or quarantine write is a correctness bug, so these are
/// always surfaced to the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("database error ({context}): {source}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to encode record '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt record '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("storage is locked by another process ({})", path.display())]
    Locked { path: PathBuf },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn database(context: impl Into<String>, source: sqlx::Error) -> Self {
        StorageError::Database {
            context: context.into(),
            source,
        }
    }
}

/// Classified failure of a remote call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("request rejected: {status} - {message}")]
    Client { status: u16, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Network faults, timeouts and server-side errors may go away on retry.
    /// Client errors and malformed requests will not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout | ApiError::Server { .. } => true,
            ApiError::Client { .. } | ApiError::InvalidRequest(_) => false,
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    ///
    /// 408 and 429 are treated as server-side pressure rather than a bad request.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 429 => ApiError::Server { status, message },
            400..=499 => ApiError::Client { status, message },
            _ => ApiError::Server { status, message },
        }
    }
}

/// Run-level errors.
///
/// `MaxRetriesExceeded` and `Rejected` describe single actions and end up in
/// the run report's error list; `Storage` aborts the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{kind} {id} quarantined after {attempts} failed attempts: {last_error}")]
    MaxRetriesExceeded {
        id: Uuid,
        kind: &'static str,
        attempts: u32,
        last_error: ApiError,
    },

    #[error("{kind} {id} quarantined, rejected by server: {reason}")]
    Rejected {
        id: Uuid,
        kind: &'static str,
        reason: ApiError,
    },
}
