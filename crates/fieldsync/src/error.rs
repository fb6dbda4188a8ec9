//! Error types for fieldsync.
//!
//! Errors fall into three families: storage failures (local persistence and
//! serialization), network failures (probe and push), and the terminal
//! [`Error::OfflineSyncRequested`] surfaced when a manual sync cannot reach the
//! remote store. Configuration and internal errors round out the set.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fieldsync operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A persisted collection could not be decoded.
    #[error("collection '{key}' is corrupt: {source}")]
    CorruptCollection {
        /// Storage key of the collection.
        key: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Network Errors ===
    /// A request to the remote store could not be completed.
    #[error("{operation} failed: {message}")]
    Network {
        /// What was being attempted.
        operation: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// The remote store answered with a non-success status.
    #[error("remote store returned {status} for {url}")]
    RemoteStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    // === Sync Errors ===
    /// A manual sync was requested while the remote store is unreachable.
    #[error("cannot sync while offline")]
    OfflineSyncRequested,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fieldsync operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new network error for the given operation.
    #[must_use]
    pub fn network(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            operation,
            message: message.into(),
        }
    }

    /// Check if this is a local persistence or serialization failure.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::CorruptCollection { .. }
                | Self::DirectoryCreate { .. }
                | Self::Json(_)
        )
    }

    /// Check if this error came from talking to the remote store.
    #[must_use]
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RemoteStatus { .. } | Self::Timeout { .. }
        )
    }

    /// Check if this error is the terminal offline-sync failure.
    #[must_use]
    pub fn is_offline_sync_requested(&self) -> bool {
        matches!(self, Self::OfflineSyncRequested)
    }
}
