//! # Error Types
//!
//! Failures of the backing stores that more than one crate must classify.
//! Transience drives the worker's retry envelope, so it lives with the error.

use thiserror::Error;

/// SQLSTATE raised when the server terminates a connection (`admin_shutdown`).
pub const ADMIN_SHUTDOWN_CODE: &str = "57P01";

/// Errors raised by a persistent store (wallet index, durable registry set).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Connection-level failure. `code` is the backend's error code when known.
    #[error("storage connection error ({code:?}): {message}")]
    Connection { code: Option<String>, message: String },

    /// Row not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Connection { .. } => true,
            StorageError::Backend(message) => is_transient_message(message),
            _ => false,
        }
    }
}

/// Recognizes the connection-reset messages a SQL backend reports.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains(ADMIN_SHUTDOWN_CODE.to_ascii_lowercase().as_str())
        || lower.contains("terminating connection")
        || lower.contains("connection terminated")
}

/// Errors raised by the blockchain data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// The connection dropped mid-call.
    #[error("data source connection lost: {0}")]
    ConnectionLost(String),

    /// The server answered with an error (for instance a rejected broadcast).
    #[error("data source rejected request: {0}")]
    Rejected(String),

    /// The answer could not be interpreted.
    #[error("data source protocol error: {0}")]
    Protocol(String),
}

impl DataSourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DataSourceError::ConnectionLost(_))
    }
}
