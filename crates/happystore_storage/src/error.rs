//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The SQLite engine reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored key is not valid UTF-8.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The backend connection has been closed.
    #[error("storage is closed")]
    Closed,

    /// Transaction control was used out of order.
    #[error("invalid transaction state: {0}")]
    InvalidState(String),
}
