//! Error types for HappyStore.

use happystore_codec::{DeserializationError, SerializationError};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in HappyStore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No value is stored under the key.
    #[error("key not found: {key:?}")]
    KeyNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The serializer rejected a value.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The serializer could not decode stored bytes.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    /// The store gate could not be acquired in time. The transaction never
    /// began.
    #[error("timed out after {timeout:?} waiting for the store lock")]
    LockTimeout {
        /// The timeout that expired.
        timeout: Duration,
    },

    /// The current transaction scope was explicitly aborted.
    ///
    /// Return this from a transaction closure (usually through
    /// [`Transaction::abort`](crate::Transaction::abort)) to roll back just
    /// that scope. It is intercepted at the scope boundary and surfaces as
    /// [`Outcome::Aborted`](crate::Outcome::Aborted).
    #[error("transaction aborted")]
    Aborted,

    /// An argument was invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Store is closed.
    #[error("store is closed")]
    StoreClosed,

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] happystore_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An application error returned from inside a transaction scope.
    #[error("transaction callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Creates a key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wraps an application error so it can be returned from a transaction
    /// scope.
    pub fn callback(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Callback(err.into())
    }

    /// Returns `true` for [`StoreError::KeyNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            StoreError::key_not_found("users:7").to_string(),
            "key not found: \"users:7\""
        );
        assert_eq!(
            StoreError::invalid_argument("page size must be positive").to_string(),
            "invalid argument: page size must be positive"
        );
        assert_eq!(StoreError::StoreClosed.to_string(), "store is closed");
    }

    #[test]
    fn callback_keeps_source() {
        let err = StoreError::callback("out of stock");
        assert!(err.to_string().contains("out of stock"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn codec_errors_convert() {
        let err: StoreError = SerializationError::new("bad").into();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(!err.is_not_found());
        assert!(StoreError::key_not_found("x").is_not_found());
    }
}
