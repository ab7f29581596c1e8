//! Error types for serializers.

use thiserror::Error;

/// A value could not be encoded to bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("couldn't serialize value: {message}")]
pub struct SerializationError {
    message: String,
}

impl SerializationError {
    /// Creates a serialization error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the codec's description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Bytes could not be decoded back into a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("couldn't deserialize value: {message}")]
pub struct DeserializationError {
    message: String,
}

impl DeserializationError {
    /// Creates a deserialization error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the codec's description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = SerializationError::new("unsupported type");
        assert_eq!(err.to_string(), "couldn't serialize value: unsupported type");
        assert_eq!(err.message(), "unsupported type");

        let err = DeserializationError::new("truncated");
        assert_eq!(err.to_string(), "couldn't deserialize value: truncated");
    }
}
