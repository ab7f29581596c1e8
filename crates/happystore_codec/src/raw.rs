//! Pass-through serializer for byte values.

use crate::error::{DeserializationError, SerializationError};
use crate::Serializer;

/// Stores byte vectors verbatim.
///
/// Only byte values are accepted, which the `Value = Vec<u8>` type enforces
/// at compile time. Neither direction can fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSerializer;

impl RawSerializer {
    /// Creates a raw serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer for RawSerializer {
    type Value = Vec<u8>;

    fn serialize(&self, value: &Vec<u8>) -> Result<Vec<u8>, SerializationError> {
        Ok(value.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, DeserializationError> {
        Ok(bytes.to_vec())
    }
}
