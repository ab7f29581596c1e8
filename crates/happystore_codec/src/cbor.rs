//! General-object serializer using CBOR.

use crate::error::{DeserializationError, SerializationError};
use crate::Serializer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Serializes any `serde` type as CBOR.
///
/// This is the general-purpose codec: structs, enums, maps with arbitrary
/// keys, byte strings and floats all round-trip. Failures come from the
/// value's own `Serialize` implementation, or from bytes that are not valid
/// CBOR for `T`.
pub struct CborSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> CborSerializer<T> {
    /// Creates a CBOR serializer for `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for CborSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CborSerializer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CborSerializer<T> {}

impl<T> std::fmt::Debug for CborSerializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CborSerializer")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Serializer for CborSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(value, &mut bytes)
            .map_err(|err| SerializationError::new(err.to_string()))?;
        Ok(bytes)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, DeserializationError> {
        ciborium::de::from_reader(bytes).map_err(|err| DeserializationError::new(err.to_string()))
    }
}
