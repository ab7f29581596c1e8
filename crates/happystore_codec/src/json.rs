//! JSON serializer.

use crate::error::{DeserializationError, SerializationError};
use crate::Serializer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Serializes values as compact UTF-8 JSON.
///
/// Only JSON-representable values are accepted. A map whose keys do not
/// serialize to strings, or a non-finite float inside a typed value, is a
/// [`SerializationError`]. Text that is not JSON, or JSON that does not fit
/// `T`, is a [`DeserializationError`].
pub struct JsonSerializer<T = serde_json::Value> {
    _marker: PhantomData<fn() -> T>,
}

/// JSON serializer over untyped [`serde_json::Value`]s.
pub type JsonValueSerializer = JsonSerializer<serde_json::Value>;

impl<T> JsonSerializer<T> {
    /// Creates a JSON serializer for `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for JsonSerializer<T> {}

impl<T> std::fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSerializer")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Serializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(value).map_err(|err| SerializationError::new(err.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, DeserializationError> {
        serde_json::from_slice(bytes).map_err(|err| DeserializationError::new(err.to_string()))
    }
}
