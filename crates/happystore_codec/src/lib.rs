//! # HappyStore Codec
//!
//! Pluggable value serialization for HappyStore.
//!
//! A store never looks inside values. It hands each value to the
//! [`Serializer`] it was opened with and persists whatever bytes come back.
//! The serializer is chosen once when the store is opened; values written
//! under one serializer can only be read back by the same one.
//!
//! ## Shipped Serializers
//!
//! - [`CborSerializer`] - any `serde` type, encoded as CBOR (general objects)
//! - [`JsonSerializer`] - JSON-representable values, encoded as UTF-8 JSON
//! - [`RawSerializer`] - byte vectors, stored verbatim
//! - `EncryptedSerializer` - AES-256-GCM wrapper around another serializer
//!   (requires the `encryption` feature)
//!
//! ## Usage
//!
//! ```
//! use happystore_codec::{CborSerializer, Serializer};
//! use std::collections::BTreeMap;
//!
//! let codec = CborSerializer::<BTreeMap<String, Vec<u32>>>::new();
//! let value = BTreeMap::from([("k".to_string(), vec![1, 2])]);
//!
//! let bytes = codec.serialize(&value).unwrap();
//! assert_eq!(codec.deserialize(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
#[cfg(feature = "encryption")]
mod encrypted;
mod error;
mod json;
mod raw;

pub use cbor::CborSerializer;
#[cfg(feature = "encryption")]
pub use encrypted::{EncryptedSerializer, EncryptionKey, KeyError, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{DeserializationError, SerializationError};
pub use json::{JsonSerializer, JsonValueSerializer};
pub use raw::RawSerializer;

use std::sync::Arc;

/// Converts application values to bytes and back.
///
/// Implementations must be deterministic in one direction only:
/// `deserialize(serialize(v)) == v` for every value they accept. Both
/// directions may fail, and a failure must not have side effects beyond
/// the serializer's own internal state.
///
/// # Example
///
/// A serializer that stores strings upper-cased:
///
/// ```
/// use happystore_codec::{DeserializationError, SerializationError, Serializer};
///
/// struct Shouting;
///
/// impl Serializer for Shouting {
///     type Value = String;
///
///     fn serialize(&self, value: &String) -> Result<Vec<u8>, SerializationError> {
///         Ok(value.to_uppercase().into_bytes())
///     }
///
///     fn deserialize(&self, bytes: &[u8]) -> Result<String, DeserializationError> {
///         String::from_utf8(bytes.to_vec())
///             .map_err(|err| DeserializationError::new(err.to_string()))
///     }
/// }
///
/// let bytes = Shouting.serialize(&"hi".to_string()).unwrap();
/// assert_eq!(Shouting.deserialize(&bytes).unwrap(), "HI");
/// ```
pub trait Serializer: Send + Sync {
    /// The application value type this serializer handles.
    type Value;

    /// Encodes `value` to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the value cannot be encoded.
    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, SerializationError>;

    /// Decodes bytes previously produced by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializationError`] if the bytes are malformed for this
    /// codec.
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Value, DeserializationError>;
}

impl<S: Serializer + ?Sized> Serializer for &S {
    type Value = S::Value;

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, SerializationError> {
        (**self).serialize(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Value, DeserializationError> {
        (**self).deserialize(bytes)
    }
}

impl<S: Serializer + ?Sized> Serializer for Box<S> {
    type Value = S::Value;

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, SerializationError> {
        (**self).serialize(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Value, DeserializationError> {
        (**self).deserialize(bytes)
    }
}

impl<S: Serializer + ?Sized> Serializer for Arc<S> {
    type Value = S::Value;

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>, SerializationError> {
        (**self).serialize(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Value, DeserializationError> {
        (**self).deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<S: Serializer>(codec: S, value: &S::Value) -> S::Value {
        let bytes = codec.serialize(value).unwrap();
        codec.deserialize(&bytes).unwrap()
    }

    #[test]
    fn boxed_trait_object_delegates() {
        let codec: Box<dyn Serializer<Value = Vec<u8>>> = Box::new(RawSerializer::new());
        assert_eq!(round_trip(codec, &vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn arc_and_reference_delegate() {
        let codec = Arc::new(JsonValueSerializer::new());
        let value = serde_json::json!({"a": [1, 2]});
        assert_eq!(round_trip(Arc::clone(&codec), &value), value);
        assert_eq!(round_trip(&*codec, &value), value);
    }
}
