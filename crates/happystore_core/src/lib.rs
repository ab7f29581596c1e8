//! # HappyStore Core
//!
//! An embedded key-value store with nested, strictly serializable
//! transactions.
//!
//! This crate provides:
//! - The [`Store`] handle with get/set/delete/has and bulk variants
//! - Prefix and range [`Query`]s, and paged full-store [`Scan`]s
//! - Nested [`Transaction`] scopes with explicit abort
//! - Single-writer exclusion across threads and processes
//!
//! Values pass through a pluggable [`Serializer`]; storage is SQLite, on
//! disk or in memory.
//!
//! ## Example
//!
//! ```rust
//! use happystore_core::{CborSerializer, Outcome, Store};
//! use std::collections::BTreeMap;
//!
//! type Inventory = BTreeMap<String, u32>;
//!
//! let store = Store::open(":memory:", CborSerializer::<Inventory>::new()).unwrap();
//! store.set("shop", &Inventory::from([("eggs".into(), 12)])).unwrap();
//!
//! let outcome = store
//!     .transaction(|txn| {
//!         let mut stock = txn.get("shop")?;
//!         let eggs = stock.entry("eggs".into()).or_default();
//!         if *eggs < 20 {
//!             return txn.abort();
//!         }
//!         *eggs -= 20;
//!         txn.set("shop", &stock)
//!     })
//!     .unwrap();
//!
//! assert_eq!(outcome, Outcome::Aborted);
//! assert_eq!(store.get("shop").unwrap()["eggs"], 12);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod lock;
mod query;
mod scan;
mod store;
mod transaction;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use query::Query;
pub use scan::Scan;
pub use store::{KeyValuePair, Store, Transaction};
pub use transaction::Outcome;

// Re-export the pieces callers need to open a store.
pub use happystore_codec::{
    CborSerializer, DeserializationError, JsonSerializer, JsonValueSerializer, RawSerializer,
    SerializationError, Serializer,
};
#[cfg(feature = "encryption")]
pub use happystore_codec::{EncryptedSerializer, EncryptionKey};
pub use happystore_storage::{Location, StorageError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
