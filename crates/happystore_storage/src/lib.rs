//! # HappyStore Storage
//!
//! Ordered, transactional storage backends for HappyStore.
//!
//! This crate is the lowest layer of HappyStore. A backend is an **ordered
//! byte store**: keys and values are raw bytes, keys are ordered
//! lexicographically, and the backend offers flat transactions with nested
//! savepoints. It does not know about serializers, the transaction gate or
//! frame bookkeeping; `happystore_core` owns all of that.
//!
//! ## Available Backends
//!
//! - [`SqliteStore`] - SQLite database, on disk or in memory
//!
//! ## Example
//!
//! ```rust
//! use happystore_storage::{KeyRange, OrderedStore, SqliteStore};
//!
//! let mut store = SqliteStore::open_in_memory().unwrap();
//! store.begin().unwrap();
//! store.put(b"apple", b"1").unwrap();
//! store.put(b"apricot", b"2").unwrap();
//! store.commit().unwrap();
//!
//! let pairs = store.range(&KeyRange::prefix(b"ap"), false, None).unwrap();
//! assert_eq!(pairs.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod location;
mod range;
mod sqlite;

pub use backend::{OrderedStore, Savepoint};
pub use error::{StorageError, StorageResult};
pub use location::Location;
pub use range::KeyRange;
pub use sqlite::{SqliteOptions, SqliteStore};
