//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use happystore_core::{Config, JsonValueSerializer, Serializer, Store};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A store of JSON values, the shape most tests use.
pub type JsonStore = Store<JsonValueSerializer>;

/// Opens a throwaway in-memory store.
pub fn memory_store<S: Serializer>(serializer: S) -> Store<S> {
    Store::open(":memory:", serializer).expect("Failed to open in-memory store")
}

/// Opens a throwaway in-memory store of JSON values.
pub fn json_memory_store() -> JsonStore {
    memory_store(JsonValueSerializer::new())
}

/// A file-backed test store with automatic cleanup.
///
/// The store is dropped before its directory is removed.
pub struct TempStore<S: Serializer = JsonValueSerializer> {
    /// The store instance.
    pub store: Store<S>,
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempStore<JsonValueSerializer> {
    /// Creates a JSON store in a fresh temporary directory.
    pub fn new() -> Self {
        Self::with_serializer(JsonValueSerializer::new())
    }
}

impl Default for TempStore<JsonValueSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> TempStore<S> {
    /// Creates a store using `serializer` in a fresh temporary directory.
    pub fn with_serializer(serializer: S) -> Self {
        Self::with_config(serializer, Config::default())
    }

    /// Creates a store with an explicit configuration.
    pub fn with_config(serializer: S, config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.happystore");
        let store =
            Store::open_with_config(path.as_path(), serializer, config).expect("Failed to open store");
        Self {
            store,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a second handle on the same file.
    pub fn open_handle(&self) -> Store<S>
    where
        S: Clone,
    {
        self.open_handle_with_config(self.store.config().clone())
    }

    /// Opens a second handle on the same file with its own configuration.
    pub fn open_handle_with_config(&self, config: Config) -> Store<S>
    where
        S: Clone,
    {
        Store::open_with_config(self.path.as_path(), self.store.serializer().clone(), config)
            .expect("Failed to open second handle")
    }
}

impl<S: Serializer> std::ops::Deref for TempStore<S> {
    type Target = Store<S>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory JSON store.
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&JsonStore) -> R,
{
    let store = json_memory_store();
    f(&store)
}

/// Runs a test with a temporary file-backed JSON store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&JsonStore, &Path) -> R,
{
    let temp = TempStore::new();
    f(&temp.store, temp.path())
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use serde_json::json;

    /// Key used for the `index`-th entry of [`populated_store`].
    pub fn indexed_key(index: usize) -> String {
        format!("key-{index:05}")
    }

    /// Creates a store holding `count` entries of the form
    /// `key-NNNNN -> {"index": N}`.
    pub fn populated_store(count: usize) -> JsonStore {
        let store = json_memory_store();
        let pairs: Vec<_> = (0..count)
            .map(|i| (indexed_key(i), json!({ "index": i })))
            .collect();
        store.bulk_set(pairs.as_slice()).expect("Failed to populate store");
        store
    }

    /// Creates the three-key store `a -> 5`, `ab -> 10`, `abc -> 15` used by
    /// ordering tests.
    pub fn prefix_ladder() -> JsonStore {
        let store = json_memory_store();
        store
            .bulk_set(&[("a", json!(5)), ("ab", json!(10)), ("abc", json!(15))])
            .expect("Failed to populate store");
        store
    }
}
