//! Store handle and key-value operations.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::lock::ProcessLock;
use crate::query::Query;
use crate::scan::Scan;
use crate::transaction::{ActiveFrame, Outcome, TransactionManager};
use happystore_codec::Serializer;
use happystore_storage::{KeyRange, Location, OrderedStore, SqliteStore, StorageError};
use parking_lot::RwLock;
use std::ops::Bound;
use tracing::{debug, info, trace, warn};

/// A key-value pair as returned by queries, scans and bulk reads.
pub type KeyValuePair<V> = (String, V);

/// The main store handle.
///
/// `Store` maps string keys to application values. Values go through the
/// [`Serializer`] the store was opened with, and keys are kept in the
/// byte-wise order of their UTF-8 encoding.
///
/// Every operation runs in a transaction. Operations called outside a
/// [`transaction`](Self::transaction) scope get a one-operation transaction
/// of their own; operations called inside one on the same thread join it.
/// Outermost transactions are strictly serial across every thread and
/// process using the same file.
///
/// `Store` is `Send + Sync`. Share it between threads with `Arc` or scoped
/// threads.
///
/// # Example
///
/// ```rust
/// use happystore_core::{JsonValueSerializer, Query, Store};
/// use serde_json::json;
///
/// let store = Store::open(":memory:", JsonValueSerializer::new()).unwrap();
/// store.set("fruit:apple", &json!({"color": "red"})).unwrap();
/// store.set("fruit:banana", &json!({"color": "yellow"})).unwrap();
///
/// let fruit = store.query(&Query::prefix("fruit:")).unwrap();
/// assert_eq!(fruit.len(), 2);
///
/// store
///     .transaction(|txn| {
///         txn.delete("fruit:apple")?;
///         txn.abort::<()>()
///     })
///     .unwrap();
/// assert!(store.has("fruit:apple").unwrap());
/// ```
///
/// # Deadlocks
///
/// The gate is reentrant per handle and per thread. Opening two handles on
/// the same file and nesting a transaction on one inside a transaction on
/// the other, from the same thread, waits on the lock file until the lock
/// timeout expires (or forever if none is configured).
pub struct Store<S: Serializer> {
    location: Location,
    config: Config,
    serializer: S,
    manager: TransactionManager,
    is_open: RwLock<bool>,
}

impl<S: Serializer> Store<S> {
    /// Opens or creates a store with the default configuration.
    ///
    /// `location` is a file path, or `":memory:"` (or
    /// [`Location::Memory`]) for a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot open the database or the lock file
    /// cannot be created.
    pub fn open(location: impl Into<Location>, serializer: S) -> StoreResult<Self> {
        Self::open_with_config(location, serializer, Config::default())
    }

    /// Opens or creates a store with a custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use happystore_core::{Config, RawSerializer, Store};
    /// use std::time::Duration;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let config = Config::new().lock_timeout(Duration::from_secs(2));
    /// let store = Store::open_with_config(dir.path().join("data.db"), RawSerializer, config).unwrap();
    /// store.set("k", &b"v".to_vec()).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing and `create_if_missing` is
    /// off, if SQLite cannot open it, or if the lock file cannot be created.
    pub fn open_with_config(
        location: impl Into<Location>,
        serializer: S,
        config: Config,
    ) -> StoreResult<Self> {
        let location = location.into();
        let backend = SqliteStore::open(&location, &config.sqlite_options())?;
        Self::with_backend(location, Box::new(backend), serializer, config)
    }

    /// Wraps an already opened backend.
    pub(crate) fn with_backend(
        location: Location,
        backend: Box<dyn OrderedStore>,
        serializer: S,
        config: Config,
    ) -> StoreResult<Self> {
        let process_lock = location
            .lock_path()
            .map(|path| ProcessLock::open(&path))
            .transpose()?;
        let manager = TransactionManager::new(backend, process_lock, config.lock_timeout);

        info!(%location, "opened store");

        Ok(Self {
            location,
            config,
            serializer,
            manager,
            is_open: RwLock::new(true),
        })
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if the key is absent, or
    /// [`StoreError::Deserialization`] if the stored bytes don't decode.
    pub fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.implicit(|ops| ops.get(key))
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// The value is serialized before anything is written.
    pub fn set(&self, key: &str, value: &S::Value) -> StoreResult<()> {
        self.implicit(|ops| ops.set(key, value))
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.implicit(|ops| ops.delete(key))
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: &str) -> StoreResult<bool> {
        self.implicit(|ops| ops.has(key))
    }

    /// Reads several keys in one transaction.
    ///
    /// The result runs parallel to `keys`. A missing key or an undecodable
    /// value fills its slot with the error instead of failing the call.
    pub fn bulk_get<K: AsRef<str>>(&self, keys: &[K]) -> StoreResult<Vec<StoreResult<S::Value>>> {
        self.implicit(|ops| ops.bulk_get(keys))
    }

    /// Writes several pairs in one transaction.
    ///
    /// Every value is serialized first; if any fails, nothing is written.
    /// With duplicate keys the last pair wins. Inside a transaction scope
    /// the batch gets a savepoint of its own, so a failed call leaves none
    /// of its pairs behind.
    pub fn bulk_set<K: AsRef<str>>(&self, pairs: &[(K, S::Value)]) -> StoreResult<()> {
        self.atomic(|ops| ops.bulk_set(pairs))
    }

    /// Deletes several keys in one transaction.
    ///
    /// Returns whether each key was present before the call, so a key
    /// listed twice reports the same flag at both positions. Like
    /// [`bulk_set`](Self::bulk_set), a failed call removes nothing.
    pub fn bulk_delete<K: AsRef<str>>(&self, keys: &[K]) -> StoreResult<Vec<bool>> {
        self.atomic(|ops| ops.bulk_delete(keys))
    }

    /// Runs a prefix or range query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] if the query sets both a
    /// prefix and bounds, or neither.
    pub fn query(&self, query: &Query) -> StoreResult<Vec<KeyValuePair<S::Value>>> {
        self.implicit(|ops| ops.query(query))
    }

    /// Iterates over every pair in ascending key order, using the
    /// configured page size.
    pub fn scan(&self) -> StoreResult<Scan<'_, S>> {
        self.scan_with_page_size(self.config.scan_page_size)
    }

    /// Iterates over every pair in ascending key order, `page_size` pairs
    /// per round trip.
    ///
    /// Each page is read in its own transaction and no lock is held between
    /// pages, so writes made while iterating may or may not be seen.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] if `page_size` is zero.
    pub fn scan_with_page_size(&self, page_size: usize) -> StoreResult<Scan<'_, S>> {
        self.ensure_open()?;
        if page_size == 0 {
            return Err(StoreError::invalid_argument("scan page size must be positive"));
        }
        Ok(Scan::new(self, page_size))
    }

    /// Returns the number of stored pairs.
    pub fn len(&self) -> StoreResult<usize> {
        self.implicit(|ops| ops.len())
    }

    /// Returns `true` if the store holds no pairs.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Runs `f` in a transaction scope.
    ///
    /// - `Ok(value)` commits and returns [`Outcome::Committed`].
    /// - `Err(StoreError::Aborted)` (see [`Transaction::abort`]) rolls back
    ///   this scope only and returns `Ok(Outcome::Aborted)`.
    /// - Any other error rolls back and is returned as is.
    /// - A panic rolls back and keeps unwinding.
    ///
    /// Called outside any scope, this waits for the store gate. Called from
    /// inside a scope on the same thread, it opens a nested scope instead.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockTimeout`] if the gate could not be acquired
    /// in time, or the error returned by `f`.
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<Outcome<T>>
    where
        F: FnOnce(&Transaction<'_, S>) -> StoreResult<T>,
    {
        self.ensure_open()?;
        let frame = self.manager.begin()?;
        let depth = frame.depth();
        let txn = Transaction { store: self, frame };
        let result = f(&txn);
        let Transaction { frame, .. } = txn;

        match result {
            Ok(value) => {
                frame.commit()?;
                Ok(Outcome::Committed(value))
            }
            Err(StoreError::Aborted) => {
                debug!(depth, "transaction aborted");
                frame.rollback()?;
                Ok(Outcome::Aborted)
            }
            Err(err) => {
                if let Err(rollback_err) = frame.rollback() {
                    warn!(depth, %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Returns `true` if the calling thread is inside one of this store's
    /// transactions.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.manager.in_transaction()
    }

    /// Closes the store. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if called from inside one
    /// of this store's transactions.
    pub fn close(&self) -> StoreResult<()> {
        let closed_now = self.manager.close()?;
        *self.is_open.write() = false;
        if closed_now {
            info!(location = %self.location, "closed store");
        }
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Returns store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns where the store lives.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Returns the store's serializer.
    #[must_use]
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Reads one scan page: up to `limit` pairs above `lower`.
    pub(crate) fn fetch_page(
        &self,
        lower: &Bound<Vec<u8>>,
        limit: usize,
    ) -> StoreResult<Vec<KeyValuePair<S::Value>>> {
        self.ensure_open()?;
        let range = KeyRange::new(lower.clone(), Bound::Unbounded);
        let page = self.implicit(|ops| ops.range(&range, false, Some(limit)))?;
        trace!(limit, fetched = page.len(), "fetched scan page");
        Ok(page)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(StoreError::StoreClosed)
        }
    }

    /// Runs `op` in the calling thread's open frame, or in a fresh
    /// one-operation transaction.
    fn implicit<T>(&self, op: impl FnOnce(Ops<'_, S>) -> StoreResult<T>) -> StoreResult<T> {
        self.ensure_open()?;
        let frame = self.manager.begin_or_join()?;
        self.run_in(frame, op)
    }

    /// Like [`implicit`](Self::implicit), but always opens a frame, nested
    /// under any open one, so a failure rolls back only `op`'s writes.
    fn atomic<T>(&self, op: impl FnOnce(Ops<'_, S>) -> StoreResult<T>) -> StoreResult<T> {
        self.ensure_open()?;
        let frame = self.manager.begin()?;
        self.run_in(frame, op)
    }

    fn run_in<T>(
        &self,
        frame: ActiveFrame<'_>,
        op: impl FnOnce(Ops<'_, S>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        match op(Ops::new(&frame, &self.serializer)) {
            Ok(value) => {
                frame.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = frame.rollback() {
                    warn!(%rollback_err, "rollback of implicit transaction failed");
                }
                Err(err)
            }
        }
    }
}

impl<S: Serializer> Drop for Store<S> {
    fn drop(&mut self) {
        match self.manager.close_blocking() {
            Ok(true) => info!(location = %self.location, "closed store on drop"),
            Ok(false) => {}
            Err(err) => warn!(location = %self.location, %err, "failed to close store on drop"),
        }
    }
}

impl<S: Serializer> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.location)
            .field("config", &self.config)
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// A transaction scope, handed to the closure passed to
/// [`Store::transaction`].
///
/// Reads see the scope's own uncommitted writes. A `Transaction` is pinned
/// to the thread that opened it.
pub struct Transaction<'a, S: Serializer> {
    store: &'a Store<S>,
    frame: ActiveFrame<'a>,
}

impl<'a, S: Serializer> Transaction<'a, S> {
    fn ops(&self) -> Ops<'_, S> {
        Ops::new(&self.frame, &self.store.serializer)
    }

    /// Nesting depth of this scope (0 for the outermost).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frame.depth()
    }

    /// Returns the value stored under `key`. See [`Store::get`].
    pub fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.ops().get(key)
    }

    /// Stores `value` under `key`. See [`Store::set`].
    pub fn set(&self, key: &str, value: &S::Value) -> StoreResult<()> {
        self.ops().set(key, value)
    }

    /// Removes `key`. See [`Store::delete`].
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ops().delete(key)
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: &str) -> StoreResult<bool> {
        self.ops().has(key)
    }

    /// See [`Store::bulk_get`].
    pub fn bulk_get<K: AsRef<str>>(&self, keys: &[K]) -> StoreResult<Vec<StoreResult<S::Value>>> {
        self.ops().bulk_get(keys)
    }

    /// See [`Store::bulk_set`].
    pub fn bulk_set<K: AsRef<str>>(&self, pairs: &[(K, S::Value)]) -> StoreResult<()> {
        self.store.atomic(|ops| ops.bulk_set(pairs))
    }

    /// See [`Store::bulk_delete`].
    pub fn bulk_delete<K: AsRef<str>>(&self, keys: &[K]) -> StoreResult<Vec<bool>> {
        self.store.atomic(|ops| ops.bulk_delete(keys))
    }

    /// See [`Store::query`].
    pub fn query(&self, query: &Query) -> StoreResult<Vec<KeyValuePair<S::Value>>> {
        self.ops().query(query)
    }

    /// Scans inside this scope; every page joins it.
    pub fn scan(&self) -> StoreResult<Scan<'a, S>> {
        self.store.scan()
    }

    /// See [`Store::scan_with_page_size`].
    pub fn scan_with_page_size(&self, page_size: usize) -> StoreResult<Scan<'a, S>> {
        self.store.scan_with_page_size(page_size)
    }

    /// Returns the number of stored pairs, counting this scope's writes.
    pub fn len(&self) -> StoreResult<usize> {
        self.ops().len()
    }

    /// Returns `true` if the store holds no pairs.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Opens a nested scope. Aborting it discards only its own writes.
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<Outcome<T>>
    where
        F: FnOnce(&Transaction<'_, S>) -> StoreResult<T>,
    {
        self.store.transaction(f)
    }

    /// Returns the abort signal. Use as `return txn.abort();` to roll back
    /// the enclosing scope and resume after it.
    pub fn abort<T>(&self) -> StoreResult<T> {
        Err(StoreError::Aborted)
    }
}

impl<S: Serializer> std::fmt::Debug for Transaction<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

/// Key-value operations against one open frame.
struct Ops<'f, S> {
    frame: &'f ActiveFrame<'f>,
    serializer: &'f S,
}

impl<'f, S: Serializer> Ops<'f, S> {
    fn new(frame: &'f ActiveFrame<'_>, serializer: &'f S) -> Self {
        Self { frame, serializer }
    }

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        let bytes = self
            .frame
            .with_backend(|backend| backend.get(key.as_bytes()))?
            .ok_or_else(|| StoreError::key_not_found(key))?;
        Ok(self.serializer.deserialize(&bytes)?)
    }

    fn set(&self, key: &str, value: &S::Value) -> StoreResult<()> {
        let bytes = self.serializer.serialize(value)?;
        self.frame
            .with_backend(|backend| backend.put(key.as_bytes(), &bytes))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.frame
            .with_backend(|backend| backend.delete(key.as_bytes()))
    }

    fn has(&self, key: &str) -> StoreResult<bool> {
        self.frame
            .with_backend(|backend| backend.contains(key.as_bytes()))
    }

    fn bulk_get<K: AsRef<str>>(&self, keys: &[K]) -> StoreResult<Vec<StoreResult<S::Value>>> {
        keys.iter()
            .map(|key| match self.get(key.as_ref()) {
                Ok(value) => Ok(Ok(value)),
                Err(err @ (StoreError::KeyNotFound { .. } | StoreError::Deserialization(_))) => {
                    Ok(Err(err))
                }
                Err(err) => Err(err),
            })
            .collect()
    }

    fn bulk_set<K: AsRef<str>>(&self, pairs: &[(K, S::Value)]) -> StoreResult<()> {
        let encoded = pairs
            .iter()
            .map(|(key, value)| Ok((key.as_ref(), self.serializer.serialize(value)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        self.frame.with_backend(|backend| {
            for (key, bytes) in &encoded {
                backend.put(key.as_bytes(), bytes)?;
            }
            Ok(())
        })
    }

    fn bulk_delete<K: AsRef<str>>(&self, keys: &[K]) -> StoreResult<Vec<bool>> {
        let existed = keys
            .iter()
            .map(|key| self.has(key.as_ref()))
            .collect::<StoreResult<Vec<_>>>()?;
        for key in keys {
            self.delete(key.as_ref())?;
        }
        Ok(existed)
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<KeyValuePair<S::Value>>> {
        let range = query.key_range()?;
        self.range(&range, query.reverse, query.limit)
    }

    fn range(
        &self,
        range: &KeyRange,
        reverse: bool,
        limit: Option<usize>,
    ) -> StoreResult<Vec<KeyValuePair<S::Value>>> {
        let rows = self
            .frame
            .with_backend(|backend| backend.range(range, reverse, limit))?;
        rows.into_iter()
            .map(|(key, value)| Ok((decode_key(key)?, self.serializer.deserialize(&value)?)))
            .collect()
    }

    fn len(&self) -> StoreResult<usize> {
        let count = self.frame.with_backend(|backend| backend.count())?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }
}

fn decode_key(bytes: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(bytes)
        .map_err(|err| StorageError::Corrupted(format!("stored key is not UTF-8: {err}")).into())
}
