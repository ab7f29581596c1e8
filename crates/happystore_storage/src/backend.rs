//! Ordered store trait definition.

use crate::error::StorageResult;
use crate::range::KeyRange;

/// Handle for a savepoint opened inside a backend transaction.
///
/// Savepoints are identified by the nesting depth that opened them, which
/// keeps names stable and unique along the open stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Savepoint(u32);

impl Savepoint {
    /// Creates a savepoint handle for the given nesting depth.
    #[must_use]
    pub const fn new(depth: u32) -> Self {
        Self(depth)
    }

    /// Returns the nesting depth that owns this savepoint.
    #[must_use]
    pub const fn depth(self) -> u32 {
        self.0
    }

    /// Returns the SQL identifier used for this savepoint.
    #[must_use]
    pub fn name(self) -> String {
        format!("hs_sp_{}", self.0)
    }
}

/// An ordered, transactional key-value backend.
///
/// Backends are **ordered byte stores** with flat transactions and nested
/// savepoints. They do not interpret keys or values, and they perform no
/// locking beyond what the engine itself does; callers serialize access.
///
/// # Invariants
///
/// - Keys are ordered lexicographically by raw byte value
/// - `begin`/`commit`/`rollback` bracket exactly one outermost transaction
/// - Savepoints nest strictly (LIFO) inside an open transaction
/// - `rollback_to` discards every write made since the savepoint was opened,
///   including writes of savepoints opened after it, and pops the savepoint
/// - Backends must be `Send` so the owning handle can move between threads
///
/// # Implementors
///
/// - [`super::SqliteStore`] - SQLite database, on disk or in memory
pub trait OrderedStore: Send {
    /// Starts the outermost transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open or the engine
    /// cannot obtain its write lock.
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the outermost transaction, making its writes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the commit fails.
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls back the outermost transaction, discarding all of its writes.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open.
    fn rollback(&mut self) -> StorageResult<()>;

    /// Opens a savepoint inside the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open.
    fn savepoint(&mut self, savepoint: Savepoint) -> StorageResult<()>;

    /// Releases a savepoint, folding its writes into the enclosing scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the savepoint is not open.
    fn release(&mut self, savepoint: Savepoint) -> StorageResult<()>;

    /// Rolls back to a savepoint and pops it.
    ///
    /// # Errors
    ///
    /// Returns an error if the savepoint is not open.
    fn rollback_to(&mut self, savepoint: Savepoint) -> StorageResult<()>;

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Returns `true` if `key` is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn contains(&self, key: &[u8]) -> StorageResult<bool>;

    /// Inserts or replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Removes `key`, returning `true` if it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn delete(&mut self, key: &[u8]) -> StorageResult<bool>;

    /// Returns the pairs inside `range`, ordered ascending by key (or
    /// descending when `reverse`), truncated to `limit` after ordering.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn range(
        &self,
        range: &KeyRange,
        reverse: bool,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Returns the number of stored pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn count(&self) -> StorageResult<u64>;

    /// Returns `true` while a transaction is open.
    fn in_transaction(&self) -> bool;

    /// Closes the backend. Every later call fails with
    /// [`StorageError::Closed`](crate::StorageError::Closed).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to shut down cleanly.
    fn close(&mut self) -> StorageResult<()>;
}
