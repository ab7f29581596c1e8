//! SQLite-backed ordered store.

use crate::backend::{OrderedStore, Savepoint};
use crate::error::{StorageError, StorageResult};
use crate::location::Location;
use crate::range::KeyRange;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::ops::Bound;
use std::time::Duration;
use tracing::{debug, trace};

/// Schema for the single key-value table.
///
/// Keys are stored as BLOBs so SQLite compares them with `memcmp`, which is
/// exactly byte-wise lexicographic order over their UTF-8 encoding.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   BLOB PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
) WITHOUT ROWID;";

/// Options for opening a [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// How long SQLite itself waits on a locked database file before
    /// reporting `SQLITE_BUSY`.
    pub busy_timeout: Duration,
    /// `synchronous=FULL` when true, `synchronous=NORMAL` otherwise.
    pub sync_on_commit: bool,
    /// Whether a missing database file may be created.
    pub create_if_missing: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            sync_on_commit: true,
            create_if_missing: true,
        }
    }
}

/// An ordered store backed by a single SQLite connection.
///
/// File databases run in WAL journal mode. Outermost transactions are
/// opened with `BEGIN EXCLUSIVE`, so SQLite's own file locks also keep
/// out writers that do not go through HappyStore's lock file.
///
/// # Example
///
/// ```rust
/// use happystore_storage::{Location, OrderedStore, Savepoint, SqliteOptions, SqliteStore};
///
/// let mut store = SqliteStore::open(&Location::Memory, &SqliteOptions::default()).unwrap();
/// store.begin().unwrap();
/// store.put(b"a", b"1").unwrap();
/// store.savepoint(Savepoint::new(1)).unwrap();
/// store.put(b"b", b"2").unwrap();
/// store.rollback_to(Savepoint::new(1)).unwrap();
/// store.commit().unwrap();
///
/// assert!(store.contains(b"a").unwrap());
/// assert!(!store.contains(b"b").unwrap());
/// ```
pub struct SqliteStore {
    conn: Option<Connection>,
    location: Location,
}

impl SqliteStore {
    /// Opens or creates a store at `location`.
    ///
    /// Parent directories of a file location are created when
    /// `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing and may not be created, or
    /// if SQLite fails to open it or to create the schema.
    pub fn open(location: &Location, options: &SqliteOptions) -> StorageResult<Self> {
        let conn = match location {
            Location::Memory => Connection::open_in_memory()?,
            Location::Path(path) => {
                if !path.exists() {
                    if !options.create_if_missing {
                        return Err(StorageError::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("database file does not exist: {}", path.display()),
                        )));
                    }
                    if let Some(parent) = path.parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent)?;
                        }
                    }
                }
                let conn = Connection::open(path)?;
                // Switching to WAL needs the file lock, so wait like any writer.
                conn.busy_timeout(options.busy_timeout)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn
            }
        };

        conn.busy_timeout(options.busy_timeout)?;
        let synchronous = if options.sync_on_commit { "FULL" } else { "NORMAL" };
        conn.pragma_update(None, "synchronous", synchronous)?;
        conn.execute_batch(SCHEMA)?;

        debug!(%location, "opened sqlite store");

        Ok(Self {
            conn: Some(conn),
            location: location.clone(),
        })
    }

    /// Opens a fresh in-memory store with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open(&Location::Memory, &SqliteOptions::default())
    }

    /// Returns where this store lives.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    fn require_transaction(&self, operation: &str) -> StorageResult<&Connection> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            return Err(StorageError::InvalidState(format!(
                "{operation} requires an open transaction"
            )));
        }
        Ok(conn)
    }
}

impl OrderedStore for SqliteStore {
    fn begin(&mut self) -> StorageResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            return Err(StorageError::InvalidState(
                "transaction already open".to_string(),
            ));
        }
        conn.execute_batch("BEGIN EXCLUSIVE")?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.require_transaction("commit")?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.require_transaction("rollback")?
            .execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn savepoint(&mut self, savepoint: Savepoint) -> StorageResult<()> {
        let sql = format!("SAVEPOINT {}", savepoint.name());
        self.require_transaction("savepoint")?.execute_batch(&sql)?;
        Ok(())
    }

    fn release(&mut self, savepoint: Savepoint) -> StorageResult<()> {
        let sql = format!("RELEASE SAVEPOINT {}", savepoint.name());
        self.require_transaction("release")?.execute_batch(&sql)?;
        Ok(())
    }

    fn rollback_to(&mut self, savepoint: Savepoint) -> StorageResult<()> {
        // ROLLBACK TO leaves the savepoint open; RELEASE pops it.
        let name = savepoint.name();
        let sql = format!("ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};");
        self.require_transaction("rollback_to")?
            .execute_batch(&sql)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let mut stmt = self
            .conn()?
            .prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, Vec<u8>>(0))
            .optional()?;
        Ok(value)
    }

    fn contains(&self, key: &[u8]) -> StorageResult<bool> {
        let mut stmt = self
            .conn()?
            .prepare_cached("SELECT 1 FROM kv WHERE key = ?1 LIMIT 1")?;
        Ok(stmt.exists(params![key])?)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut stmt = self
            .conn()?
            .prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<bool> {
        let mut stmt = self.conn()?.prepare_cached("DELETE FROM kv WHERE key = ?1")?;
        let changed = stmt.execute(params![key])?;
        Ok(changed > 0)
    }

    fn range(
        &self,
        range: &KeyRange,
        reverse: bool,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut clauses: Vec<String> = Vec::with_capacity(2);
        let mut values: Vec<Value> = Vec::with_capacity(3);

        let mut bind = |op: &str, key: &[u8], clauses: &mut Vec<String>| {
            values.push(Value::Blob(key.to_vec()));
            clauses.push(format!("key {op} ?{}", values.len()));
        };
        match &range.lower {
            Bound::Included(key) => bind(">=", key, &mut clauses),
            Bound::Excluded(key) => bind(">", key, &mut clauses),
            Bound::Unbounded => {}
        }
        match &range.upper {
            Bound::Included(key) => bind("<=", key, &mut clauses),
            Bound::Excluded(key) => bind("<", key, &mut clauses),
            Bound::Unbounded => {}
        }

        let mut sql = String::from("SELECT key, value FROM kv");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(if reverse {
            " ORDER BY key DESC"
        } else {
            " ORDER BY key ASC"
        });
        if let Some(limit) = limit {
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        trace!(%sql, "range lookup");

        let mut stmt = self.conn()?.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;
        let pairs = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn in_transaction(&self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| !conn.is_autocommit())
    }

    fn close(&mut self) -> StorageResult<()> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(|(_, err)| StorageError::Sqlite(err))?;
                debug!(location = %self.location, "closed sqlite store");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn memory() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn keys(pairs: &[(Vec<u8>, Vec<u8>)]) -> Vec<&[u8]> {
        pairs.iter().map(|(k, _)| k.as_slice()).collect()
    }

    fn seed(store: &mut SqliteStore, entries: &[&[u8]]) {
        store.begin().unwrap();
        for key in entries {
            store.put(key, b"v").unwrap();
        }
        store.commit().unwrap();
    }

    #[test]
    fn put_get_delete() {
        let mut store = memory();
        store.begin().unwrap();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.contains(b"a").unwrap());

        store.put(b"a", b"2").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"2".to_vec()));

        assert!(store.delete(b"a").unwrap());
        assert!(!store.delete(b"a").unwrap());
        assert_eq!(store.get(b"a").unwrap(), None);
        store.commit().unwrap();
    }

    #[test]
    fn rollback_discards_writes() {
        let mut store = memory();
        store.begin().unwrap();
        store.put(b"a", b"1").unwrap();
        store.rollback().unwrap();
        assert!(!store.contains(b"a").unwrap());
    }

    #[test]
    fn savepoint_rollback_keeps_earlier_writes() {
        let mut store = memory();
        store.begin().unwrap();
        store.put(b"outer", b"1").unwrap();

        store.savepoint(Savepoint::new(1)).unwrap();
        store.put(b"inner", b"2").unwrap();
        store.savepoint(Savepoint::new(2)).unwrap();
        store.put(b"innermost", b"3").unwrap();
        store.release(Savepoint::new(2)).unwrap();
        store.rollback_to(Savepoint::new(1)).unwrap();

        store.savepoint(Savepoint::new(1)).unwrap();
        store.put(b"sibling", b"4").unwrap();
        store.release(Savepoint::new(1)).unwrap();
        store.commit().unwrap();

        assert!(store.contains(b"outer").unwrap());
        assert!(!store.contains(b"inner").unwrap());
        assert!(!store.contains(b"innermost").unwrap());
        assert!(store.contains(b"sibling").unwrap());
        assert!(!store.in_transaction());
    }

    #[test]
    fn transaction_control_checks_state() {
        let mut store = memory();
        assert!(matches!(store.commit(), Err(StorageError::InvalidState(_))));
        assert!(matches!(
            store.savepoint(Savepoint::new(1)),
            Err(StorageError::InvalidState(_))
        ));

        store.begin().unwrap();
        assert!(store.in_transaction());
        assert!(matches!(store.begin(), Err(StorageError::InvalidState(_))));
        store.rollback().unwrap();
        assert!(!store.in_transaction());
    }

    #[test]
    fn range_orders_by_bytes() {
        let mut store = memory();
        seed(&mut store, &[b"b", b"a", b"abc", b"ab", "\u{e9}".as_bytes(), b"Z"]);

        let all = store.range(&KeyRange::all(), false, None).unwrap();
        assert_eq!(
            keys(&all),
            vec![
                b"Z".as_slice(),
                b"a",
                b"ab",
                b"abc",
                b"b",
                "\u{e9}".as_bytes()
            ]
        );

        let reversed = store.range(&KeyRange::all(), true, Some(2)).unwrap();
        assert_eq!(keys(&reversed), vec!["\u{e9}".as_bytes(), b"b".as_slice()]);
    }

    #[test]
    fn range_bounds() {
        let mut store = memory();
        seed(&mut store, &[b"a", b"ab", b"abc", b"b"]);

        let inclusive = store
            .range(&KeyRange::inclusive(b"a", b"ab"), false, None)
            .unwrap();
        assert_eq!(keys(&inclusive), vec![b"a".as_slice(), b"ab"]);

        let after = store
            .range(
                &KeyRange::new(Bound::Excluded(b"ab".to_vec()), Bound::Unbounded),
                false,
                None,
            )
            .unwrap();
        assert_eq!(keys(&after), vec![b"abc".as_slice(), b"b"]);

        let none = store.range(&KeyRange::all(), false, Some(0)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn prefix_treats_wildcards_literally() {
        let mut store = memory();
        seed(&mut store, &[b"a%", b"a%b", b"ab", b"a_", b"A%"]);

        let pairs = store.range(&KeyRange::prefix(b"a%"), false, None).unwrap();
        assert_eq!(keys(&pairs), vec![b"a%".as_slice(), b"a%b"]);

        let pairs = store.range(&KeyRange::prefix(b"a_"), false, None).unwrap();
        assert_eq!(keys(&pairs), vec![b"a_".as_slice()]);
    }

    #[test]
    fn count_tracks_pairs() {
        let mut store = memory();
        assert_eq!(store.count().unwrap(), 0);
        seed(&mut store, &[b"a", b"b", b"c"]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn closed_store_fails() {
        let mut store = memory();
        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.get(b"a"), Err(StorageError::Closed)));
        assert!(matches!(store.begin(), Err(StorageError::Closed)));
        assert!(!store.in_transaction());
    }

    #[test]
    fn file_store_persists() {
        let temp = tempdir().unwrap();
        let location = Location::Path(temp.path().join("nested").join("store.db"));

        {
            let mut store = SqliteStore::open(&location, &SqliteOptions::default()).unwrap();
            seed(&mut store, &[b"durable"]);
            store.close().unwrap();
        }

        let store = SqliteStore::open(&location, &SqliteOptions::default()).unwrap();
        assert!(store.contains(b"durable").unwrap());
    }

    #[test]
    fn missing_file_without_create_fails() {
        let temp = tempdir().unwrap();
        let location = Location::Path(temp.path().join("absent.db"));
        let options = SqliteOptions {
            create_if_missing: false,
            ..SqliteOptions::default()
        };
        assert!(matches!(
            SqliteStore::open(&location, &options),
            Err(StorageError::Io(_))
        ));
    }
}
