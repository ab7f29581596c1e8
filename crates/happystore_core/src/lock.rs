//! Cross-process exclusion for file-backed stores.
//!
//! Every file-backed store has a sibling lock file (`<db>.lock`). The
//! outermost transaction takes an exclusive advisory lock on it before
//! `BEGIN EXCLUSIVE` and drops it after `COMMIT` or `ROLLBACK`:
//!
//! ```text
//! <dir>/
//! ├─ data.db         # SQLite database
//! ├─ data.db-wal     # SQLite write-ahead log
//! └─ data.db.lock    # Advisory lock held by the outermost transaction
//! ```
//!
//! The lock is `flock`/`LockFileEx` through `fs2`, so the OS releases it if
//! the holding process dies. Separate handles on the same file contend
//! with each other even inside one process.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

const MIN_BACKOFF: Duration = Duration::from_millis(1);
const MAX_BACKOFF: Duration = Duration::from_millis(25);

/// A point in time by which the store gate must be acquired.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    /// Starts a deadline `timeout` from now.
    ///
    /// Returns `None` when the deadline lies beyond what `Instant` can
    /// represent, which callers treat as waiting forever.
    pub(crate) fn after(timeout: Duration) -> Option<Self> {
        let at = Instant::now().checked_add(timeout)?;
        Some(Self { at, timeout })
    }

    /// Time left before the deadline, zero once it has passed.
    pub(crate) fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// The error reported when the deadline passes.
    pub(crate) fn expired(&self) -> StoreError {
        StoreError::LockTimeout {
            timeout: self.timeout,
        }
    }
}

/// Exclusive advisory lock on a store's lock file.
#[derive(Debug)]
pub(crate) struct ProcessLock {
    path: PathBuf,
    file: File,
}

impl ProcessLock {
    /// Opens (creating if needed) the lock file at `path`.
    pub(crate) fn open(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Returns the lock file path.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the lock, waiting until `deadline` (or forever when `None`).
    pub(crate) fn acquire(&self, deadline: Option<Deadline>) -> StoreResult<()> {
        let Some(deadline) = deadline else {
            FileExt::lock_exclusive(&self.file)?;
            return Ok(());
        };

        let mut backoff = MIN_BACKOFF;
        loop {
            match FileExt::try_lock_exclusive(&self.file) {
                Ok(()) => return Ok(()),
                Err(err) if is_contended(&err) => {}
                Err(err) => return Err(err.into()),
            }

            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Err(deadline.expired());
            }
            trace!(path = %self.path.display(), "lock file busy, backing off");
            thread::sleep(backoff.min(remaining));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Drops the lock.
    pub(crate) fn release(&self) -> StoreResult<()> {
        FileExt::unlock(&self.file)?;
        Ok(())
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
