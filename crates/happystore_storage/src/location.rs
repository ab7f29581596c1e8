//! Where a store lives.

use std::path::{Path, PathBuf};

/// Sentinel accepted wherever a location string is parsed.
pub const MEMORY_SENTINEL: &str = ":memory:";

/// The physical location of a store.
///
/// `Memory` stores are private to the connection that created them and
/// vanish when it closes. `Path` stores are durable files that several
/// handles and processes may share.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A non-persistent, connection-private database.
    Memory,
    /// A database file on disk.
    Path(PathBuf),
}

impl Location {
    /// Returns the database file path, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory => None,
            Self::Path(path) => Some(path),
        }
    }

    /// Returns `true` for in-memory stores.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Returns the path of the advisory lock file that sits next to the
    /// database file, e.g. `data.db` -> `data.db.lock`.
    #[must_use]
    pub fn lock_path(&self) -> Option<PathBuf> {
        self.path().map(|path| {
            let mut name = path.as_os_str().to_owned();
            name.push(".lock");
            PathBuf::from(name)
        })
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        if value == MEMORY_SENTINEL {
            Self::Memory
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str(MEMORY_SENTINEL),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sentinel_parses() {
        assert_eq!(Location::from(":memory:"), Location::Memory);
        assert!(Location::from(":memory:").is_memory());
    }

    #[test]
    fn strings_become_paths() {
        let location = Location::from("data/store.db");
        assert_eq!(location.path(), Some(Path::new("data/store.db")));
    }

    #[test]
    fn lock_path_is_sibling() {
        let location = Location::from(PathBuf::from("/tmp/happy.db"));
        assert_eq!(location.lock_path(), Some(PathBuf::from("/tmp/happy.db.lock")));
        assert_eq!(Location::Memory.lock_path(), None);
    }

    #[test]
    fn display_round_trips_sentinel() {
        assert_eq!(Location::Memory.to_string(), ":memory:");
    }
}
