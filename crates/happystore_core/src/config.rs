//! Store configuration.

use happystore_storage::SqliteOptions;
use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long an outermost transaction waits for the store gate.
    /// `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,

    /// How long SQLite waits on its own file lock before giving up.
    pub busy_timeout: Duration,

    /// Whether to fully sync the database on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Whether to create the database if it doesn't exist.
    pub create_if_missing: bool,

    /// Number of pairs fetched per page by [`Store::scan`](crate::Store::scan).
    pub scan_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout: None,
            busy_timeout: Duration::from_secs(5),
            sync_on_commit: true,
            create_if_missing: true,
            scan_page_size: 100,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long to wait for the store gate.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Waits for the store gate without a deadline.
    #[must_use]
    pub const fn wait_forever(mut self) -> Self {
        self.lock_timeout = None;
        self
    }

    /// Sets SQLite's busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to sync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the default scan page size.
    #[must_use]
    pub const fn scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size;
        self
    }

    pub(crate) fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            busy_timeout: self.busy_timeout,
            sync_on_commit: self.sync_on_commit,
            create_if_missing: self.create_if_missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.lock_timeout, None);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.sync_on_commit);
        assert!(config.create_if_missing);
        assert_eq!(config.scan_page_size, 100);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .lock_timeout(Duration::from_millis(250))
            .sync_on_commit(false)
            .scan_page_size(10);

        assert_eq!(config.lock_timeout, Some(Duration::from_millis(250)));
        assert!(!config.sync_on_commit);
        assert_eq!(config.scan_page_size, 10);
        assert_eq!(config.wait_forever().lock_timeout, None);
    }

    #[test]
    fn sqlite_options_follow_config() {
        let options = Config::new()
            .busy_timeout(Duration::from_secs(1))
            .create_if_missing(false)
            .sqlite_options();
        assert_eq!(options.busy_timeout, Duration::from_secs(1));
        assert!(!options.create_if_missing);
        assert!(options.sync_on_commit);
    }
}
