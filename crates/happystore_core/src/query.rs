//! Range and prefix queries.
//!
//! A [`Query`] selects keys either by prefix or by a key range, never both:
//!
//! | Mode | Keys returned |
//! |------|---------------|
//! | prefix `p` | keys starting with `p` |
//! | start `s` and end `e` | `s <= key <= e` |
//! | start `s` only | `key >= s` |
//! | end `e` only | `key <= e` |
//!
//! Results are ordered by the byte-wise order of the keys' UTF-8 encoding,
//! descending when `reverse` is set, and truncated to `limit` after
//! ordering.

use crate::error::{StoreError, StoreResult};
use happystore_storage::KeyRange;
use std::ops::Bound;

/// A prefix or range lookup over the key space.
///
/// # Example
///
/// ```rust
/// use happystore_core::Query;
///
/// let recent = Query::prefix("log:").reverse(true).limit(10);
/// let window = Query::range("2024-01", "2024-03");
/// let tail = Query::new().with_start("m");
/// # let _ = (recent, window, tail);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Match keys beginning with this prefix.
    pub prefix: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<String>,
    /// Inclusive upper bound.
    pub end: Option<String>,
    /// Maximum number of pairs returned.
    pub limit: Option<usize>,
    /// Return pairs in descending key order.
    pub reverse: bool,
}

impl Query {
    /// Creates an empty query. Set a prefix or a bound before running it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a prefix query.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::new().with_prefix(prefix)
    }

    /// Creates an inclusive range query.
    #[must_use]
    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::new().with_start(start).with_end(end)
    }

    /// Sets the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the inclusive lower bound.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the inclusive upper bound.
    #[must_use]
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Caps the number of pairs returned.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets descending order.
    #[must_use]
    pub const fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Resolves the query to a byte range, rejecting ambiguous or empty
    /// selections.
    pub(crate) fn key_range(&self) -> StoreResult<KeyRange> {
        let has_bounds = self.start.is_some() || self.end.is_some();
        match (&self.prefix, has_bounds) {
            (Some(_), true) => Err(StoreError::invalid_argument(
                "a query takes either a prefix or start/end bounds, not both",
            )),
            (None, false) => Err(StoreError::invalid_argument(
                "a query needs a prefix or at least one of start/end",
            )),
            (Some(prefix), false) => Ok(KeyRange::prefix(prefix.as_bytes())),
            (None, true) => Ok(KeyRange::new(
                inclusive(self.start.as_deref()),
                inclusive(self.end.as_deref()),
            )),
        }
    }
}

fn inclusive(key: Option<&str>) -> Bound<Vec<u8>> {
    key.map_or(Bound::Unbounded, |key| Bound::Included(key.as_bytes().to_vec()))
}
