//! Key ranges over the ordered byte key space.

use std::ops::Bound;

/// A contiguous range of keys, ordered byte-wise.
///
/// Both ends are expressed with [`std::ops::Bound`] so that prefix
/// lookups (half-open), inclusive range lookups and paging cursors
/// (exclusive lower bound) share one representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Lower end of the range.
    pub lower: Bound<Vec<u8>>,
    /// Upper end of the range.
    pub upper: Bound<Vec<u8>>,
}

impl KeyRange {
    /// The whole key space.
    #[must_use]
    pub fn all() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// All keys that start with `prefix`.
    ///
    /// Encoded as `[prefix, successor(prefix))` so the backend can answer
    /// it from its ordered index. An empty prefix matches every key.
    #[must_use]
    pub fn prefix(prefix: &[u8]) -> Self {
        let upper = match prefix_successor(prefix) {
            Some(successor) => Bound::Excluded(successor),
            None => Bound::Unbounded,
        };
        Self {
            lower: Bound::Included(prefix.to_vec()),
            upper,
        }
    }

    /// Keys with `start <= key <= end`.
    #[must_use]
    pub fn inclusive(start: &[u8], end: &[u8]) -> Self {
        Self {
            lower: Bound::Included(start.to_vec()),
            upper: Bound::Included(end.to_vec()),
        }
    }

    /// Creates a range from explicit bounds.
    #[must_use]
    pub fn new(lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>) -> Self {
        Self { lower, upper }
    }

    /// Returns `true` if `key` falls inside the range.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(lower) => key >= lower.as_slice(),
            Bound::Excluded(lower) => key > lower.as_slice(),
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(upper) => key <= upper.as_slice(),
            Bound::Excluded(upper) => key < upper.as_slice(),
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Returns the smallest byte string greater than every string that starts
/// with `prefix`, or `None` when no such string exists (empty prefix or a
/// prefix made only of `0xFF` bytes).
#[must_use]
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut successor = prefix.to_vec();
    while let Some(last) = successor.pop() {
        if last < u8::MAX {
            successor.push(last + 1);
            return Some(successor);
        }
    }
    None
}
