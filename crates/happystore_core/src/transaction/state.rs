//! Transaction frame state.

use happystore_storage::Savepoint;

/// State of a transaction frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameState {
    /// Frame is open and accepting operations.
    Active,
    /// Frame committed into its parent (or to disk if outermost).
    Committed,
    /// Frame's writes were discarded.
    RolledBack,
}

/// One open level of the transaction stack.
///
/// The outermost frame has no savepoint; it is bracketed by
/// `BEGIN EXCLUSIVE` and `COMMIT`/`ROLLBACK`. Every nested frame owns the
/// savepoint named after its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) depth: usize,
    pub(crate) savepoint: Option<Savepoint>,
}

impl Frame {
    pub(crate) fn outermost() -> Self {
        Self {
            depth: 0,
            savepoint: None,
        }
    }

    pub(crate) fn nested(depth: usize) -> Self {
        Self {
            depth,
            savepoint: Some(Savepoint::new(u32::try_from(depth).unwrap_or(u32::MAX))),
        }
    }

    pub(crate) fn is_outermost(&self) -> bool {
        self.savepoint.is_none()
    }
}

/// How a transaction scope ended.
///
/// Errors other than an explicit abort are returned as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The scope's writes were committed and it produced this value.
    Committed(T),
    /// The scope was explicitly aborted and its writes discarded.
    Aborted,
}

impl<T> Outcome<T> {
    /// Returns `true` if the scope committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// Returns `true` if the scope was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns the committed value, or `None` if aborted.
    #[must_use]
    pub fn committed(self) -> Option<T> {
        match self {
            Self::Committed(value) => Some(value),
            Self::Aborted => None,
        }
    }

    /// Maps the committed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Committed(value) => Outcome::Committed(f(value)),
            Self::Aborted => Outcome::Aborted,
        }
    }
}
