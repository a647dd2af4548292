use core::fmt;

/// How [`crate::AggregateTree::try_with`] treats an existing entry with an equal key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverwriteMode {
    /// Insert when missing, replace when present.
    #[default]
    Upsert,
    /// Fail with [`TreeError::DuplicateKey`] when present.
    Forbid,
    /// Fail with [`TreeError::KeyNotFound`] when missing.
    Require,
}

/// Where an entry sits relative to the range a scan is looking for.
///
/// A range predicate must be monotonic over the in-order sequence: every `Below` precedes
/// every `In`, which precedes every `Above`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RangePosition {
    Below,
    In,
    Above,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeError {
    DuplicateKey,
    KeyNotFound,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey => f.write_str("an entry with an equal key already exists"),
            Self::KeyNotFound => f.write_str("no entry with the given key exists"),
        }
    }
}

impl core::error::Error for TreeError {}

/// A broken structural invariant, reported by [`crate::AggregateTree::check_invariants`].
///
/// Any of these indicates a defect in the balancing code itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    RedRoot,
    RedChildOfRed,
    BlackHeightMismatch { left: usize, right: usize },
    OutOfOrder,
    CountMismatch { stored: usize, actual: usize },
    AggregateMismatch,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedRoot => f.write_str("root node is red"),
            Self::RedChildOfRed => f.write_str("red node has a red child"),
            Self::BlackHeightMismatch { left, right } => {
                write!(f, "black height differs between subtrees ({left} vs {right})")
            }
            Self::OutOfOrder => f.write_str("keys are not in search-tree order"),
            Self::CountMismatch { stored, actual } => {
                write!(f, "node count is {stored}, subtree holds {actual}")
            }
            Self::AggregateMismatch => f.write_str("node aggregate does not match its subtree"),
        }
    }
}

impl core::error::Error for InvariantViolation {}
