use thiserror::Error;

use crate::treap::{Id, Tree};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Half-open range `start..end` is inverted or leaves `0..len`.
    #[error("range {start}..{end} is not within 0..{len}")]
    OutOfRange { start: usize, end: usize, len: usize },
    /// Merge operands were not ordered. Both handles come back untouched.
    #[error("merge operands are not ordered: every key on the left must be below every key on the right")]
    InvariantViolation { left: Tree, right: Tree },
    /// A non-empty handle from another forest. Every handle passed by value
    /// to the rejected call comes back, in argument order.
    #[error("tree handle belongs to another forest")]
    ForeignTree { trees: Vec<Tree> },
    #[error("arena lookup failed: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("empty node pointer")]
    None,
    #[error("slot {0} is vacant")]
    Empty(Id),
    #[error("slot {0} is past the end of the arena")]
    OutOfBounds(Id),
}
