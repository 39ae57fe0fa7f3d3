use std::fmt;

use thiserror::Error;

use crate::policy::Policy;
use crate::tree::IndexTree;

/// Precondition violations reported by the checked tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("empty range {begin}..{end}")]
    EmptyRange { begin: u64, end: u64 },

    #[error("range end {end} is past the end of a sequence of length {len}")]
    RangeOutOfBounds { end: u64, len: u64 },

    #[error("index {index} is past the end of a sequence of length {len}")]
    IndexOutOfBounds { index: u64, len: u64 },

    #[error("trees are backed by different arenas")]
    ArenaMismatch,
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failed [`IndexTree::insert`], carrying back the tree that was not
/// spliced in.
#[derive(Error)]
#[error("{error}")]
pub struct InsertError<P: Policy> {
    pub error: Error,
    pub tree: IndexTree<P>,
}

impl<P: Policy> InsertError<P> {
    pub fn into_tree(self) -> IndexTree<P> {
        self.tree
    }
}

impl<P: Policy> fmt::Debug for InsertError<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("error", &self.error)
            .field("tree", &self.tree)
            .finish()
    }
}

impl<P: Policy> From<InsertError<P>> for Error {
    fn from(err: InsertError<P>) -> Self {
        err.error
    }
}

/// Structural defect found by [`IndexTree::check_invariants`](crate::IndexTree::check_invariants).
///
/// `position` is the first sequence position of the offending node's run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("node at position {position} has no own weight")]
    Weight { position: u64 },

    #[error("node at position {position} has a child with a higher priority")]
    Heap { position: u64 },

    #[error("node at position {position} links to a released slot")]
    Dangling { position: u64 },
}
