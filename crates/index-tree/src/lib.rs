//! Implicit-index treap for splice-able sequences with range aggregates.
//!
//! An [`IndexTree`] stores a sequence of positions in a randomized balanced
//! tree ordered by position rather than by key. Splitting, merging, range
//! queries and updates, extraction, insertion and bulk growth all run in
//! O(log n) expected time.
//!
//! Nodes hold whole runs of positions: [`IndexTree::reserve`] appends any
//! number of default positions as a single node, and a run is broken into
//! two only when an operation needs a boundary inside it.
//!
//! Nodes come from an [`Arena`] (a fixed-block pool plus a seeded priority
//! generator) shared by any number of trees; subtrees move between trees of
//! one arena without copying. Aggregates are maintained incrementally by
//! the payload's [`Policy`] implementation.
//!
//! ```
//! use index_tree::{Arena, IndexTree, summary::Summary};
//!
//! let arena = Arena::with_seed(7);
//! let mut tree = IndexTree::new(&arena);
//! for v in [7, 4, 1, 8, 5] {
//!     tree.push(Summary::new(v));
//! }
//! let (min, max, sum) = tree.query(1..4, |s| (s.min, s.max, s.sum)).unwrap();
//! assert_eq!((min, max, sum), (1, 8, 13));
//! ```
//!
//! # Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! [`arena`] | [`Arena`]: node pool and priority generator |
//! [`node`] | [`Node`], [`NodeId`], [`Side`] |
//! [`policy`] | [`Policy`] hooks and the [`Father`] view |
//! [`tree`] | [`IndexTree`] operations |
//! [`summary`] | [`Summary`](summary::Summary): min / max / sum policy |
//! [`config`] | [`TreeConfig`] |
//! [`error`] | [`Error`], [`InsertError`], [`InvariantViolation`] |

pub mod arena;
pub mod config;
pub mod error;
pub mod node;
pub mod policy;
pub mod summary;
pub mod tree;

pub use arena::Arena;
pub use config::TreeConfig;
pub use error::{Error, InsertError, InvariantViolation, Result};
pub use index_tree_pool::PoolStats;
pub use node::{Node, NodeId, Side};
pub use policy::{Father, Policy};
pub use tree::{IndexTree, Run, Segment};
