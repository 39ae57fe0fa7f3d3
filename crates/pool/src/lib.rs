//! Fixed-block pool allocator for tree nodes.
//!
//! A [`Pool`] reserves room for `capacity` values of one type up front and
//! hands out [`Handle`]s to them. Allocation and release inside the pooled
//! region are O(1) free-list operations. Once the pooled blocks run out the
//! pool silently spills to individually boxed values, so allocation never
//! fails observably.
//!
//! Instead of raw pointers, every block is addressed by a `u32` handle:
//!
//! | Handle value | Storage |
//! |--------------|---------|
//! | `< capacity` | pooled block inside the reserved buffer |
//! | `>= capacity` | spilled `Box<T>` in the overflow table |
//!
//! The reserved buffer is never reallocated, and its free-list links are
//! written lazily: block `i` only receives its forward link when allocation
//! first reaches it, so creating a large pool costs nothing per block.

pub mod handle;
pub mod pool;

pub use handle::Handle;
pub use pool::{Pool, PoolStats};
