//! Tree node and link types.
//!
//! Nodes live in the arena's pool and refer to their children by
//! [`NodeId`]. A parent exclusively owns both children; there are no parent
//! links, since every structural operation walks top-down from a root.

use index_tree_pool::Handle;

/// Address of a node inside its [`Arena`](crate::Arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Handle);

/// Which child link of a node an operation touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// One run of consecutive positions plus its two subtrees.
///
/// `size` counts the node's own run and both subtrees, so the run length
/// (own weight) is `size - size(left) - size(right)`, always at least one.
#[derive(Clone, Debug)]
pub struct Node<P> {
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) size: u64,
    pub(crate) priority: u64,
    pub(crate) payload: P,
}

impl<P> Node<P> {
    pub(crate) fn new(payload: P, priority: u64) -> Self {
        Self {
            left: None,
            right: None,
            size: 1,
            priority,
            payload,
        }
    }

    /// Positions covered by this node and its subtrees.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Balance key. Never used for ordering.
    #[inline]
    pub fn priority(&self) -> u64 {
        self.priority
    }

    /// Aggregate of this node's run and both subtrees.
    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    #[inline]
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[inline]
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    #[inline]
    pub fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}
