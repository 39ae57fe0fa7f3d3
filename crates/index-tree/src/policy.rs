//! Aggregate maintenance contract.
//!
//! The engine never recomputes an aggregate from scratch. Every time a
//! child link is cut or glued, or a run is broken in two, it calls the
//! matching hook on the payload type so the affected node can fold the
//! change in.
//!
//! Hooks must only touch the aggregates handed to them, and `cut` must
//! exactly undo the `glue` of the same child: a subtree is cut and glued
//! back many times over its life.

use crate::node::{Node, Side};

/// The node whose child link just changed.
///
/// When a hook runs, the link change and the `size` update have already
/// happened: after a cut the detached child is no longer listed, after a
/// glue the new child is.
pub struct Father<'a, P> {
    /// Aggregate to update.
    pub aggregate: &'a mut P,
    /// Positions now covered by the father, subtrees included.
    pub size: u64,
    pub left: Option<&'a Node<P>>,
    pub right: Option<&'a Node<P>>,
}

impl<'a, P> Father<'a, P> {
    /// Length of the father's own run.
    pub fn own_weight(&self) -> u64 {
        self.size - self.left.map_or(0, Node::size) - self.right.map_or(0, Node::size)
    }

    /// The child on the other side of `side`, if any.
    pub fn sibling(&self, side: Side) -> Option<&'a Node<P>> {
        self.child(side.opposite())
    }

    pub fn child(&self, side: Side) -> Option<&'a Node<P>> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Incremental aggregate bookkeeping, implemented once per payload type.
///
/// `Default` is the payload of a position nobody has written yet: it fills
/// runs created by [`IndexTree::reserve`](crate::IndexTree::reserve) and
/// seeds the two halves of a broken run.
pub trait Policy: Default + Sized {
    /// `child` was detached from `side` of the father.
    fn cut(father: Father<'_, Self>, child: &Node<Self>, side: Side);

    /// `child` was attached on `side` of the father.
    fn glue(father: Father<'_, Self>, child: &Node<Self>, side: Side);

    /// The childless `father` run is replaced by `left` (its first `index`
    /// positions) and `right` (the rest).
    fn break_run(father: &Node<Self>, left: &mut Self, right: &mut Self, index: u64);

    /// A fresh run of `own_weight` default positions is about to be
    /// appended by `reserve`.
    fn reserve(_payload: &mut Self, _own_weight: u64) {}
}

/// No aggregates: a bare positional sequence.
impl Policy for () {
    fn cut(_: Father<'_, Self>, _: &Node<Self>, _: Side) {}

    fn glue(_: Father<'_, Self>, _: &Node<Self>, _: Side) {}

    fn break_run(_: &Node<Self>, _: &mut Self, _: &mut Self, _: u64) {}
}
