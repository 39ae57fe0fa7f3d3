//! Structural primitives: cut, glue, break, split and merge.
//!
//! Split and merge use explicit stacks instead of recursion. Both walk down
//! the tree cutting links, then walk back up gluing, so hooks fire in the
//! same order a recursive formulation would fire them: cuts top-down,
//! glues bottom-up.

use std::mem;

use tracing::trace;

use crate::arena::ArenaCore;
use crate::node::{Node, NodeId, Side};
use crate::policy::{Father, Policy};

type Hook<P> = fn(Father<'_, P>, &Node<P>, Side);

/// Runs a cut or glue hook on `father` with `child`.
fn notify<P: Policy>(core: &mut ArenaCore<P>, father: NodeId, child: NodeId, side: Side, hook: Hook<P>) {
    let mut aggregate = mem::take(&mut core.node_mut(father).payload);
    {
        let core = &*core;
        let node = core.node(father);
        hook(
            Father {
                aggregate: &mut aggregate,
                size: node.size,
                left: node.left.map(|id| core.node(id)),
                right: node.right.map(|id| core.node(id)),
            },
            core.node(child),
            side,
        );
    }
    core.node_mut(father).payload = aggregate;
}

/// Detaches the `side` child of `father` and returns it.
pub(crate) fn cut<P: Policy>(core: &mut ArenaCore<P>, father: NodeId, side: Side) -> Option<NodeId> {
    let node = core.node_mut(father);
    let child = match side {
        Side::Left => node.left.take(),
        Side::Right => node.right.take(),
    };
    let child_size = core.size(child);
    let node = core.node_mut(father);
    debug_assert!(child_size < node.size);
    node.size -= child_size;
    if let Some(child) = child {
        notify(core, father, child, side, P::cut);
    }
    child
}

/// Attaches `child` on the empty `side` of `father`.
pub(crate) fn glue<P: Policy>(
    core: &mut ArenaCore<P>,
    father: NodeId,
    child: Option<NodeId>,
    side: Side,
) -> NodeId {
    let Some(child) = child else {
        return father;
    };
    let child_size = core.node(child).size;
    let node = core.node_mut(father);
    debug_assert!(node.child(side).is_none());
    match side {
        Side::Left => node.left = Some(child),
        Side::Right => node.right = Some(child),
    }
    node.size += child_size;
    notify(core, father, child, side, P::glue);
    father
}

/// Replaces the childless `father` by two fresh nodes holding its first
/// `index` positions and the rest.
pub(crate) fn break_node<P: Policy>(core: &mut ArenaCore<P>, father: NodeId, index: u64) -> (NodeId, NodeId) {
    let node = core.node(father);
    debug_assert!(node.is_leaf());
    debug_assert!(index > 0 && index < node.size);
    let run = node.size;

    let mut left = P::default();
    let mut right = P::default();
    P::break_run(node, &mut left, &mut right, index);

    let left = core.construct(left);
    let right = core.construct(right);
    core.node_mut(left).size = index;
    core.node_mut(right).size = run - index;
    core.delete(father);

    trace!(index, run, "break");
    (left, right)
}

/// Joins two trees; every position of `left` precedes every position of
/// `right`.
///
/// The node with the higher priority becomes the root. On equal priorities
/// `right` wins.
pub(crate) fn merge<P: Policy>(
    core: &mut ArenaCore<P>,
    left: Option<NodeId>,
    right: Option<NodeId>,
) -> Option<NodeId> {
    let mut path: Vec<(NodeId, Side)> = Vec::new();
    let (mut left, mut right) = (left, right);
    let mut tree = loop {
        match (left, right) {
            (None, tree) | (tree, None) => break tree,
            (Some(l), Some(r)) => {
                if core.node(l).priority > core.node(r).priority {
                    left = cut(core, l, Side::Right);
                    path.push((l, Side::Right));
                } else {
                    right = cut(core, r, Side::Left);
                    path.push((r, Side::Left));
                }
            }
        }
    };
    while let Some((father, side)) = path.pop() {
        tree = Some(glue(core, father, tree, side));
    }
    tree
}

/// Splits `root` into its first `index` positions and the rest.
///
/// Splitting exactly at a run boundary never breaks a node.
pub(crate) fn split<P: Policy>(
    core: &mut ArenaCore<P>,
    root: Option<NodeId>,
    index: u64,
) -> (Option<NodeId>, Option<NodeId>) {
    let mut path: Vec<(NodeId, Side)> = Vec::new();
    let mut node = root;
    let mut index = index;
    let (mut left, mut right) = loop {
        let Some(id) = node else {
            debug_assert_eq!(index, 0);
            break (None, None);
        };
        let size = core.node(id).size;
        if index == 0 {
            break (None, Some(id));
        }
        if index == size {
            break (Some(id), None);
        }
        debug_assert!(index < size, "split at {index} past size {size}");

        let left_size = core.size(core.node(id).left);
        let right_size = core.size(core.node(id).right);
        if left_size >= index {
            node = cut(core, id, Side::Left);
            path.push((id, Side::Left));
        } else if index >= size - right_size {
            node = cut(core, id, Side::Right);
            path.push((id, Side::Right));
            index -= size - right_size;
        } else {
            let left_child = cut(core, id, Side::Left);
            let right_child = cut(core, id, Side::Right);
            let (head, tail) = break_node(core, id, index - left_size);
            break (
                merge(core, left_child, Some(head)),
                merge(core, Some(tail), right_child),
            );
        }
    };
    while let Some((father, side)) = path.pop() {
        match side {
            Side::Left => right = Some(glue(core, father, right, Side::Left)),
            Side::Right => left = Some(glue(core, father, left, Side::Right)),
        }
    }
    (left, right)
}
