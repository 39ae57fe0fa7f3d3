//! Structural diagnostics: height, node count and invariant checks.

use crate::error::InvariantViolation;
use crate::policy::Policy;

use super::IndexTree;

impl<P: Policy> IndexTree<P> {
    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let core = self.arena.core();
        let mut stack: Vec<_> = self.root.map(|id| (id, 1)).into_iter().collect();
        let mut height = 0;
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            let node = core.node(id);
            stack.extend(node.left.map(|l| (l, depth + 1)));
            stack.extend(node.right.map(|r| (r, depth + 1)));
        }
        height
    }

    /// Number of nodes (runs) in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.for_each(|_| count += 1);
        count
    }

    /// Verifies the heap order on priorities and that every node covers at
    /// least one position of its own.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let core = self.arena.core();
        let mut stack = Vec::new();
        let mut curr = self.root;
        let mut position = 0;
        loop {
            while let Some(id) = curr {
                let Some(node) = core.get(id) else {
                    return Err(InvariantViolation::Dangling { position });
                };
                stack.push(id);
                curr = node.left;
            }
            let Some(id) = stack.pop() else {
                return Ok(());
            };
            let node = core.node(id);

            let mut children = 0;
            for child in [node.left, node.right].into_iter().flatten() {
                let Some(child) = core.get(child) else {
                    return Err(InvariantViolation::Dangling { position });
                };
                if child.priority > node.priority {
                    return Err(InvariantViolation::Heap { position });
                }
                children += child.size;
            }
            if node.size <= children {
                return Err(InvariantViolation::Weight { position });
            }

            position += node.size - children;
            curr = node.right;
        }
    }
}
