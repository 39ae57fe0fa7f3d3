use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::mem;
use std::rc::Rc;

use index_tree_pool::{Pool, PoolStats};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::debug;

use crate::config::TreeConfig;
use crate::node::{Node, NodeId};

/// Node storage plus the priority generator.
pub(crate) struct ArenaCore<P> {
    nodes: Pool<Node<P>>,
    rng: Xoshiro256StarStar,
}

impl<P> ArenaCore<P> {
    /// New single-position node with a freshly drawn priority.
    pub(crate) fn construct(&mut self, payload: P) -> NodeId {
        let priority = self.rng.gen::<u64>();
        NodeId(self.nodes.allocate(Node::new(payload, priority)))
    }

    /// Releases a node and returns it. Its children are left alone.
    pub(crate) fn delete(&mut self, id: NodeId) -> Option<Node<P>> {
        let node = self.nodes.deallocate(id.0);
        debug_assert!(node.is_some(), "node {id:?} deleted twice");
        node
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<P> {
        &self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<P> {
        &mut self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id.0)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.nodes.in_use()
    }

    #[inline]
    pub(crate) fn size(&self, id: Option<NodeId>) -> u64 {
        id.map_or(0, |id| self.node(id).size)
    }

    /// Length of the node's own run.
    #[inline]
    pub(crate) fn own_weight(&self, id: NodeId) -> u64 {
        let node = self.node(id);
        node.size - self.size(node.left) - self.size(node.right)
    }

    /// Deletes every node of the subtree under `root`.
    pub(crate) fn release(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.delete(id) {
                stack.extend(node.left);
                stack.extend(node.right);
            }
        }
    }
}

struct Shared<P> {
    core: RefCell<ArenaCore<P>>,
    /// Roots of trees dropped while the core was borrowed.
    deferred: RefCell<Vec<NodeId>>,
}

/// Shared node allocator for a family of [`IndexTree`](crate::IndexTree)s.
///
/// Cloning an `Arena` yields another handle to the same storage; subtrees
/// can only be moved between trees that share one. Arenas are
/// single-threaded.
pub struct Arena<P> {
    shared: Rc<Shared<P>>,
}

impl<P> Arena<P> {
    pub fn new(config: &TreeConfig) -> Self {
        debug!(capacity = config.capacity, seed = config.seed, "new arena");
        Self {
            shared: Rc::new(Shared {
                core: RefCell::new(ArenaCore {
                    nodes: Pool::with_capacity(config.capacity),
                    rng: Xoshiro256StarStar::seed_from_u64(config.seed),
                }),
                deferred: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Default capacity with the given priority seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(&TreeConfig::default().with_seed(seed))
    }

    /// Node pool occupancy.
    pub fn stats(&self) -> PoolStats {
        self.reclaim();
        self.shared.core.borrow().nodes.stats()
    }

    /// Nodes currently alive across all trees of this arena.
    pub fn live_nodes(&self) -> usize {
        self.reclaim();
        self.shared.core.borrow().live_count()
    }

    /// Whether both handles refer to the same storage.
    pub fn same_arena(&self, other: &Arena<P>) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn core(&self) -> Ref<'_, ArenaCore<P>> {
        self.shared.core.borrow()
    }

    pub(crate) fn core_mut(&self) -> RefMut<'_, ArenaCore<P>> {
        let mut core = self.shared.core.borrow_mut();
        self.drain_deferred(&mut core);
        core
    }

    /// Releases the subtree under `root` now, or on the next mutable
    /// access if the core is borrowed.
    pub(crate) fn release(&self, root: NodeId) {
        match self.shared.core.try_borrow_mut() {
            Ok(mut core) => {
                core.release(root);
                self.drain_deferred(&mut core);
            }
            Err(_) => {
                debug!(?root, "arena borrowed, deferring release");
                self.shared.deferred.borrow_mut().push(root);
            }
        }
    }

    fn reclaim(&self) {
        if let Ok(mut core) = self.shared.core.try_borrow_mut() {
            self.drain_deferred(&mut core);
        }
    }

    /// Payloads dropped during a release may defer further roots, so this
    /// loops until the list stays empty.
    fn drain_deferred(&self, core: &mut ArenaCore<P>) {
        loop {
            let roots = mem::take(&mut *self.shared.deferred.borrow_mut());
            if roots.is_empty() {
                return;
            }
            for root in roots {
                core.release(root);
            }
        }
    }
}

impl<P> Clone for Arena<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<P> Default for Arena<P> {
    fn default() -> Self {
        Self::new(&TreeConfig::default())
    }
}

impl<P> fmt::Debug for Arena<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.core.try_borrow() {
            Ok(core) => f.debug_struct("Arena").field("nodes", &core.nodes).finish(),
            Err(_) => f.write_str("Arena { <borrowed> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priorities(seed: u64, n: usize) -> Vec<u64> {
        let arena = Arena::<()>::with_seed(seed);
        let mut core = arena.core_mut();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let id = core.construct(());
            out.push(core.node(id).priority());
        }
        out
    }

    #[test]
    fn same_seed_same_priorities() {
        assert_eq!(priorities(5, 32), priorities(5, 32));
        assert_ne!(priorities(5, 32), priorities(6, 32));
    }

    #[test]
    fn construct_and_delete() {
        let arena = Arena::<u8>::new(&TreeConfig::default().with_capacity(2));
        let mut core = arena.core_mut();
        let a = core.construct(1);
        let b = core.construct(2);
        let c = core.construct(3);
        assert_eq!(core.node(a).size(), 1);
        assert_eq!(*core.node(c).payload(), 3);
        drop(core);
        assert_eq!(arena.stats().spilled, 1);
        assert_eq!(arena.live_nodes(), 3);

        let mut core = arena.core_mut();
        assert_eq!(core.delete(b).map(|n| n.payload), Some(2));
        assert!(core.get(b).is_none());
        drop(core);
        assert_eq!(arena.live_nodes(), 2);
    }

    #[test]
    fn clones_share_storage() {
        let arena = Arena::<()>::default();
        let other = arena.clone();
        assert!(arena.same_arena(&other));
        assert!(!arena.same_arena(&Arena::default()));
    }
}
