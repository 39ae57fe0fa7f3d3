//! The implicit-index treap.
//!
//! An [`IndexTree`] is a sequence of positions `0..len()`. Every node holds
//! a run of consecutive positions, so a large [`reserve`](IndexTree::reserve)
//! costs one node; the run is only broken up when an operation needs a
//! boundary inside it.
//!
//! All operations split the tree at the relevant positions, work on the
//! middle part and merge the parts back, in O(log n) expected time.

mod check;
pub(crate) mod structure;

use std::fmt;
use std::mem;
use std::ops::Range;

use tracing::trace;

use crate::arena::Arena;
use crate::error::{Error, InsertError, Result};
use crate::node::NodeId;
use crate::policy::Policy;

use self::structure::{merge, split};

/// The root of a range handed to [`IndexTree::apply`].
///
/// `aggregate` summarises the whole range.
pub struct Segment<'a, P> {
    /// Positions in the range.
    pub len: u64,
    /// Length of the root node's own run.
    pub own_weight: u64,
    pub aggregate: &'a mut P,
}

/// One node visited by [`IndexTree::for_each`].
pub struct Run<'a, P> {
    /// First position of the node's own run.
    pub start: u64,
    /// Length of the node's own run.
    pub own_weight: u64,
    /// Aggregate of the node, subtrees included.
    pub aggregate: &'a P,
}

/// Splice-able sequence with range aggregates.
///
/// Checked operations return [`Error`] on a bad range or a foreign arena.
/// The `*_unchecked` variants skip validation (debug builds still assert);
/// a bad argument there panics or scrambles this tree, never other trees.
pub struct IndexTree<P: Policy> {
    arena: Arena<P>,
    root: Option<NodeId>,
}

impl<P: Policy> IndexTree<P> {
    /// Empty tree allocating from `arena`.
    pub fn new(arena: &Arena<P>) -> Self {
        Self {
            arena: arena.clone(),
            root: None,
        }
    }

    pub fn arena(&self) -> &Arena<P> {
        &self.arena
    }

    /// Number of positions.
    pub fn len(&self) -> u64 {
        self.arena.core().size(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Runs `op` on the aggregate of `range` and returns its result.
    ///
    /// `op` may rewrite the aggregate; hooks see the new value the next time
    /// the node is cut or glued. The arena is not borrowed while `op` runs.
    pub fn apply<R, F>(&mut self, range: Range<u64>, op: F) -> Result<R>
    where
        F: FnOnce(Segment<'_, P>) -> R,
    {
        self.check_range(&range)?;
        Ok(self.apply_unchecked(range, op))
    }

    /// [`apply`](Self::apply) without validation.
    ///
    /// # Panics
    ///
    /// Panics if `range` is empty.
    pub fn apply_unchecked<R, F>(&mut self, range: Range<u64>, op: F) -> R
    where
        F: FnOnce(Segment<'_, P>) -> R,
    {
        let mut core = self.arena.core_mut();
        let (left, rest) = split(&mut core, self.root.take(), range.start);
        let (mid, right) = split(&mut core, rest, range.end.saturating_sub(range.start));
        let Some(id) = mid else {
            self.root = merge(&mut core, left, right);
            panic!("apply on empty range {}..{}", range.start, range.end);
        };

        let len = core.node(id).size;
        let own_weight = core.own_weight(id);
        let mut aggregate = mem::take(&mut core.node_mut(id).payload);
        drop(core);

        let out = op(Segment {
            len,
            own_weight,
            aggregate: &mut aggregate,
        });

        let mut core = self.arena.core_mut();
        core.node_mut(id).payload = aggregate;
        let tail = merge(&mut core, Some(id), right);
        self.root = merge(&mut core, left, tail);
        out
    }

    /// Reads the aggregate of `range`.
    pub fn query<R, F>(&mut self, range: Range<u64>, f: F) -> Result<R>
    where
        F: FnOnce(&P) -> R,
    {
        self.apply(range, |segment| f(segment.aggregate))
    }

    /// Visits every node in position order, once per run.
    ///
    /// The arena is borrowed for the whole walk: `op` may read other trees of
    /// the same arena but must not modify them.
    pub fn for_each<F>(&self, mut op: F)
    where
        F: FnMut(Run<'_, P>),
    {
        let core = self.arena.core();
        let mut stack = Vec::new();
        let mut curr = self.root;
        let mut start = 0;
        loop {
            while let Some(id) = curr {
                stack.push(id);
                curr = core.node(id).left;
            }
            let Some(id) = stack.pop() else {
                break;
            };
            let own_weight = core.own_weight(id);
            let node = core.node(id);
            op(Run {
                start,
                own_weight,
                aggregate: &node.payload,
            });
            start += own_weight;
            curr = node.right;
        }
    }

    /// Cuts `range` out into a new tree on the same arena.
    pub fn extract(&mut self, range: Range<u64>) -> Result<IndexTree<P>> {
        self.check_range(&range)?;
        Ok(self.extract_unchecked(range))
    }

    /// [`extract`](Self::extract) without validation.
    pub fn extract_unchecked(&mut self, range: Range<u64>) -> IndexTree<P> {
        debug_assert!(range.start < range.end);
        let mut core = self.arena.core_mut();
        let (left, rest) = split(&mut core, self.root.take(), range.start);
        let (mid, right) = split(&mut core, rest, range.end.saturating_sub(range.start));
        self.root = merge(&mut core, left, right);
        drop(core);
        IndexTree {
            arena: self.arena.clone(),
            root: mid,
        }
    }

    /// Drops the positions in `range`.
    pub fn remove(&mut self, range: Range<u64>) -> Result<()> {
        self.extract(range).map(drop)
    }

    /// Splices all of `other` in before position `index`.
    ///
    /// `other` must come from the same arena. On error it is handed back
    /// untouched inside the [`InsertError`].
    pub fn insert(
        &mut self,
        index: u64,
        other: IndexTree<P>,
    ) -> std::result::Result<(), InsertError<P>> {
        let check = if self.arena.same_arena(&other.arena) {
            self.check_index(index)
        } else {
            Err(Error::ArenaMismatch)
        };
        match check {
            Ok(()) => {
                self.insert_unchecked(index, other);
                Ok(())
            }
            Err(error) => Err(InsertError { error, tree: other }),
        }
    }

    /// [`insert`](Self::insert) without validation.
    pub fn insert_unchecked(&mut self, index: u64, mut other: IndexTree<P>) {
        debug_assert!(self.arena.same_arena(&other.arena));
        let subtree = other.root.take();
        let mut core = self.arena.core_mut();
        let (left, right) = split(&mut core, self.root.take(), index);
        let left = merge(&mut core, left, subtree);
        self.root = merge(&mut core, left, right);
    }

    /// Inserts one position holding `payload` before position `index`.
    pub fn insert_value(&mut self, index: u64, payload: P) -> Result<()> {
        self.check_index(index)?;
        let mut core = self.arena.core_mut();
        let node = core.construct(payload);
        let (left, right) = split(&mut core, self.root.take(), index);
        let left = merge(&mut core, left, Some(node));
        self.root = merge(&mut core, left, right);
        Ok(())
    }

    /// Appends one position holding `payload`.
    pub fn push(&mut self, payload: P) {
        let mut core = self.arena.core_mut();
        let node = core.construct(payload);
        self.root = merge(&mut core, self.root.take(), Some(node));
    }

    /// Grows the sequence to `size` positions with a single default run.
    ///
    /// Does nothing if the tree is already that long.
    pub fn reserve(&mut self, size: u64) {
        let len = self.len();
        if size <= len {
            return;
        }
        let delta = size - len;
        let mut payload = P::default();
        P::reserve(&mut payload, delta);

        let mut core = self.arena.core_mut();
        let node = core.construct(payload);
        core.node_mut(node).size = delta;
        self.root = merge(&mut core, self.root.take(), Some(node));
        trace!(len, delta, "reserve");
    }

    /// Releases every node back to the arena.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            self.arena.release(root);
        }
    }

    fn check_range(&self, range: &Range<u64>) -> Result<()> {
        if range.start >= range.end {
            return Err(Error::EmptyRange {
                begin: range.start,
                end: range.end,
            });
        }
        let len = self.len();
        if range.end > len {
            return Err(Error::RangeOutOfBounds { end: range.end, len });
        }
        Ok(())
    }

    fn check_index(&self, index: u64) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        Ok(())
    }
}

/// Dropping a tree inside a callback that holds the arena (such as
/// [`IndexTree::for_each`]) defers the release to the arena's next mutable
/// access.
impl<P: Policy> Drop for IndexTree<P> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<P: Policy> fmt::Debug for IndexTree<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexTree")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::node::{Node, Side};
    use crate::policy::Father;

    fn runs<P: Policy>(tree: &IndexTree<P>) -> Vec<(u64, u64)> {
        let mut out = Vec::new();
        tree.for_each(|run| out.push((run.start, run.own_weight)));
        out
    }

    #[test]
    fn empty_tree() {
        let arena = Arena::<()>::default();
        let mut tree = IndexTree::new(&arena);
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(runs(&tree).is_empty());
        tree.clear();
        assert_eq!(
            tree.apply(0..1, |_| ()),
            Err(Error::RangeOutOfBounds { end: 1, len: 0 })
        );
    }

    #[test]
    fn push_appends_single_runs() {
        let arena = Arena::<()>::with_seed(1);
        let mut tree = IndexTree::new(&arena);
        for _ in 0..5 {
            tree.push(());
        }
        assert_eq!(tree.len(), 5);
        assert_eq!(runs(&tree), vec![(0, 1), (1, 1), (2, 1), (3, 1), (4, 1)]);
    }

    #[test]
    fn reserve_is_one_run() {
        let arena = Arena::<()>::with_seed(2);
        let mut tree = IndexTree::new(&arena);
        tree.reserve(10);
        assert_eq!(runs(&tree), vec![(0, 10)]);
        assert_eq!(arena.live_nodes(), 1);

        tree.reserve(10);
        tree.reserve(3);
        assert_eq!(arena.live_nodes(), 1);
        assert_eq!(tree.len(), 10);

        tree.reserve(12);
        assert_eq!(runs(&tree), vec![(0, 10), (10, 2)]);
    }

    #[test]
    fn apply_inside_run_breaks_it() {
        let arena = Arena::<()>::with_seed(3);
        let mut tree = IndexTree::new(&arena);
        tree.reserve(10);
        let seen = tree.apply(4..6, |s| (s.len, s.own_weight)).unwrap();
        assert_eq!(seen, (2, 2));
        assert_eq!(runs(&tree), vec![(0, 4), (4, 2), (6, 4)]);
        assert_eq!(arena.live_nodes(), 3);
    }

    #[test]
    fn checked_ranges() {
        let arena = Arena::<()>::default();
        let mut tree = IndexTree::new(&arena);
        tree.reserve(4);
        assert_eq!(
            tree.apply(2..2, |_| ()),
            Err(Error::EmptyRange { begin: 2, end: 2 })
        );
        assert_eq!(
            tree.extract(1..5).map(|t| t.len()),
            Err(Error::RangeOutOfBounds { end: 5, len: 4 })
        );
        assert_eq!(
            tree.insert_value(5, ()),
            Err(Error::IndexOutOfBounds { index: 5, len: 4 })
        );
        assert_eq!(runs(&tree), vec![(0, 4)]);
    }

    #[test]
    fn extract_and_insert_move_nodes() {
        let arena = Arena::<()>::with_seed(4);
        let mut tree = IndexTree::new(&arena);
        tree.reserve(10);
        let middle = tree.extract(3..7).unwrap();
        assert_eq!(middle.len(), 4);
        assert_eq!(tree.len(), 6);
        assert_eq!(arena.live_nodes(), 3);

        tree.insert(6, middle).unwrap();
        assert_eq!(tree.len(), 10);
        assert_eq!(runs(&tree), vec![(0, 3), (3, 3), (6, 4)]);
        assert_eq!(arena.live_nodes(), 3);
    }

    #[test]
    fn insert_from_other_arena_fails() {
        let arena = Arena::<()>::default();
        let foreign = Arena::<()>::default();
        let mut tree = IndexTree::new(&arena);
        let mut other = IndexTree::new(&foreign);
        other.reserve(3);

        let err = tree.insert(0, other).unwrap_err();
        assert_eq!(err.error, Error::ArenaMismatch);
        assert_eq!(tree.len(), 0);
        let other = err.into_tree();
        assert_eq!(other.len(), 3);
        assert_eq!(foreign.live_nodes(), 1);
        drop(other);
        assert_eq!(foreign.live_nodes(), 0);
    }

    #[test]
    fn failed_insert_hands_the_tree_back() {
        let arena = Arena::<()>::with_seed(8);
        let mut tree = IndexTree::new(&arena);
        tree.push(());
        let mut source = IndexTree::new(&arena);
        for _ in 0..6 {
            source.push(());
        }
        let part = source.extract(1..5).unwrap();
        assert_eq!(arena.live_nodes(), 7);

        let err = tree.insert(5, part).unwrap_err();
        assert_eq!(err.error, Error::IndexOutOfBounds { index: 5, len: 1 });
        assert_eq!(err.to_string(), "index 5 is past the end of a sequence of length 1");
        assert_eq!(arena.live_nodes(), 7);

        let part = err.into_tree();
        assert_eq!(part.len(), 4);
        tree.insert(1, part).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(arena.live_nodes(), 7);
    }

    #[test]
    fn tree_dropped_inside_for_each_is_released() {
        let arena = Arena::<()>::with_seed(12);
        let mut a = IndexTree::new(&arena);
        a.reserve(3);
        let mut b = IndexTree::new(&arena);
        for _ in 0..5 {
            b.push(());
        }
        let mut slot = Some(b);
        a.for_each(|_| {
            slot.take();
        });
        assert!(slot.is_none());
        assert_eq!(arena.live_nodes(), 1);

        drop(a);
        assert_eq!(arena.live_nodes(), 0);
        assert_eq!(arena.stats().in_use(), 0);
    }

    #[test]
    fn deferred_release_runs_before_next_mutation() {
        let arena = Arena::<()>::new(&TreeConfig::default().with_capacity(3));
        let mut a = IndexTree::new(&arena);
        a.push(());
        let mut slot = Some({
            let mut b = IndexTree::new(&arena);
            b.reserve(2);
            b.push(());
            b
        });
        a.for_each(|_| drop(slot.take()));

        // The freed blocks are back in the pool before the push allocates.
        a.push(());
        assert_eq!(arena.stats().spilled, 0);
        assert_eq!(arena.live_nodes(), 2);
    }

    /// Counts positions through the hooks alone.
    #[derive(Default)]
    struct Count(u64);

    impl Policy for Count {
        fn cut(father: Father<'_, Self>, child: &Node<Self>, _: Side) {
            father.aggregate.0 -= child.payload().0;
        }

        fn glue(father: Father<'_, Self>, child: &Node<Self>, _: Side) {
            father.aggregate.0 += child.payload().0;
        }

        fn break_run(father: &Node<Self>, left: &mut Self, right: &mut Self, index: u64) {
            left.0 = index;
            right.0 = father.size() - index;
        }

        fn reserve(payload: &mut Self, own_weight: u64) {
            payload.0 = own_weight;
        }
    }

    #[test]
    fn reserve_hook_sees_the_run_length() {
        let arena = Arena::<Count>::with_seed(13);
        let mut tree = IndexTree::new(&arena);
        tree.reserve(10);
        assert_eq!(tree.query(0..10, |c| c.0).unwrap(), 10);

        tree.apply(4..6, |_| ()).unwrap();
        assert_eq!(runs(&tree), vec![(0, 4), (4, 2), (6, 4)]);
        assert_eq!(tree.query(0..4, |c| c.0).unwrap(), 4);
        assert_eq!(tree.query(4..6, |c| c.0).unwrap(), 2);
        assert_eq!(tree.query(6..10, |c| c.0).unwrap(), 4);
        assert_eq!(tree.query(0..10, |c| c.0).unwrap(), 10);

        tree.reserve(12);
        assert_eq!(tree.query(10..12, |c| c.0).unwrap(), 2);
        assert_eq!(tree.query(0..12, |c| c.0).unwrap(), 12);
    }

    #[test]
    fn drop_and_clear_release_nodes() {
        let arena = Arena::<()>::new(&TreeConfig::default().with_capacity(4));
        let mut tree = IndexTree::new(&arena);
        for _ in 0..8 {
            tree.push(());
        }
        assert_eq!(arena.stats().spilled, 4);
        let extracted = tree.extract(0..3).unwrap();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(arena.live_nodes(), 3);
        drop(extracted);
        assert_eq!(arena.live_nodes(), 0);
    }

    #[test]
    fn apply_callback_can_read_other_trees() {
        let arena = Arena::<()>::default();
        let mut tree = IndexTree::new(&arena);
        let mut other = IndexTree::new(&arena);
        tree.reserve(3);
        other.reserve(7);
        let len = tree.apply(0..1, |_| other.len()).unwrap();
        assert_eq!(len, 7);
    }

    #[test]
    #[should_panic(expected = "apply on empty range")]
    fn unchecked_empty_range_panics() {
        let arena = Arena::<()>::default();
        let mut tree = IndexTree::new(&arena);
        tree.reserve(3);
        tree.apply_unchecked(3..3, |_| ());
    }
}
