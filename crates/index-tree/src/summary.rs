//! Ready-made min / max / sum aggregate over `i64` positions.
//!
//! Each node stores the value repeated along its own run (`value`) and the
//! min, max and sum over its run and both subtrees.
//!
//! Sums use wrapping two's-complement arithmetic, so a sum that leaves the
//! `i64` range is exact modulo 2^64 instead of panicking. Run lengths past
//! `i64::MAX` are handled the same way.

use crate::node::{Node, Side};
use crate::policy::{Father, Policy};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub value: i64,
    pub min: i64,
    pub max: i64,
    pub sum: i64,
}

impl Summary {
    /// A single position holding `value`.
    pub fn new(value: i64) -> Self {
        Self::run(value, 1)
    }

    /// `len` positions all holding `value`.
    pub fn run(value: i64, len: u64) -> Self {
        Self {
            value,
            min: value,
            max: value,
            sum: scale(value, len),
        }
    }

    /// Overwrites a childless node's run with `value`.
    ///
    /// Meant for [`IndexTree::apply`](crate::IndexTree::apply) on a range
    /// whose root has no children, such as a single position.
    pub fn assign(&mut self, value: i64, len: u64) {
        *self = Self::run(value, len);
    }
}

impl Policy for Summary {
    fn cut(father: Father<'_, Self>, child: &Node<Self>, side: Side) {
        let sibling = father.sibling(side);
        let aggregate = father.aggregate;
        aggregate.min = aggregate.value;
        aggregate.max = aggregate.value;
        if let Some(other) = sibling {
            aggregate.min = aggregate.min.min(other.payload().min);
            aggregate.max = aggregate.max.max(other.payload().max);
        }
        aggregate.sum = aggregate.sum.wrapping_sub(child.payload().sum);
    }

    fn glue(father: Father<'_, Self>, child: &Node<Self>, _side: Side) {
        let aggregate = father.aggregate;
        let child = child.payload();
        aggregate.sum = aggregate.sum.wrapping_add(child.sum);
        aggregate.min = aggregate.min.min(child.min);
        aggregate.max = aggregate.max.max(child.max);
    }

    fn break_run(father: &Node<Self>, left: &mut Self, right: &mut Self, index: u64) {
        let summary = father.payload();
        *left = Summary {
            sum: scale(summary.value, index),
            ..*summary
        };
        *right = Summary {
            sum: scale(summary.value, father.size() - index),
            ..*summary
        };
    }
}

/// `value * len` modulo 2^64.
fn scale(value: i64, len: u64) -> i64 {
    value.wrapping_mul(len as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::tree::IndexTree;

    fn values(tree: &IndexTree<Summary>) -> Vec<i64> {
        let mut out = Vec::new();
        tree.for_each(|run| {
            out.extend(std::iter::repeat(run.aggregate.value).take(run.own_weight as usize))
        });
        out
    }

    #[test]
    fn run_constructor() {
        assert_eq!(
            Summary::run(3, 4),
            Summary { value: 3, min: 3, max: 3, sum: 12 }
        );
        assert_eq!(Summary::new(-2).sum, -2);
    }

    #[test]
    fn aggregates_follow_splices() {
        let arena = Arena::with_seed(21);
        let mut tree = IndexTree::new(&arena);
        for v in [5, -1, 9, 3] {
            tree.push(Summary::new(v));
        }
        let total = tree.query(0..4, |s| *s).unwrap();
        assert_eq!((total.min, total.max, total.sum), (-1, 9, 16));

        let tail = tree.extract(2..4).unwrap();
        assert_eq!(tree.query(0..2, |s| (s.min, s.max, s.sum)).unwrap(), (-1, 5, 4));
        tree.insert(0, tail).unwrap();
        assert_eq!(values(&tree), vec![9, 3, 5, -1]);
        assert_eq!(tree.query(1..3, |s| (s.min, s.max, s.sum)).unwrap(), (3, 5, 8));
    }

    #[test]
    fn broken_runs_split_the_sum() {
        let arena = Arena::<Summary>::with_seed(22);
        let mut tree = IndexTree::new(&arena);
        tree.reserve(6);
        tree.apply(0..6, |s| s.aggregate.assign(4, s.len)).unwrap();
        assert_eq!(tree.query(1..4, |s| s.sum).unwrap(), 12);
        assert_eq!(tree.query(0..6, |s| (s.min, s.max, s.sum)).unwrap(), (4, 4, 24));
        assert_eq!(values(&tree), vec![4; 6]);
    }

    #[test]
    fn huge_runs_wrap_instead_of_overflowing() {
        assert_eq!(Summary::run(i64::MAX, 3).sum, i64::MAX.wrapping_mul(3));

        let arena = Arena::<Summary>::with_seed(23);
        let mut tree = IndexTree::new(&arena);
        let len = (1u64 << 63) + 10;
        tree.reserve(len);
        tree.apply(0..len, |s| s.aggregate.assign(2, s.len)).unwrap();
        assert_eq!(tree.query(0..3, |s| s.sum).unwrap(), 6);
        assert_eq!(tree.query(len - 4..len, |s| (s.min, s.max, s.sum)).unwrap(), (2, 2, 8));
        // 2 * (2^63 + 10) wraps to 20.
        assert_eq!(tree.query(0..len, |s| s.sum).unwrap(), 20);
    }
}
