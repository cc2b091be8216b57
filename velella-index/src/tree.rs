//! Implicit interval tree over a single sorted node array.
//!
//! [`IntervalTree`] stores items sorted by `(beg, end)` and overlays a
//! complete binary tree on the array by index arithmetic alone (see the
//! geometry module). Each node carries the maximum end position of its
//! subtree, the classic augmented-interval-tree key. The high ranks the
//! complete tree needs beyond the real nodes are *imaginary* and never
//! materialized; the construction pass walks the real/imaginary border
//! instead. Build once, query many times with O(log n + k) overlap queries.

use velella_core::{Spanning, Summarizable};

use crate::builder::{sort_by_bounds, Builder};
use crate::geometry::{
    left_child, leftmost_leaf, level, parent_of, right_child, rightmost_leaf, Level, Rank,
};
use crate::node::{BasicNode, IndexNode};

pub(crate) type NodePos<N> = <<N as IndexNode>::Item as Spanning>::Pos;

#[inline]
fn max_pos<P: PartialOrd>(a: P, b: P) -> P {
    if b > a {
        b
    } else {
        a
    }
}

/// Shared storage and traversal for both tree flavors: the sorted node
/// array plus the implied tree geometry.
#[derive(Debug, Clone)]
pub(crate) struct TreeCore<N: IndexNode> {
    pub(crate) nodes: Vec<N>,
    pub(crate) full_size: usize,
    pub(crate) root: Rank,
    pub(crate) root_level: Level,
}

impl<N: IndexNode> TreeCore<N> {
    /// Wrap items already sorted by `(beg, end)` and run the bottom-up
    /// augmentation pass. O(n).
    pub(crate) fn from_sorted(items: Vec<N::Item>) -> Self {
        let mut nodes: Vec<N> = items.into_iter().map(N::new).collect();
        let n = nodes.len();

        // smallest complete tree with at least n slots
        let mut root_level: Level = 0;
        let mut full_size: usize = usize::from(n > 0);
        while full_size < n {
            root_level += 1;
            full_size = (1usize << (root_level + 1)) - 1;
        }
        let root = (1usize << root_level) - 1;

        if n > 0 {
            debug_assert!(nodes.windows(2).all(|w| w[0].beg() <= w[1].beg()));

            // The path from the rightmost real leaf to the root traces the
            // border between real and imaginary ranks; border[k] is the
            // (possibly imaginary) border node on level k.
            let rightmost_real_leaf = n - (2 - n % 2);
            let mut border = Vec::with_capacity(root_level + 1);
            let mut b = rightmost_real_leaf;
            border.push(b);
            while b != root {
                b = parent_of(b);
                border.push(b);
            }

            // Bottom-up augmentation. Where a right child is imaginary, the
            // inside_max_end last recorded on the border covers the real
            // tail of the subtree.
            let mut right_border_ime = nodes[rightmost_real_leaf].inside_max_end();
            for k in 1..=root_level {
                let step = 1usize << (k + 1);
                let mut r = (1usize << k) - 1;
                while r < n {
                    let mut ime = nodes[r].end();
                    ime = max_pos(ime, nodes[left_child(r, k)].inside_max_end());
                    let rc = right_child(r, k);
                    ime = if rc < n {
                        max_pos(ime, nodes[rc].inside_max_end())
                    } else {
                        max_pos(ime, right_border_ime)
                    };
                    nodes[r].set_inside_max_end(ime);
                    if r == border[k] {
                        right_border_ime = ime;
                    }
                    r += step;
                }
            }
        }

        Self {
            nodes,
            full_size,
            root,
            root_level,
        }
    }

    /// Top-down overlap scan of the subtree at `(subtree, k)` against
    /// `[qbeg, qend)`, feeding hits to `emit`. Returns the number of tree
    /// nodes visited. Recursion depth is bounded by the tree height.
    pub(crate) fn scan<'a, F>(
        &'a self,
        subtree: Rank,
        k: Level,
        qbeg: NodePos<N>,
        qend: NodePos<N>,
        emit: &mut F,
    ) -> usize
    where
        F: FnMut(&'a N),
    {
        debug_assert!(subtree < self.full_size);
        debug_assert_eq!(k, level(subtree));
        let n = self.nodes.len();

        if subtree >= n {
            // An imaginary node's right subtree is entirely imaginary, so
            // only the left side needs descending.
            return 1
                + if k > 0 {
                    self.scan(left_child(subtree, k), k - 1, qbeg, qend, emit)
                } else {
                    0
                };
        }
        if k <= 2 {
            // unroll low-level traversal to reduce overhead
            let lml = leftmost_leaf(subtree, k);
            let rml = rightmost_leaf(subtree, k).min(n - 1);
            let mut r = lml;
            while r <= rml {
                let node = &self.nodes[r];
                if node.beg() >= qend {
                    break;
                }
                if node.end() > qbeg {
                    emit(node);
                }
                r += 1;
            }
            return r - lml;
        }

        // textbook recursive search
        let mut cost = 1;
        let node = &self.nodes[subtree];
        if node.inside_max_end() > qbeg {
            // something in this subtree extends into or over the query
            let ck = k - 1;
            cost += self.scan(left_child(subtree, k), ck, qbeg, qend, emit);
            if node.beg() < qend {
                if node.end() > qbeg {
                    emit(node);
                }
                cost += self.scan(right_child(subtree, k), ck, qbeg, qend, emit);
            }
        }
        cost
    }

    pub(crate) fn overlap_into<'a>(
        &'a self,
        qbeg: NodePos<N>,
        qend: NodePos<N>,
        out: &mut Vec<&'a N::Item>,
    ) -> usize {
        out.clear();
        if self.nodes.is_empty() || !(qbeg < qend) {
            return 0;
        }
        self.scan(self.root, self.root_level, qbeg, qend, &mut |node| {
            out.push(node.item())
        })
    }

    pub(crate) fn count_overlaps(&self, qbeg: NodePos<N>, qend: NodePos<N>) -> usize {
        if self.nodes.is_empty() || !(qbeg < qend) {
            return 0;
        }
        let mut count = 0;
        self.scan(self.root, self.root_level, qbeg, qend, &mut |_| count += 1);
        count
    }
}

/// A static implicit interval tree.
///
/// Built once from a set of items, then answers overlap queries in
/// O(log n + k). The tree cannot be modified after construction; queries
/// are read-only and may run concurrently.
#[derive(Debug, Clone)]
pub struct IntervalTree<I: Spanning> {
    pub(crate) core: TreeCore<BasicNode<I>>,
}

impl<I: Spanning> IntervalTree<I> {
    /// Start building a tree item by item.
    pub fn builder() -> Builder<I> {
        Builder::new()
    }

    /// Build from unsorted items. O(n log n).
    pub fn from_unsorted(mut items: Vec<I>) -> Self {
        sort_by_bounds(&mut items);
        Self::from_sorted(items)
    }

    /// Build from items already sorted by `(beg, end)`. O(n).
    pub fn from_sorted(items: Vec<I>) -> Self {
        Self {
            core: TreeCore::from_sorted(items),
        }
    }

    /// Query all items overlapping `[qbeg, qend)`, appending borrowed
    /// references to `out` (which is cleared first). Returns the number of
    /// tree nodes visited, a query cost metric.
    pub fn overlap_into<'a>(
        &'a self,
        qbeg: I::Pos,
        qend: I::Pos,
        out: &mut Vec<&'a I>,
    ) -> usize {
        self.core.overlap_into(qbeg, qend, out)
    }

    /// Query all items overlapping `[qbeg, qend)`.
    ///
    /// Returns references to all items where `beg < qend && end > qbeg`,
    /// in no guaranteed order.
    pub fn overlap(&self, qbeg: I::Pos, qend: I::Pos) -> Vec<&I> {
        let mut out = Vec::new();
        self.overlap_into(qbeg, qend, &mut out);
        out
    }

    /// Count items overlapping `[qbeg, qend)` without allocating.
    pub fn count_overlaps(&self, qbeg: I::Pos, qend: I::Pos) -> usize {
        self.core.count_overlaps(qbeg, qend)
    }

    /// Number of items in the tree.
    pub fn len(&self) -> usize {
        self.core.nodes.len()
    }

    /// Whether the tree contains no items.
    pub fn is_empty(&self) -> bool {
        self.core.nodes.is_empty()
    }

    /// Iterate over the items in `(beg, end)` order.
    pub fn iter(&self) -> impl Iterator<Item = &I> {
        self.core.nodes.iter().map(|node| node.item())
    }
}

impl<I: Spanning> Summarizable for IntervalTree<I> {
    fn summary(&self) -> String {
        format!("IntervalTree: {} intervals", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;

    fn iv(beg: u64, end: u64) -> (u64, u64) {
        (beg, end)
    }

    fn bounds(hits: &[&(u64, u64)]) -> Vec<(u64, u64)> {
        let mut v: Vec<(u64, u64)> = hits.iter().map(|h| **h).collect();
        v.sort();
        v
    }

    #[test]
    fn empty_tree() {
        let tree: IntervalTree<(u64, u64)> = IntervalTree::from_unsorted(vec![]);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.overlap(0, 100).len(), 0);
        assert_eq!(tree.count_overlaps(0, 100), 0);
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn single_interval() {
        let tree = IntervalTree::from_unsorted(vec![iv(10, 20)]);
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());

        assert_eq!(tree.overlap(5, 15).len(), 1);
        assert_eq!(tree.overlap(15, 25).len(), 1);
        assert_eq!(tree.overlap(10, 20).len(), 1);
        assert_eq!(tree.overlap(0, 10).len(), 0); // abutting
        assert_eq!(tree.overlap(20, 30).len(), 0); // abutting
        assert_eq!(tree.overlap(25, 30).len(), 0);
    }

    #[test]
    fn basic_overlap() {
        let tree = IntervalTree::from_unsorted(vec![iv(12, 34), iv(0, 23), iv(34, 56)]);
        let hits = tree.overlap(22, 25);
        assert_eq!(bounds(&hits), vec![(0, 23), (12, 34)]);
    }

    #[test]
    fn many_intervals() {
        let tree = IntervalTree::from_unsorted(vec![
            iv(0, 10),
            iv(5, 15),
            iv(20, 30),
            iv(25, 35),
            iv(50, 60),
        ]);
        assert_eq!(tree.len(), 5);

        assert_eq!(tree.overlap(8, 12).len(), 2);
        assert_eq!(tree.overlap(22, 28).len(), 2);
        assert_eq!(tree.overlap(40, 45).len(), 0);
        assert_eq!(tree.overlap(0, 35).len(), 4);
    }

    #[test]
    fn nested_intervals() {
        let tree = IntervalTree::from_unsorted(vec![
            iv(0, 100),
            iv(10, 90),
            iv(20, 80),
            iv(30, 70),
            iv(40, 60),
        ]);

        assert_eq!(tree.overlap(45, 55).len(), 5);
        assert_eq!(tree.overlap(0, 1).len(), 1);
        assert_eq!(tree.overlap(95, 100).len(), 1);
    }

    #[test]
    fn adjacent_intervals() {
        let tree = IntervalTree::from_unsorted(vec![iv(0, 10), iv(10, 20), iv(20, 30)]);

        // abutting intervals don't overlap in half-open semantics
        assert_eq!(bounds(&tree.overlap(10, 20)), vec![(10, 20)]);
        assert_eq!(bounds(&tree.overlap(9, 11)), vec![(0, 10), (10, 20)]);
        assert_eq!(tree.overlap(20, 30).len(), 1);
    }

    #[test]
    fn all_same_start() {
        let tree = IntervalTree::from_unsorted(vec![
            iv(10, 20),
            iv(10, 30),
            iv(10, 40),
            iv(10, 50),
        ]);

        assert_eq!(tree.overlap(10, 11).len(), 4);
        assert_eq!(tree.overlap(25, 26).len(), 3);
        assert_eq!(tree.overlap(35, 36).len(), 2);
        assert_eq!(tree.overlap(45, 46).len(), 1);
    }

    #[test]
    fn zero_width_query_is_empty() {
        let tree = IntervalTree::from_unsorted(vec![iv(7, 9)]);
        let mut out = Vec::new();
        assert_eq!(tree.overlap_into(8, 8, &mut out), 0);
        assert!(out.is_empty());
        assert_eq!(tree.overlap(7, 8).len(), 1);
        assert_eq!(tree.overlap(9, 10).len(), 0);
    }

    #[test]
    fn zero_width_item() {
        let tree = IntervalTree::from_unsorted(vec![iv(5, 5)]);
        // excluded once qbeg reaches its end
        assert_eq!(tree.overlap(5, 10).len(), 0);
        // a widened item is found
        let tree = IntervalTree::from_unsorted(vec![iv(5, 6)]);
        assert_eq!(tree.overlap(5, 10).len(), 1);
    }

    #[test]
    fn count_overlaps() {
        let tree = IntervalTree::from_unsorted(vec![iv(0, 10), iv(5, 15), iv(20, 30)]);
        assert_eq!(tree.count_overlaps(8, 12), 2);
        assert_eq!(tree.count_overlaps(25, 35), 1);
        assert_eq!(tree.count_overlaps(16, 19), 0);
    }

    #[test]
    fn overlap_into_clears_output() {
        let tree = IntervalTree::from_unsorted(vec![iv(0, 10)]);
        let mut out = Vec::new();
        tree.overlap_into(0, 5, &mut out);
        assert_eq!(out.len(), 1);
        tree.overlap_into(50, 60, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn iter_in_sorted_order() {
        let tree = IntervalTree::from_unsorted(vec![iv(30, 40), iv(10, 20), iv(50, 60), iv(0, 5)]);
        let begs: Vec<u64> = tree.iter().map(|i| i.0).collect();
        assert_eq!(begs, vec![0, 10, 30, 50]);
    }

    #[test]
    fn from_sorted() {
        let tree = IntervalTree::from_sorted(vec![iv(0, 10), iv(10, 20), iv(20, 30)]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.overlap(5, 25).len(), 3);
        assert_eq!(tree.overlap(5, 15).len(), 2);
    }

    #[test]
    fn data_preserved() {
        use crate::interval::Interval;

        let tree = IntervalTree::from_unsorted(vec![
            Interval::new(10u64, 20, 42usize),
            Interval::new(30, 40, 99),
        ]);

        let hits = tree.overlap(15, 35);
        assert_eq!(hits.len(), 2);
        let mut data: Vec<usize> = hits.iter().map(|h| h.data).collect();
        data.sort();
        assert_eq!(data, vec![42, 99]);
    }

    #[test]
    fn large_tree() {
        let items: Vec<(u64, u64)> = (0..1000).map(|i| iv(i * 10, i * 10 + 5)).collect();
        let tree = IntervalTree::from_unsorted(items);
        assert_eq!(tree.len(), 1000);

        let hits = tree.overlap(500, 510);
        assert_eq!(bounds(&hits), vec![(500, 505)]);
        assert_eq!(tree.overlap(0, 10000).len(), 1000);
    }

    #[test]
    fn scan_cost_is_positive() {
        let tree = IntervalTree::from_unsorted(vec![iv(0, 10), iv(20, 30), iv(40, 50)]);
        let mut out = Vec::new();
        let cost = tree.overlap_into(0, 100, &mut out);
        assert!(cost >= out.len());
    }

    #[test]
    fn query_matches_linear_scan() {
        let items = vec![
            iv(5, 15),
            iv(10, 25),
            iv(20, 35),
            iv(30, 45),
            iv(40, 55),
            iv(0, 100),
            iv(50, 60),
            iv(70, 80),
        ];
        let tree = IntervalTree::from_unsorted(items.clone());

        for start in (0..100).step_by(7) {
            for end in (start + 1..110).step_by(11) {
                let tree_count = tree.count_overlaps(start, end);
                let linear_count = items
                    .iter()
                    .filter(|i| i.0 < end && i.1 > start)
                    .count();
                assert_eq!(
                    tree_count, linear_count,
                    "mismatch for query [{}, {})",
                    start, end
                );
            }
        }
    }

    #[test]
    fn inside_max_end_invariant() {
        // pseudorandom but deterministic interval set
        let mut state = 0x9e3779b97f4a7c15u64;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            state >> 33
        };
        for n in [1usize, 2, 3, 5, 8, 17, 64, 100, 257] {
            let items: Vec<(u64, u64)> = (0..n)
                .map(|_| {
                    let beg = next() % 10_000;
                    (beg, beg + next() % 500)
                })
                .collect();
            let tree = IntervalTree::from_unsorted(items);
            let core = &tree.core;
            for r in 0..core.nodes.len() {
                let k = geometry::level(r);
                let lo = geometry::leftmost_leaf(r, k);
                let hi = geometry::rightmost_leaf(r, k).min(core.nodes.len() - 1);
                let expected = (lo..=hi).map(|m| core.nodes[m].end()).max().unwrap();
                assert_eq!(
                    core.nodes[r].inside_max_end(),
                    expected,
                    "rank {} of {}",
                    r,
                    n
                );
            }
        }
    }

    #[test]
    fn idempotent_queries() {
        let tree = IntervalTree::from_unsorted(vec![iv(0, 10), iv(5, 15), iv(20, 30)]);
        let first = bounds(&tree.overlap(3, 25));
        let second = bounds(&tree.overlap(3, 25));
        assert_eq!(first, second);
    }

    #[test]
    fn summary() {
        let tree = IntervalTree::from_unsorted(vec![iv(0, 10), iv(5, 15)]);
        assert_eq!(tree.summary(), "IntervalTree: 2 intervals");
    }
}
