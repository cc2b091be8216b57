//! Interval tree with an interpolation index.
//!
//! [`InterpolatedTree`] extends the implicit interval tree with a learned,
//! piecewise linear model over begin positions. A query jumps to the node
//! the model predicts instead of descending from the root, climbs while a
//! local predicate says results could still lie outside the current
//! subtree, then scans the subtree it stopped at. Two facts make the
//! stopping predicate sound at a node `n`: every outside node with a
//! smaller begin ends at or before `qbeg` (from `outside_max_end`), and
//! every outside node with a begin at least `n`'s starts at or after
//! `qend` (from the O(1) outside minimum begin). Together they exhaust the
//! nodes outside `n`'s subtree.

use std::sync::atomic::{AtomicUsize, Ordering};

use num_traits::Bounded;
use velella_core::{Coordinate, Spanning, Summarizable};

use crate::builder::{sort_by_bounds, Builder};
use crate::geometry::{
    leftmost_leaf, leftmost_leaf_of, level, levelrank_of_rank, parent, rank_of_levelrank,
    rightmost_leaf, Level, Rank,
};
use crate::model::{regress, DomainModel, TRAIN_LEVELS};
use crate::node::{AugmentedNode, IndexNode};
use crate::tree::TreeCore;

/// An implicit interval tree with an interpolation index.
///
/// Behaves exactly like [`IntervalTree`](crate::IntervalTree) — same build
/// contract, same query results — but answers queries by predict-and-climb
/// where the model is confident and by the plain top-down scan elsewhere.
/// Immutable after construction; queries may run concurrently.
#[derive(Debug)]
pub struct InterpolatedTree<I: Spanning> {
    core: TreeCore<AugmentedNode<I>>,
    model: DomainModel<I::Pos>,
    queries: AtomicUsize,
    total_climb_cost: AtomicUsize,
}

impl<I: Spanning> InterpolatedTree<I> {
    /// Start building a tree item by item.
    pub fn builder() -> Builder<I> {
        Builder::new()
    }

    /// Build from unsorted items with `domains` model domains. O(n log n).
    pub fn from_unsorted(mut items: Vec<I>, domains: usize) -> Self {
        sort_by_bounds(&mut items);
        Self::from_sorted(items, domains)
    }

    /// Build from items already sorted by `(beg, end)`, with `domains`
    /// model domains (clamped to at least 1).
    pub fn from_sorted(items: Vec<I>, domains: usize) -> Self {
        let core = TreeCore::from_sorted(items);
        let mut tree = Self {
            core,
            model: DomainModel::new(domains),
            queries: AtomicUsize::new(0),
            total_climb_cost: AtomicUsize::new(0),
        };
        if !tree.core.nodes.is_empty() {
            tree.fill_outside_max_end();
            let min_beg = tree.core.nodes[0].beg();
            let max_beg = tree.core.nodes[tree.core.nodes.len() - 1].beg();
            tree.model.set_range(min_beg, max_beg);
            tree.train();
        }
        tree
    }

    /// Query all items overlapping `[qbeg, qend)`, appending borrowed
    /// references to `out` (which is cleared first). Returns the scan cost
    /// plus a 3x-weighted climb cost.
    pub fn overlap_into<'a>(
        &'a self,
        qbeg: I::Pos,
        qend: I::Pos,
        out: &mut Vec<&'a I>,
    ) -> usize {
        out.clear();
        self.query(qbeg, qend, &mut |node| out.push(node.item()))
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
        let mut count = 0;
        self.query(qbeg, qend, &mut |_| count += 1);
        count
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

    /// Number of queries answered from a model prediction. Root fallbacks
    /// are not counted. Diagnostic; relaxed atomic under concurrency.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Total climb steps over all predicted queries. Diagnostic; relaxed
    /// atomic under concurrency.
    pub fn total_climb_cost(&self) -> usize {
        self.total_climb_cost.load(Ordering::Relaxed)
    }

    /// Predict, climb, scan. Returns the query cost metric.
    fn query<'a, F>(&'a self, qbeg: I::Pos, qend: I::Pos, emit: &mut F) -> usize
    where
        F: FnMut(&'a AugmentedNode<I>),
    {
        let n = self.core.nodes.len();
        if n == 0 || !(qbeg < qend) {
            return 0;
        }
        let Some(prediction) = self.predict(qbeg) else {
            // no model for this domain; plain top-down scan
            return self
                .core
                .scan(self.core.root, self.core.root_level, qbeg, qend, emit);
        };

        let k0 = level(prediction);
        debug_assert!(k0 <= self.core.root_level);

        // climb until the stopping predicate holds, or the root
        let mut subtree = prediction;
        let mut k = k0;
        while subtree != self.core.root
            && (subtree >= n // imaginary; nothing conclusive can be read
                || qbeg < self.core.nodes[subtree].outside_max_end()
                || self.outside_min_beg(subtree, k) < qend)
        {
            subtree = parent(subtree, k);
            k += 1;
        }
        let climb_cost = k - k0;
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.total_climb_cost.fetch_add(climb_cost, Ordering::Relaxed);

        // climb steps are tripled in the cost metric: the outside-min-beg
        // lookup can incur two extra cache misses per step
        self.core.scan(subtree, k, qbeg, qend, emit) + 3 * climb_cost
    }

    /// Minimum begin over nodes outside the subtree whose begin is at
    /// least the subtree root's, in O(1) from sorted-array geometry.
    fn outside_min_beg(&self, subtree: Rank, k: Level) -> I::Pos {
        let nodes = &self.core.nodes;
        let r = rightmost_leaf(subtree, k);
        let beg = nodes[subtree].beg();
        let l = leftmost_leaf(subtree, k);
        // nodes left of the subtree may share the subroot's beg and qualify
        if l > 0 && nodes[l - 1].beg() == beg {
            return beg;
        }
        if r < nodes.len() - 1 {
            nodes[r + 1].beg()
        } else {
            <I::Pos as Bounded>::max_value()
        }
    }

    /// Fill `outside_max_end` for every node from a running max-end prefix
    /// over the sorted array.
    fn fill_outside_max_end(&mut self) {
        let nodes = &mut self.core.nodes;
        let n = nodes.len();

        let mut running_max_end = Vec::with_capacity(n);
        running_max_end.push(nodes[0].end());
        for r in 1..n {
            let prev = running_max_end[r - 1];
            let end = nodes[r].end();
            running_max_end.push(if end > prev { end } else { prev });
        }

        for r in 0..n {
            let l = leftmost_leaf_of(r);
            if l == 0 {
                continue; // no node has a smaller beg; the sentinel stands
            }
            let beg = nodes[r].beg();
            // highest-ranked node below the subtree whose beg is strictly
            // smaller; equal-beg ties do not count
            let mut leq = l - 1;
            while nodes[leq].beg() == beg {
                if leq == 0 {
                    break;
                }
                leq -= 1;
            }
            if nodes[leq].beg() < beg {
                nodes[r].set_outside_max_end(running_max_end[leq]);
            }
        }
    }

    /// Materialize the model prediction for `qbeg` on level `k`.
    /// Off-scale predictions snap to the rightmost real leaf.
    fn interpolate(&self, k: Level, w0: f32, w1: f32, qbeg: I::Pos) -> Rank {
        let n = self.core.nodes.len();
        let predicted = w0 + w1 * qbeg.as_f64() as f32;
        let lr_f = predicted.round();
        // the full tree bounds the prediction to its last level-k slot
        let max_lr = ((self.core.full_size + 1) >> (k + 1)).saturating_sub(1);
        let lr = if lr_f >= 0.0 {
            (lr_f as usize).min(max_lr)
        } else {
            0
        };
        let rank = rank_of_levelrank(k, lr);
        debug_assert!(rank >= n || level(rank) == k);
        if rank < n {
            rank
        } else {
            n - (2 - n % 2)
        }
    }

    /// Select the domain for `qbeg` and predict a start rank, or `None`
    /// when the domain has no model.
    fn predict(&self, qbeg: I::Pos) -> Option<Rank> {
        let (w0, w1, lv) = self.model.params(self.model.which_domain(qbeg));
        if lv < 0.0 {
            return None;
        }
        debug_assert!((lv as Level) <= self.core.root_level);
        Some(self.interpolate(lv as Level, w0, w1, qbeg))
    }

    /// Fit each domain's regression at the candidate levels and keep the
    /// cheapest level that beats the plain top-down scan.
    fn train(&mut self) {
        let n = self.core.nodes.len();
        let root_level = self.core.root_level;

        // (beg, rank) points partitioned by domain
        let mut points: Vec<Vec<(I::Pos, Rank)>> = vec![Vec::new(); self.model.domains];
        for r in 0..n {
            let beg = self.core.nodes[r].beg();
            points[self.model.which_domain(beg)].push((beg, r));
        }

        for (d, domain_points) in points.iter().enumerate() {
            // partition by tree level, ranks becoming level-ranks
            let mut by_level: Vec<Vec<(f64, f64)>> = vec![Vec::new(); root_level + 1];
            for &(x, r) in domain_points {
                by_level[level(r)].push((x.as_f64(), levelrank_of_rank(r) as f64));
            }

            let mut lowest_cost = f64::MAX;
            for &k in TRAIN_LEVELS.iter() {
                if k >= root_level || by_level[k].len() <= 1 {
                    break;
                }
                let (w0, w1) = regress(&by_level[k]);
                if w1 == 0.0 {
                    continue;
                }
                // estimated average search cost over the whole domain: the
                // jump depth plus the worse of the miss distance and the
                // outside-overlap climb; either can dominate and they are
                // not additive
                let mut cost = 0usize;
                for &(x, y) in domain_points {
                    let fx = self.interpolate(k, w0 as f32, w1 as f32, x);
                    let error = fx.abs_diff(y) >> k;
                    let error_penalty = if error > 0 {
                        2 * (1 + error.ilog2() as usize)
                    } else {
                        0
                    };
                    let overlap_penalty = if self.core.nodes[fx].outside_max_end() > x {
                        1 + (root_level - k) / 2
                    } else {
                        0
                    };
                    cost += k + error_penalty.max(overlap_penalty);
                }
                let avg_cost = cost as f64 / domain_points.len() as f64;
                if avg_cost < root_level as f64 && avg_cost < lowest_cost {
                    lowest_cost = avg_cost;
                    self.model.set_params(d, w0 as f32, w1 as f32, k);
                }
            }
        }
    }
}

impl<I: Spanning> Summarizable for InterpolatedTree<I> {
    fn summary(&self) -> String {
        format!(
            "InterpolatedTree: {} intervals, {} domains",
            self.len(),
            self.model.domains
        )
    }
}
