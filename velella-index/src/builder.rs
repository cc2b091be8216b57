//! Collects items and builds the immutable indexes.

use velella_core::{Coordinate, Spanning};

use crate::interpolated::InterpolatedTree;
use crate::tree::IntervalTree;

/// Sort items by begin position ascending, ties broken by end ascending.
///
/// This is the builder's default sort. [`Builder::with_sort`] substitutes
/// any other strategy, which must produce the same order.
pub fn sort_by_bounds<I: Spanning>(items: &mut [I]) {
    items.sort_by(|a, b| a.beg().order(b.beg()).then(a.end().order(b.end())));
}

/// Accumulates items one by one or in bulk, then sorts them and hands the
/// array to an index constructor.
///
/// ```
/// use velella_index::Builder;
///
/// let mut builder = Builder::new();
/// builder.add((12u64, 34u64));
/// builder.add((0, 23));
/// builder.add((34, 56));
///
/// let tree = builder.build();
/// assert_eq!(tree.overlap(22, 25).len(), 2);
/// ```
pub struct Builder<I: Spanning + 'static> {
    items: Vec<I>,
    sort: Box<dyn FnMut(&mut [I])>,
}

impl<I: Spanning + 'static> Builder<I> {
    /// Create a builder using the default `(beg, end)` sort.
    pub fn new() -> Self {
        Self::with_sort(sort_by_bounds)
    }

    /// Create a builder with a custom sort strategy.
    pub fn with_sort(sort: impl FnMut(&mut [I]) + 'static) -> Self {
        Self {
            items: Vec::new(),
            sort: Box::new(sort),
        }
    }

    /// Add one item.
    pub fn add(&mut self, item: I) {
        self.items.push(item);
    }

    /// Number of items added so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items have been added.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sort and build the plain implicit interval tree.
    pub fn build(mut self) -> IntervalTree<I> {
        (self.sort)(&mut self.items);
        IntervalTree::from_sorted(self.items)
    }

    /// Sort and build the interpolated tree with `domains` model domains
    /// (clamped to at least 1).
    pub fn build_interpolated(mut self, domains: usize) -> InterpolatedTree<I> {
        (self.sort)(&mut self.items);
        InterpolatedTree::from_sorted(self.items, domains)
    }
}

impl<I: Spanning + 'static> Default for Builder<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Spanning + 'static> Extend<I> for Builder<I> {
    fn extend<T: IntoIterator<Item = I>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl<I: Spanning + 'static> FromIterator<I> for Builder<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        let mut builder = Self::new();
        builder.extend(iter);
        builder
    }
}
