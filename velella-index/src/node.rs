//! Node records stored in the index arrays.
//!
//! Both node kinds pack the payload item next to its augment values so a
//! scan touches one cache line per visit. The interpolated index carries one
//! extra coordinate per node.

use num_traits::Bounded;
use velella_core::Spanning;

/// A node of an implicit interval tree: the item plus augmentation.
pub(crate) trait IndexNode: Sized {
    /// The payload item type.
    type Item: Spanning;

    /// Wrap a fresh item; `inside_max_end` starts as the item's own end.
    fn new(item: Self::Item) -> Self;

    /// The payload.
    fn item(&self) -> &Self::Item;

    /// Maximum end position over this node and its real subtree.
    fn inside_max_end(&self) -> <Self::Item as Spanning>::Pos;

    fn set_inside_max_end(&mut self, pos: <Self::Item as Spanning>::Pos);

    #[inline]
    fn beg(&self) -> <Self::Item as Spanning>::Pos {
        self.item().beg()
    }

    #[inline]
    fn end(&self) -> <Self::Item as Spanning>::Pos {
        self.item().end()
    }
}

/// Node of the plain tree: the textbook augmented-interval-tree record.
#[derive(Debug, Clone)]
pub(crate) struct BasicNode<I: Spanning> {
    item: I,
    inside_max_end: I::Pos,
}

impl<I: Spanning> IndexNode for BasicNode<I> {
    type Item = I;

    fn new(item: I) -> Self {
        let inside_max_end = item.end();
        Self {
            item,
            inside_max_end,
        }
    }

    #[inline]
    fn item(&self) -> &I {
        &self.item
    }

    #[inline]
    fn inside_max_end(&self) -> I::Pos {
        self.inside_max_end
    }

    #[inline]
    fn set_inside_max_end(&mut self, pos: I::Pos) {
        self.inside_max_end = pos;
    }
}

/// Node of the interpolated tree.
///
/// `outside_max_end` is the maximum end over every node outside this node's
/// subtree whose begin is strictly smaller than this node's begin, or the
/// minimum-coordinate sentinel when no such node exists. Together with the
/// O(1)-computable outside minimum begin it proves when a bottom-up climb
/// has found a subtree containing every possible query result.
#[derive(Debug, Clone)]
pub(crate) struct AugmentedNode<I: Spanning> {
    item: I,
    inside_max_end: I::Pos,
    outside_max_end: I::Pos,
}

impl<I: Spanning> AugmentedNode<I> {
    #[inline]
    pub(crate) fn outside_max_end(&self) -> I::Pos {
        self.outside_max_end
    }

    #[inline]
    pub(crate) fn set_outside_max_end(&mut self, pos: I::Pos) {
        self.outside_max_end = pos;
    }
}

impl<I: Spanning> IndexNode for AugmentedNode<I> {
    type Item = I;

    fn new(item: I) -> Self {
        let inside_max_end = item.end();
        Self {
            item,
            inside_max_end,
            outside_max_end: <I::Pos as Bounded>::min_value(),
        }
    }

    #[inline]
    fn item(&self) -> &I {
        &self.item
    }

    #[inline]
    fn inside_max_end(&self) -> I::Pos {
        self.inside_max_end
    }

    #[inline]
    fn set_inside_max_end(&mut self, pos: I::Pos) {
        self.inside_max_end = pos;
    }
}
