//! Interval overlap indexes in implicit-tree layout.
//!
//! This crate answers stabbing and overlap queries — find every stored
//! interval overlapping a query interval `[qbeg, qend)` — over a static
//! set of half-open intervals:
//!
//! - [`IntervalTree`] — an implicit interval tree: a complete binary tree
//!   embedded in one sorted array by index arithmetic, each node augmented
//!   with its subtree's maximum end position
//! - [`InterpolatedTree`] — the same tree plus a learned, piecewise linear
//!   model over begin positions that starts queries at a predicted
//!   interior node and climbs instead of descending from the root
//! - [`Builder`] — streaming or bulk construction with a pluggable sort
//! - [`Interval`] — a ready-made payload type; any [`Spanning`] type
//!   (including `(P, P)` pairs and `Range<P>`) can be indexed
//! - [`GenomeIndex`] — a chromosome-keyed wrapper for genomic datasets
//!
//! Both trees are immutable after construction and safe to query from many
//! threads at once. Query results borrow from the index.
//!
//! # Quick start
//!
//! ```
//! use velella_index::Builder;
//!
//! let mut builder = Builder::new();
//! builder.add((12u32, 34u32));
//! builder.add((0, 23));
//! builder.add((34, 56));
//!
//! let index = builder.build_interpolated(1);
//! let mut hits = index.overlap(22, 25);
//! hits.sort();
//! assert_eq!(hits, vec![&(0, 23), &(12, 34)]);
//! ```

mod builder;
mod geometry;
mod genome;
mod interpolated;
mod interval;
mod model;
mod node;
mod tree;

pub use builder::{sort_by_bounds, Builder};
pub use genome::{GenomeIndex, GenomeIndexBuilder};
pub use interpolated::InterpolatedTree;
pub use interval::Interval;
pub use tree::IntervalTree;
pub use velella_core::{Coordinate, Result, Spanning, Summarizable, VelellaError};
