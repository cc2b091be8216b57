//! Chromosome-keyed convenience layer.
//!
//! Genomic datasets arrive partitioned by chromosome, and interval
//! coordinates only compare within one. [`GenomeIndexBuilder`] collects
//! `(chrom, start, end, data)` records, validates them, and builds one
//! interpolated tree per chromosome; [`GenomeIndex`] routes queries to the
//! right tree. Queries on chromosomes the index has never seen return
//! empty results.

use std::collections::HashMap;

use velella_core::{Coordinate, Result, Summarizable, VelellaError};

use crate::builder::Builder;
use crate::interpolated::InterpolatedTree;
use crate::interval::Interval;

/// Builder for a [`GenomeIndex`].
pub struct GenomeIndexBuilder<P: Coordinate + 'static, T: 'static> {
    chroms: HashMap<String, Builder<Interval<P, T>>>,
}

impl<P: Coordinate + 'static, T: 'static> GenomeIndexBuilder<P, T> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            chroms: HashMap::new(),
        }
    }

    /// Add an interval on a chromosome.
    ///
    /// Returns an error if `start > end`.
    pub fn add(&mut self, chrom: impl Into<String>, start: P, end: P, data: T) -> Result<()> {
        if start > end {
            return Err(VelellaError::InvalidInput(format!(
                "interval start ({:?}) must not exceed end ({:?})",
                start, end
            )));
        }
        self.chroms
            .entry(chrom.into())
            .or_insert_with(Builder::new)
            .add(Interval::new(start, end, data));
        Ok(())
    }

    /// Number of intervals added so far, across all chromosomes.
    pub fn len(&self) -> usize {
        self.chroms.values().map(Builder::len).sum()
    }

    /// Whether no intervals have been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build one interpolated tree per chromosome, each with `domains`
    /// model domains (clamped to at least 1).
    pub fn build(self, domains: usize) -> GenomeIndex<P, T> {
        GenomeIndex {
            chroms: self
                .chroms
                .into_iter()
                .map(|(chrom, builder)| (chrom, builder.build_interpolated(domains)))
                .collect(),
        }
    }
}

impl<P: Coordinate + 'static, T: 'static> Default for GenomeIndexBuilder<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable per-chromosome overlap index.
pub struct GenomeIndex<P: Coordinate, T> {
    chroms: HashMap<String, InterpolatedTree<Interval<P, T>>>,
}

impl<P: Coordinate, T> GenomeIndex<P, T> {
    /// Query all intervals on `chrom` overlapping `[start, end)`. Unknown
    /// chromosomes yield an empty result.
    pub fn overlap(&self, chrom: &str, start: P, end: P) -> Vec<&Interval<P, T>> {
        match self.chroms.get(chrom) {
            Some(tree) => tree.overlap(start, end),
            None => Vec::new(),
        }
    }

    /// Count intervals on `chrom` overlapping `[start, end)`.
    pub fn count_overlaps(&self, chrom: &str, start: P, end: P) -> usize {
        self.chroms
            .get(chrom)
            .map_or(0, |tree| tree.count_overlaps(start, end))
    }

    /// The per-chromosome tree, if the chromosome is present.
    pub fn chrom(&self, chrom: &str) -> Option<&InterpolatedTree<Interval<P, T>>> {
        self.chroms.get(chrom)
    }

    /// Iterate over the chromosome names in the index.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(String::as_str)
    }

    /// Total number of intervals across all chromosomes.
    pub fn len(&self) -> usize {
        self.chroms.values().map(InterpolatedTree::len).sum()
    }

    /// Whether the index contains no intervals.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Coordinate, T> Summarizable for GenomeIndex<P, T> {
    fn summary(&self) -> String {
        format!(
            "GenomeIndex: {} intervals across {} chromosomes",
            self.len(),
            self.chroms.len()
        )
    }
}
