//! Point-in-interval lookups for one class of annotated feature.
//!
//! Each index holds the intervals of a single feature kind (exons, introns or
//! promoters), one interval tree per reference sequence. A lookup only reports
//! whether some interval on the same strand, or failing that on the opposite
//! strand, contains the point; which interval matched is irrelevant, so the
//! order intervals were added in never changes an answer.

use crate::alignment_record::Strand;
use coitrees::{BasicCOITree, Interval, IntervalTree};
use rustc_hash::FxHashMap;
use std::fmt;

/// Feature kinds a [`IntervalIndex`] can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Exon,
    Intron,
    Promoter,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Exon => "exon",
            Feature::Intron => "intron",
            Feature::Promoter => "promoter",
        }
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureHit {
    /// Contained by an interval on the query strand (or strand was ignored)
    Sense(Feature),
    /// Only contained by intervals on the opposite strand
    Antisense(Feature),
}

impl fmt::Display for FeatureHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureHit::Sense(feature) => write!(f, "{}", feature.name()),
            FeatureHit::Antisense(feature) => write!(f, "{}-rev", feature.name()),
        }
    }
}

/// Collects intervals before the per-reference trees are built
pub struct IntervalIndexBuilder {
    feature: Feature,
    intervals: FxHashMap<String, Vec<Interval<Strand>>>,
}

impl IntervalIndexBuilder {
    /// Add the closed interval `[start, end]` on `chrom`.
    ///
    /// Callers are responsible for `start <= end`; identical intervals are kept twice.
    pub fn add_range(&mut self, chrom: &str, strand: Strand, start: i32, end: i32) {
        self.intervals.entry(chrom.to_string()).or_default().push(Interval {
            first: start,
            last: end,
            metadata: strand,
        });
    }

    pub fn build(self) -> IntervalIndex {
        let trees = self
            .intervals
            .into_iter()
            .map(|(chrom, intervals)| (chrom, BasicCOITree::new(intervals.as_slice())))
            .collect();
        IntervalIndex {
            feature: self.feature,
            trees,
        }
    }
}

pub struct IntervalIndex {
    feature: Feature,
    trees: FxHashMap<String, BasicCOITree<Strand, u32>>,
}

impl IntervalIndex {
    pub fn builder(feature: Feature) -> IntervalIndexBuilder {
        IntervalIndexBuilder {
            feature,
            intervals: FxHashMap::default(),
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    /// Number of intervals stored across all references
    pub fn len(&self) -> usize {
        self.trees.values().map(|tree| tree.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classify a single position.
    ///
    /// Returns `Sense` if any interval containing `pos` is on `strand` (or
    /// `ignore_strand` is set), `Antisense` if only opposite-strand intervals
    /// contain it, and `None` for unknown references or uncovered positions.
    pub fn get_tag(
        &self,
        chrom: &str,
        strand: Strand,
        pos: i32,
        ignore_strand: bool,
    ) -> Option<FeatureHit> {
        let tree = self.trees.get(chrom)?;

        let mut sense = false;
        let mut antisense = false;
        tree.query(pos, pos, |interval| {
            let interval_strand: Strand = interval.metadata.clone();
            if ignore_strand || interval_strand == strand {
                sense = true;
            } else {
                antisense = true;
            }
        });

        if sense {
            Some(FeatureHit::Sense(self.feature))
        } else if antisense {
            Some(FeatureHit::Antisense(self.feature))
        } else {
            None
        }
    }
}
