//! Single-pass summary statistics over an alignment stream.

use crate::alignment_record::FLAG_DESCRIPTIONS;
use crate::region_tagger::RegionTagger;
use crate::seqidx::{reference_key, ReferenceIndex};
use crate::tag_distribution::{TagDistribution, TagError, TagRequest};
use log::{debug, info};
use rust_htslib::bam::Record;
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::{self, Write};

const PROGRESS_INTERVAL: u64 = 1_000_000;

#[derive(Debug)]
pub enum StatsError {
    Read(rust_htslib::errors::Error),
    Tag(TagError),
    UnknownReference(i32),
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::Read(e) => write!(f, "Failed to read alignment record: {}", e),
            StatsError::Tag(e) => write!(f, "{}", e),
            StatsError::UnknownReference(tid) => {
                write!(f, "Record refers to reference id {} missing from the header", tid)
            }
        }
    }
}

impl std::error::Error for StatsError {}

impl From<TagError> for StatsError {
    fn from(e: TagError) -> Self {
        StatsError::Tag(e)
    }
}

/// How a pass over the records ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    Interrupted,
}

/// Accumulates read counts, flag usage, per-reference coverage, tag
/// distributions and (optionally) genomic region classes
pub struct AlignmentStatsEngine {
    references: ReferenceIndex,
    delim: Option<String>,
    tagger: Option<RegionTagger>,
    distributions: Vec<TagDistribution>,
    seen: FxHashSet<Vec<u8>>,
    flag_counts: FxHashMap<u16, u64>,
    ref_counts: FxHashMap<String, u64>,
    total: u64,
    mapped: u64,
    unmapped: u64,
}

impl AlignmentStatsEngine {
    pub fn new(
        references: ReferenceIndex,
        delim: Option<String>,
        tags: Vec<TagRequest>,
        tagger: Option<RegionTagger>,
    ) -> Self {
        // an empty delimiter never splits a name
        let delim = delim.filter(|d| !d.is_empty());
        let mut ref_counts = FxHashMap::default();
        for name in references.names() {
            ref_counts.insert(reference_key(name, delim.as_deref()).to_string(), 0);
        }

        AlignmentStatsEngine {
            references,
            delim,
            tagger,
            distributions: tags.into_iter().map(TagDistribution::new).collect(),
            seen: FxHashSet::default(),
            flag_counts: FxHashMap::default(),
            ref_counts,
            total: 0,
            mapped: 0,
            unmapped: 0,
        }
    }

    /// Account for one record. Records whose read name was already seen are ignored.
    pub fn add_record(&mut self, record: &Record) -> Result<(), StatsError> {
        if self.seen.contains(record.qname()) {
            return Ok(());
        }

        *self.flag_counts.entry(record.flags()).or_insert(0) += 1;
        self.seen.insert(record.qname().to_vec());
        self.total += 1;

        if record.is_unmapped() {
            self.unmapped += 1;
            return Ok(());
        }

        self.mapped += 1;
        let chrom = self
            .references
            .get_name(record.tid())
            .ok_or(StatsError::UnknownReference(record.tid()))?;
        let key = reference_key(chrom, self.delim.as_deref());
        match self.ref_counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.ref_counts.insert(key.to_string(), 1);
            }
        }

        if let Some(tagger) = self.tagger.as_mut() {
            tagger.add_read(record, chrom);
        }
        for distribution in self.distributions.iter_mut() {
            distribution.add(record)?;
        }

        Ok(())
    }

    /// Feed every record from `records`, checking `should_stop` between records.
    ///
    /// Stopping early is not an error: whatever was accumulated stays available for reporting.
    pub fn consume<I, F>(&mut self, records: I, mut should_stop: F) -> Result<PassOutcome, StatsError>
    where
        I: IntoIterator<Item = Result<Record, rust_htslib::errors::Error>>,
        F: FnMut() -> bool,
    {
        let mut processed: u64 = 0;
        for record_result in records {
            if should_stop() {
                info!("Interrupted after {} records, reporting partial results", processed);
                return Ok(PassOutcome::Interrupted);
            }
            let record = record_result.map_err(StatsError::Read)?;
            self.add_record(&record)?;

            processed += 1;
            if processed % PROGRESS_INTERVAL == 0 {
                info!(
                    "Processed {} records ({}:{})",
                    processed,
                    self.references.get_name(record.tid()).unwrap_or("*"),
                    record.pos() + 1
                );
            }
        }
        debug!("Processed {} records", processed);
        Ok(PassOutcome::Completed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn mapped(&self) -> u64 {
        self.mapped
    }

    pub fn unmapped(&self) -> u64 {
        self.unmapped
    }

    pub fn tagger(&self) -> Option<&RegionTagger> {
        self.tagger.as_ref()
    }

    pub fn distributions(&self) -> &[TagDistribution] {
        &self.distributions
    }

    pub fn reference_count(&self, key: &str) -> Option<u64> {
        self.ref_counts.get(key).copied()
    }

    /// Reads carrying each flag bit, for bits set on at least one read.
    ///
    /// A read with a composite flag counts towards every bit it sets.
    pub fn flag_bit_counts(&self) -> Vec<(u16, &'static str, u64)> {
        FLAG_DESCRIPTIONS
            .iter()
            .filter_map(|&(bit, description)| {
                let count: u64 = self
                    .flag_counts
                    .iter()
                    .filter(|(flag, _)| **flag & bit != 0)
                    .map(|(_, count)| count)
                    .sum();
                (count > 0).then_some((bit, description, count))
            })
            .collect()
    }

    /// Write the plain-text report
    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Reads:\t{}", self.total)?;
        writeln!(out, "Mapped:\t{}", self.mapped)?;
        writeln!(out, "Unmapped:\t{}", self.unmapped)?;

        if self.total == 0 {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "Flag distribution")?;
        let flag_rows = self.flag_bit_counts();
        let width = flag_rows
            .iter()
            .map(|(_, description, _)| description.len())
            .max()
            .unwrap_or(0);
        for (bit, description, count) in flag_rows {
            writeln!(
                out,
                "[0x{:03x}] {:<width$}:\t{} ({:.1}%)",
                bit,
                description,
                count,
                percent(count, self.total),
                width = width
            )?;
        }
        writeln!(out)?;
        writeln!(out)?;

        for distribution in &self.distributions {
            self.write_distribution(out, distribution)?;
        }

        self.write_references(out)?;

        if let Some(tagger) = &self.tagger {
            writeln!(out)?;
            writeln!(out, "Mapping regions")?;
            for (name, count) in tagger.counts() {
                writeln!(out, "{}\t{}", name, count)?;
            }
        }

        Ok(())
    }

    fn write_distribution<W: Write>(&self, out: &mut W, distribution: &TagDistribution) -> io::Result<()> {
        let name = distribution.name();
        match distribution.mean() {
            Some(mean) => writeln!(out, "Ave {}:\t{}", name, mean)?,
            None => writeln!(out, "Ave {}:\tNA", name)?,
        }
        match distribution.max() {
            Some(max) => writeln!(out, "Max {}:\t{}", name, max)?,
            None => writeln!(out, "Max {}:\tNA", name)?,
        }
        writeln!(out, "{} distribution:", name)?;

        let mut cumulative = 0u64;
        for (value, count) in distribution.iter() {
            cumulative += count;
            writeln!(
                out,
                "{}\t{}\t{:.1}%",
                value,
                count,
                percent(cumulative, self.mapped)
            )?;
        }
        writeln!(out)
    }

    fn write_references<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut keys: Vec<&String> = self.ref_counts.keys().collect();
        keys.sort_by(|a, b| natord::compare(a, b));

        writeln!(out, "Reference distribution")?;
        if self.delim.is_some() {
            writeln!(out, "ref\tcount")?;
            for key in keys {
                writeln!(out, "{}\t{}", key, self.ref_counts[key])?;
            }
        } else {
            writeln!(out, "ref\tlength\tcount\tcount per million bases")?;
            for key in keys {
                let count = self.ref_counts[key];
                match self.references.get_len(key) {
                    Some(length) if length > 0 => writeln!(
                        out,
                        "{}\t{}\t{}\t{:.4}",
                        key,
                        length,
                        count,
                        count as f64 / (length as f64 / 1_000_000.0)
                    )?,
                    _ => writeln!(out, "{}\t0\t{}\tNA", key, count)?,
                }
            }
        }
        Ok(())
    }
}

fn percent(count: u64, of: u64) -> f64 {
    if of == 0 {
        0.0
    } else {
        count as f64 * 100.0 / of as f64
    }
}
