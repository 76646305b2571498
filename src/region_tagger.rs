use crate::alignment_record::{has_junction, Strand};
use crate::gene_model::GeneModel;
use crate::range_match::{Feature, FeatureHit, IntervalIndex};
use log::{debug, info};
use rust_htslib::bam::Record;

/// Bases upstream of the transcription start treated as promoter
pub const PROMOTER_LENGTH: i32 = 2000;

const MITOCHONDRIAL_CHROM: &str = "chrM";

/// Mutually exclusive genomic categories a mapped read is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionClass {
    Exon,
    Intron,
    Promoter,
    ExonRev,
    IntronRev,
    PromoterRev,
    Junction,
    Intergenic,
    Mitochondrial,
}

impl RegionClass {
    pub const ALL: [RegionClass; 9] = [
        RegionClass::Exon,
        RegionClass::Intron,
        RegionClass::Promoter,
        RegionClass::ExonRev,
        RegionClass::IntronRev,
        RegionClass::PromoterRev,
        RegionClass::Junction,
        RegionClass::Intergenic,
        RegionClass::Mitochondrial,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RegionClass::Exon => "exon",
            RegionClass::Intron => "intron",
            RegionClass::Promoter => "promoter",
            RegionClass::ExonRev => "exon-rev",
            RegionClass::IntronRev => "intron-rev",
            RegionClass::PromoterRev => "promoter-rev",
            RegionClass::Junction => "junction",
            RegionClass::Intergenic => "intergenic",
            RegionClass::Mitochondrial => "mitochondrial",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

impl From<FeatureHit> for RegionClass {
    fn from(hit: FeatureHit) -> Self {
        match hit {
            FeatureHit::Sense(Feature::Exon) => RegionClass::Exon,
            FeatureHit::Sense(Feature::Intron) => RegionClass::Intron,
            FeatureHit::Sense(Feature::Promoter) => RegionClass::Promoter,
            FeatureHit::Antisense(Feature::Exon) => RegionClass::ExonRev,
            FeatureHit::Antisense(Feature::Intron) => RegionClass::IntronRev,
            FeatureHit::Antisense(Feature::Promoter) => RegionClass::PromoterRev,
        }
    }
}

/// Assigns each mapped read to exactly one [`RegionClass`] using a gene model
pub struct RegionTagger {
    /// Queried in order: exons, introns, promoters
    regions: [IntervalIndex; 3],
    counts: [u64; 9],
}

impl RegionTagger {
    /// Build exon, intron and promoter indices for genes on the given references.
    ///
    /// Genes on references missing from `chroms` are skipped.
    pub fn new<'a, I>(model: &GeneModel, chroms: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: rustc_hash::FxHashSet<&str> = chroms.into_iter().collect();

        let mut exons = IntervalIndex::builder(Feature::Exon);
        let mut introns = IntervalIndex::builder(Feature::Intron);
        let mut promoters = IntervalIndex::builder(Feature::Promoter);

        let mut skipped = 0usize;
        for gene in &model.genes {
            if !known.contains(gene.chrom.as_str()) {
                skipped += 1;
                continue;
            }

            match gene.strand {
                Strand::Forward => promoters.add_range(
                    &gene.chrom,
                    gene.strand,
                    gene.tx_start - PROMOTER_LENGTH,
                    gene.tx_start,
                ),
                Strand::Reverse => promoters.add_range(
                    &gene.chrom,
                    gene.strand,
                    gene.tx_end,
                    gene.tx_end + PROMOTER_LENGTH,
                ),
            }

            for transcript in &gene.transcripts {
                let mut last_end: Option<i32> = None;
                for (start, end) in transcript.exons() {
                    if let Some(intron_start) = last_end {
                        introns.add_range(&gene.chrom, gene.strand, intron_start, start);
                    }
                    exons.add_range(&gene.chrom, gene.strand, start, end);
                    last_end = Some(end);
                }
            }
        }
        if skipped > 0 {
            debug!("Skipped {} genes on references absent from the alignment file", skipped);
        }

        let tagger = RegionTagger {
            regions: [exons.build(), introns.build(), promoters.build()],
            counts: [0; 9],
        };
        info!(
            "Gene model indexed: {} exons, {} introns, {} promoters",
            tagger.regions[0].len(),
            tagger.regions[1].len(),
            tagger.regions[2].len()
        );
        tagger
    }

    /// Category for a mapped read, without counting it
    pub fn classify(&self, record: &Record, chrom: &str) -> RegionClass {
        if chrom == MITOCHONDRIAL_CHROM {
            return RegionClass::Mitochondrial;
        }
        if has_junction(&record.cigar()) {
            return RegionClass::Junction;
        }

        let strand = Strand::of_record(record);
        let pos = record.pos() as i32;
        self.regions
            .iter()
            .find_map(|region| region.get_tag(chrom, strand, pos, false))
            .map(RegionClass::from)
            .unwrap_or(RegionClass::Intergenic)
    }

    /// Count a read; unmapped reads are ignored
    pub fn add_read(&mut self, record: &Record, chrom: &str) -> Option<RegionClass> {
        if record.is_unmapped() {
            return None;
        }
        let class = self.classify(record, chrom);
        self.counts[class.slot()] += 1;
        Some(class)
    }

    pub fn count(&self, class: RegionClass) -> u64 {
        self.counts[class.slot()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// All categories with their counts, sorted by category name
    pub fn counts(&self) -> Vec<(&'static str, u64)> {
        let mut counts: Vec<(&'static str, u64)> = RegionClass::ALL
            .iter()
            .map(|class| (class.name(), self.count(*class)))
            .collect();
        counts.sort_by(|a, b| a.0.cmp(b.0));
        counts
    }
}
