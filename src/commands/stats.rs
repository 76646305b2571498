use crate::gene_model::GeneModel;
use crate::interrupt;
use crate::region::Region;
use crate::region_tagger::RegionTagger;
use crate::seqidx::ReferenceIndex;
use crate::stats::{AlignmentStatsEngine, PassOutcome, StatsError};
use crate::tag_distribution::TagRequest;
use log::{info, warn};
use rust_htslib::bam::{self, Read};
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;

/// Configuration for the stats command
pub struct StatsConfig {
    pub input: String,
    pub region: Option<String>,
    pub tags: Option<String>,
    pub delim: Option<String>,
    pub model: Option<String>,
    pub threads: NonZeroUsize,
}

/// Compute summary statistics for an alignment file and print the report on stdout
pub fn run_stats(config: &StatsConfig) -> io::Result<()> {
    if !Path::new(&config.input).exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("File: {} not found!", config.input),
        ));
    }

    // Validate everything up front so bad arguments fail before any record is read
    let region = config
        .region
        .as_deref()
        .map(Region::parse)
        .transpose()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let tags = match config.tags.as_deref() {
        Some(list) => TagRequest::parse_list(list)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?,
        None => Vec::new(),
    };
    let model = match config.model.as_deref() {
        Some(path) => {
            info!("Loading gene model: {}", path);
            let model = GeneModel::from_path(path)?;
            info!(
                "Loaded {} genes ({} transcripts)",
                model.genes.len(),
                model.transcript_count()
            );
            Some(model)
        }
        None => None,
    };

    match region {
        Some(region) => {
            let mut reader = bam::IndexedReader::from_path(&config.input).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "Failed to open indexed alignment file '{}' (region queries need an index): {}",
                        config.input, e
                    ),
                )
            })?;
            reader
                .set_threads(config.threads.get())
                .map_err(|e| io::Error::other(format!("Failed to set reader threads: {e}")))?;

            let references = ReferenceIndex::from_header(reader.header());
            if !references.contains(&region.name) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Reference '{}' not found in {}", region.name, config.input),
                ));
            }
            reader
                .fetch((region.name.as_str(), region.start, region.end))
                .map_err(|e| io::Error::other(format!("Failed to fetch region {region}: {e}")))?;
            info!("Region: {}", region);

            let mut engine = build_engine(config, references, tags, model.as_ref());
            run_pass(&mut reader, &mut engine)
        }
        None => {
            let mut reader = bam::Reader::from_path(&config.input).map_err(|e| {
                io::Error::other(format!(
                    "Failed to open alignment file '{}': {}",
                    config.input, e
                ))
            })?;
            reader
                .set_threads(config.threads.get())
                .map_err(|e| io::Error::other(format!("Failed to set reader threads: {e}")))?;

            let references = ReferenceIndex::from_header(reader.header());
            let mut engine = build_engine(config, references, tags, model.as_ref());
            run_pass(&mut reader, &mut engine)
        }
    }
}

fn build_engine(
    config: &StatsConfig,
    references: ReferenceIndex,
    tags: Vec<TagRequest>,
    model: Option<&GeneModel>,
) -> AlignmentStatsEngine {
    let tagger = model.map(|model| RegionTagger::new(model, references.names()));
    AlignmentStatsEngine::new(references, config.delim.clone(), tags, tagger)
}

fn run_pass<R: Read>(reader: &mut R, engine: &mut AlignmentStatsEngine) -> io::Result<()> {
    info!("Calculating read stats...");
    let outcome = {
        let _guard = interrupt::install();
        engine.consume(reader.records(), interrupt::interrupted)
    }
    .map_err(|e| match e {
        StatsError::Tag(_) => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        _ => io::Error::other(e.to_string()),
    })?;

    if outcome == PassOutcome::Interrupted {
        warn!("Pass interrupted; the report covers the records read so far");
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    engine.write_report(&mut out)?;
    out.flush()
}
