use bamutils::commands::removeclipping::run_remove_clipping;
use bamutils::commands::stats::{run_stats, StatsConfig};
use clap::Parser;
use std::io;
use std::num::NonZeroUsize;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Number of threads for BAM compression and decompression.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(1).unwrap())]
    threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Utilities for summarizing and post-processing BAM files.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Calculate summary statistics for a BAM file
    Stats {
        #[clap(flatten)]
        common: CommonOpts,

        /// Input BAM file
        input: String,

        /// Only count reads in this region, `ref:start-end` or `ref:start` (1-based).
        /// Requires an indexed BAM file.
        region: Option<String>,

        /// Comma-separated tags to tally, each optionally followed by a sort order (`:+` or `:-`).
        /// Besides two-letter tags (AS, IH, NM, ...), accepts:
        /// - LENGTH (or LEN): read length
        /// - MAPQ: mapping quality
        /// - MISMATCH: mismatches + indels, each indel counting once (needs the NM tag)
        #[clap(long, value_parser)]
        tags: Option<String>,

        /// Split reference names on this delimiter and summarize by the first token
        #[clap(long, value_parser)]
        delim: Option<String>,

        /// RefIso/refFlat gene model; enables exon/intron/promoter/junction/intergenic/mitochondrial counts
        #[clap(long, value_parser)]
        model: Option<String>,
    },
    /// Remove all clipping from reads and alignments.
    ///
    /// Hard clipping is removed from the alignment. Soft clipping is removed from the alignment
    /// and the sequence. The number of soft clipped bases is added as ZA:i (5') and ZB:i (3'),
    /// and the clipped fraction of the read as ZC:f.
    #[command(name = "removeclipping", alias = "remove-clipping")]
    RemoveClipping {
        #[clap(flatten)]
        common: CommonOpts,

        /// Input BAM file
        input: String,

        /// Output file (.bam, .sam or .cram)
        output: String,

        /// Overwrite an existing output file
        #[clap(short = 'f', long, action)]
        force: bool,
    },
}

fn init_logger(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Stats {
            common,
            input,
            region,
            tags,
            delim,
            model,
        } => {
            init_logger(common.verbose);
            run_stats(&StatsConfig {
                input,
                region,
                tags,
                delim,
                model,
                threads: common.threads,
            })?;
        }
        Args::RemoveClipping {
            common,
            input,
            output,
            force,
        } => {
            init_logger(common.verbose);
            run_remove_clipping(&input, &output, force, common.threads)?;
        }
    }

    Ok(())
}
