//! Gene model loading
//!
//! Reads RefIso/refFlat-style annotation tables: one transcript per line,
//! `geneName isoName chrom strand txStart txEnd cdsStart cdsEnd exonCount exonStarts exonEnds`.
//! Transcripts sharing a gene name, chromosome and strand are grouped into one gene.
//! Plain and gzip-compressed (`.gz`) files are supported.

use crate::alignment_record::Strand;
use flate2::read::MultiGzDecoder;
use log::debug;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Error as IoError, Read};
use std::num::ParseIntError;

const MIN_FIELDS: usize = 11;

#[derive(Debug)]
pub enum GeneModelError {
    IoError(IoError),
    NotEnoughFields(usize),
    InvalidField(usize, ParseIntError),
    InvalidStrand(usize),
    ExonCountMismatch(usize),
}

impl std::fmt::Display for GeneModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneModelError::IoError(e) => write!(f, "IO error: {}", e),
            GeneModelError::NotEnoughFields(line) => {
                write!(f, "Line {}: expected at least {} fields", line, MIN_FIELDS)
            }
            GeneModelError::InvalidField(line, e) => write!(f, "Line {}: invalid field: {}", line, e),
            GeneModelError::InvalidStrand(line) => {
                write!(f, "Line {}: strand must be '+' or '-'", line)
            }
            GeneModelError::ExonCountMismatch(line) => {
                write!(f, "Line {}: exon starts and exon ends differ in length", line)
            }
        }
    }
}

impl std::error::Error for GeneModelError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub name: String,
    pub exon_starts: Vec<i32>,
    pub exon_ends: Vec<i32>,
}

impl Transcript {
    /// Exons as (start, end) pairs in file order
    pub fn exons(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.exon_starts
            .iter()
            .copied()
            .zip(self.exon_ends.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gene {
    pub name: String,
    pub chrom: String,
    pub strand: Strand,
    pub tx_start: i32,
    pub tx_end: i32,
    pub transcripts: Vec<Transcript>,
}

#[derive(Debug, Default)]
pub struct GeneModel {
    pub genes: Vec<Gene>,
}

fn parse_coord_list(field: &str, line_no: usize) -> Result<Vec<i32>, GeneModelError> {
    field
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<i32>()
                .map_err(|e| GeneModelError::InvalidField(line_no, e))
        })
        .collect()
}

struct TranscriptRow {
    gene_name: String,
    chrom: String,
    strand: Strand,
    tx_start: i32,
    tx_end: i32,
    transcript: Transcript,
}

fn parse_line(line: &str, line_no: usize) -> Result<TranscriptRow, GeneModelError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return Err(GeneModelError::NotEnoughFields(line_no));
    }

    let strand = Strand::from_symbol(fields[3]).ok_or(GeneModelError::InvalidStrand(line_no))?;
    let tx_start = fields[4]
        .parse::<i32>()
        .map_err(|e| GeneModelError::InvalidField(line_no, e))?;
    let tx_end = fields[5]
        .parse::<i32>()
        .map_err(|e| GeneModelError::InvalidField(line_no, e))?;

    let exon_starts = parse_coord_list(fields[9], line_no)?;
    let exon_ends = parse_coord_list(fields[10], line_no)?;
    if exon_starts.len() != exon_ends.len() {
        return Err(GeneModelError::ExonCountMismatch(line_no));
    }

    Ok(TranscriptRow {
        gene_name: fields[0].to_string(),
        chrom: fields[2].to_string(),
        strand,
        tx_start,
        tx_end,
        transcript: Transcript {
            name: fields[1].to_string(),
            exon_starts,
            exon_ends,
        },
    })
}

impl GeneModel {
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, GeneModelError> {
        let mut genes: Vec<Gene> = Vec::new();
        let mut gene_ids: FxHashMap<(String, String, Strand), usize> = FxHashMap::default();

        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(GeneModelError::IoError)?;
            let line_no = idx + 1;
            if line.trim().is_empty() || line.starts_with('#') || line.starts_with("geneName\t") {
                continue;
            }

            let row = parse_line(&line, line_no)?;
            let key = (row.gene_name.clone(), row.chrom.clone(), row.strand);
            match gene_ids.get(&key) {
                Some(&gene_id) => {
                    let gene = &mut genes[gene_id];
                    gene.tx_start = gene.tx_start.min(row.tx_start);
                    gene.tx_end = gene.tx_end.max(row.tx_end);
                    gene.transcripts.push(row.transcript);
                }
                None => {
                    gene_ids.insert(key, genes.len());
                    genes.push(Gene {
                        name: row.gene_name,
                        chrom: row.chrom,
                        strand: row.strand,
                        tx_start: row.tx_start,
                        tx_end: row.tx_end,
                        transcripts: vec![row.transcript],
                    });
                }
            }
        }

        Ok(GeneModel { genes })
    }

    /// Load a gene model from disk, decompressing `.gz` files on the fly
    pub fn from_path(path: &str) -> std::io::Result<Self> {
        let file = File::open(path).map_err(|e| {
            IoError::new(
                e.kind(),
                format!("Failed to open gene model '{}': {}", path, e),
            )
        })?;
        let reader: Box<dyn Read> = if path.ends_with(".gz") {
            debug!("Reading gzip-compressed gene model {}", path);
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        GeneModel::parse(BufReader::new(reader)).map_err(|e| {
            IoError::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to parse gene model '{}': {}", path, e),
            )
        })
    }

    pub fn transcript_count(&self) -> usize {
        self.genes.iter().map(|g| g.transcripts.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MODEL: &str = "#geneName\tname\tchrom\n\
        geneA\tNM_1\tchr1\t+\t1000\t5000\t1100\t4900\t3\t1000,2000,4000,\t1500,2500,5000,\n\
        geneA\tNM_2\tchr1\t+\t900\t3000\t1100\t2900\t2\t900,2000,\t1500,3000,\n\
        geneB\tNM_3\tchr2\t-\t100\t800\t100\t800\t1\t100,\t800,\n";

    #[test]
    fn test_parse_groups_transcripts_into_genes() {
        let model = GeneModel::parse(Cursor::new(MODEL)).unwrap();
        assert_eq!(model.genes.len(), 2);
        assert_eq!(model.transcript_count(), 3);

        let gene_a = &model.genes[0];
        assert_eq!(gene_a.name, "geneA");
        assert_eq!(gene_a.strand, Strand::Forward);
        assert_eq!((gene_a.tx_start, gene_a.tx_end), (900, 5000));
        assert_eq!(
            gene_a.transcripts[0].exons().collect::<Vec<_>>(),
            vec![(1000, 1500), (2000, 2500), (4000, 5000)]
        );

        let gene_b = &model.genes[1];
        assert_eq!(gene_b.chrom, "chr2");
        assert_eq!(gene_b.strand, Strand::Reverse);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let bad_strand = "g\tt\tchr1\t*\t1\t2\t1\t2\t1\t1,\t2,\n";
        assert!(matches!(
            GeneModel::parse(Cursor::new(bad_strand)),
            Err(GeneModelError::InvalidStrand(1))
        ));

        let short = "\ng\tt\tchr1\t+\t1\n";
        assert!(matches!(
            GeneModel::parse(Cursor::new(short)),
            Err(GeneModelError::NotEnoughFields(2))
        ));

        let mismatched = "g\tt\tchr1\t+\t1\t20\t1\t20\t2\t1,10,\t5,\n";
        assert!(matches!(
            GeneModel::parse(Cursor::new(mismatched)),
            Err(GeneModelError::ExonCountMismatch(1))
        ));
    }
}
