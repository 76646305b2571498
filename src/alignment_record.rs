use rust_htslib::bam::record::{Aux, Cigar, CigarString};
use rust_htslib::bam::{self, Record};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Human-readable names for the SAM flag bits, in bit order
pub const FLAG_DESCRIPTIONS: [(u16, &str); 12] = [
    (0x1, "Multiple fragments"),
    (0x2, "All fragments aligned"),
    (0x4, "Unmapped"),
    (0x8, "Next unmapped"),
    (0x10, "Reverse complimented"),
    (0x20, "Next reverse complimented"),
    (0x40, "First fragment"),
    (0x80, "Last fragment"),
    (0x100, "Secondary alignment"),
    (0x200, "QC Fail"),
    (0x400, "PCR/Optical duplicate"),
    (0x800, "Supplementary alignment"),
];

/// Strand orientation for reads and annotated features
#[derive(Default, PartialEq, Eq, Hash, Clone, Copy, Debug)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    /// Parse the `+`/`-` notation used by annotation files
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            _ => None,
        }
    }

    /// Strand the read aligned to, taken from the 0x10 flag bit
    pub fn of_record(record: &Record) -> Self {
        if record.is_reverse() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

/// Alignment container formats we can write
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlignmentFormat {
    Bam,
    Sam,
    Cram,
}

impl AlignmentFormat {
    /// Format named by a `.bam`, `.sam` or `.cram` file extension
    pub fn from_extension(path: &str) -> Option<Self> {
        match Path::new(path).extension()?.to_str()? {
            "bam" => Some(AlignmentFormat::Bam),
            "sam" => Some(AlignmentFormat::Sam),
            "cram" => Some(AlignmentFormat::Cram),
            _ => None,
        }
    }

    /// Detect the format of an existing file from its leading bytes.
    ///
    /// CRAM files start with `CRAM` and BAM files are BGZF (gzip) compressed;
    /// anything else is read as SAM text.
    pub fn detect(path: &str) -> io::Result<Self> {
        let mut magic = Vec::with_capacity(4);
        File::open(path)?.take(4).read_to_end(&mut magic)?;
        Ok(match magic.as_slice() {
            [b'C', b'R', b'A', b'M'] => AlignmentFormat::Cram,
            [0x1f, 0x8b, ..] => AlignmentFormat::Bam,
            _ => AlignmentFormat::Sam,
        })
    }

    /// Format for `output`: its extension when it names one, otherwise the format of `input`
    pub fn for_output(input: &str, output: &str) -> io::Result<Self> {
        match AlignmentFormat::from_extension(output) {
            Some(format) => Ok(format),
            None => AlignmentFormat::detect(input),
        }
    }

    pub fn htslib_format(&self) -> bam::Format {
        match self {
            AlignmentFormat::Bam => bam::Format::Bam,
            AlignmentFormat::Sam => bam::Format::Sam,
            AlignmentFormat::Cram => bam::Format::Cram,
        }
    }
}

/// True if the alignment spans a skipped region (`N`), i.e. a splice junction
pub fn has_junction(cigar: &CigarString) -> bool {
    cigar.iter().any(|op| matches!(op, Cigar::RefSkip(_)))
}

/// Widen any integer-typed aux value to i64
pub fn aux_as_i64(aux: &Aux) -> Option<i64> {
    match *aux {
        Aux::I8(v) => Some(v as i64),
        Aux::U8(v) => Some(v as i64),
        Aux::I16(v) => Some(v as i64),
        Aux::U16(v) => Some(v as i64),
        Aux::I32(v) => Some(v as i64),
        Aux::U32(v) => Some(v as i64),
        _ => None,
    }
}

/// Mismatches plus indel events, where an indel counts once regardless of its length.
///
/// Derived from the edit distance (`NM`), which counts every inserted and deleted
/// base. Returns `None` when the record carries no integer `NM` tag.
pub fn mismatch_count(record: &Record) -> Option<i64> {
    let edits = record.aux(b"NM").ok().as_ref().and_then(aux_as_i64)?;

    let (mut inserted, mut deleted, mut indels) = (0i64, 0i64, 0i64);
    for op in record.cigar().iter() {
        match *op {
            Cigar::Ins(len) => {
                inserted += len as i64;
                indels += 1;
            }
            Cigar::Del(len) => {
                deleted += len as i64;
                indels += 1;
            }
            _ => {}
        }
    }

    Some(edits - inserted - deleted + indels)
}
