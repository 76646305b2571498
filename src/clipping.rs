//! Removal of soft and hard clipping from alignment records.
//!
//! Hard clips are dropped from the CIGAR. Soft clips are dropped from the CIGAR and
//! their bases trimmed from the sequence and qualities. The number of trimmed bases is
//! recorded as `ZA:i` (5' end) and `ZB:i` (3' end), and the trimmed fraction of the
//! original read as `ZC:f`.

use rust_htslib::bam::record::{Aux, Cigar, CigarString};
use rust_htslib::bam::Record;
use rust_htslib::errors::{Error, Result};

pub const FIVE_PRIME_TAG: &[u8; 2] = b"ZA";
pub const THREE_PRIME_TAG: &[u8; 2] = b"ZB";
pub const CLIPPED_FRACTION_TAG: &[u8; 2] = b"ZC";

/// What was removed from one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSummary {
    pub clip_5: u32,
    pub clip_3: u32,
    /// (clip_5 + clip_3) / original sequence length
    pub fraction: f64,
}

struct SplitCigar {
    kept: Vec<Cigar>,
    clip_5: u32,
    clip_3: u32,
    changed: bool,
}

fn split_clips(cigar: &CigarString) -> SplitCigar {
    let mut split = SplitCigar {
        kept: Vec::with_capacity(cigar.len()),
        clip_5: 0,
        clip_3: 0,
        changed: false,
    };
    let mut in_sequence = false;

    for op in cigar.iter() {
        match *op {
            Cigar::HardClip(_) => split.changed = true,
            Cigar::SoftClip(len) => {
                split.changed = true;
                if in_sequence {
                    split.clip_3 += len;
                } else {
                    split.clip_5 += len;
                }
            }
            other => {
                in_sequence = true;
                split.kept.push(other);
            }
        }
    }

    split
}

/// Drop `tag` from the record if present
fn clear_aux(record: &mut Record, tag: &[u8]) -> Result<()> {
    match record.remove_aux(tag) {
        Ok(()) | Err(Error::BamAuxTagNotFound) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Strip clipping from a single record in place.
///
/// Returns `None` when nothing was changed: unmapped reads and reads without any
/// clipping are left untouched. ZA/ZB/ZC values already on the record are replaced.
/// The tags are written before the CIGAR and sequence, so an error leaves the
/// alignment itself unmodified.
pub fn remove_clipping(record: &mut Record) -> Result<Option<ClipSummary>> {
    if record.is_unmapped() {
        return Ok(None);
    }

    let split = split_clips(&record.cigar());
    if !split.changed {
        return Ok(None);
    }

    let seq = record.seq().as_bytes();
    let qual = record.qual().to_vec();
    let qname = record.qname().to_vec();
    let orig_len = seq.len();

    let end = orig_len.saturating_sub(split.clip_3 as usize);
    let start = (split.clip_5 as usize).min(end);
    let fraction = if orig_len == 0 {
        0.0
    } else {
        (split.clip_5 + split.clip_3) as f64 / orig_len as f64
    };

    for tag in [FIVE_PRIME_TAG, THREE_PRIME_TAG, CLIPPED_FRACTION_TAG] {
        clear_aux(record, tag)?;
    }
    if split.clip_5 > 0 {
        record.push_aux(FIVE_PRIME_TAG, Aux::I32(split.clip_5 as i32))?;
    }
    if split.clip_3 > 0 {
        record.push_aux(THREE_PRIME_TAG, Aux::I32(split.clip_3 as i32))?;
    }
    record.push_aux(CLIPPED_FRACTION_TAG, Aux::Float(fraction as f32))?;

    // `set` keeps the aux block
    record.set(
        &qname,
        Some(&CigarString(split.kept)),
        &seq[start..end],
        &qual[start..end],
    );

    Ok(Some(ClipSummary {
        clip_5: split.clip_5,
        clip_3: split.clip_3,
        fraction,
    }))
}

/// Applies [`remove_clipping`] to a stream of records, keeping a tally
#[derive(Debug, Default)]
pub struct ClippingNormalizer {
    total: u64,
    altered: u64,
}

impl ClippingNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, record: &mut Record) -> Result<Option<ClipSummary>> {
        let summary = remove_clipping(record)?;
        self.total += 1;
        if summary.is_some() {
            self.altered += 1;
        }
        Ok(summary)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn altered(&self) -> u64 {
        self.altered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_record::tests::mapped_record;

    const SEQ: &[u8; 20] = b"AACCGGTTACGTACGTTTAA";

    #[test]
    fn test_soft_clips_on_both_ends() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::SoftClip(5), Cigar::Match(12), Cigar::SoftClip(3)],
            SEQ,
            100,
        );

        let summary = remove_clipping(&mut record).unwrap().unwrap();
        assert_eq!(summary.clip_5, 5);
        assert_eq!(summary.clip_3, 3);
        assert!((summary.fraction - 0.4).abs() < 1e-12);

        assert_eq!(record.cigar().to_string(), "12M");
        assert_eq!(record.seq().as_bytes(), SEQ[5..17].to_vec());
        assert_eq!(record.qual().len(), 12);
        assert_eq!(record.qname(), b"r1");
        assert_eq!(record.pos(), 100);
        assert_eq!(record.aux(b"ZA").unwrap(), Aux::I32(5));
        assert_eq!(record.aux(b"ZB").unwrap(), Aux::I32(3));
        assert_eq!(record.aux(b"ZC").unwrap(), Aux::Float(0.4));
    }

    #[test]
    fn test_only_five_prime_clip_keeps_tail() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::SoftClip(4), Cigar::Match(16)],
            SEQ,
            100,
        );

        let summary = remove_clipping(&mut record).unwrap().unwrap();
        assert_eq!((summary.clip_5, summary.clip_3), (4, 0));
        assert_eq!(record.seq().as_bytes(), SEQ[4..].to_vec());
        assert!(record.aux(b"ZB").is_err());
        assert_eq!(record.aux(b"ZC").unwrap(), Aux::Float(0.2));
    }

    #[test]
    fn test_three_prime_clip_after_insertion() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::Ins(2), Cigar::Match(16), Cigar::SoftClip(2)],
            SEQ,
            100,
        );

        let summary = remove_clipping(&mut record).unwrap().unwrap();
        assert_eq!((summary.clip_5, summary.clip_3), (0, 2));
        assert_eq!(record.cigar().to_string(), "2I16M");
        assert_eq!(record.seq().as_bytes(), SEQ[..18].to_vec());
        assert!(record.aux(b"ZA").is_err());
    }

    #[test]
    fn test_hard_clips_only_touch_cigar() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::HardClip(7), Cigar::Match(20), Cigar::HardClip(1)],
            SEQ,
            100,
        );

        let summary = remove_clipping(&mut record).unwrap().unwrap();
        assert_eq!((summary.clip_5, summary.clip_3), (0, 0));
        assert_eq!(summary.fraction, 0.0);
        assert_eq!(record.cigar().to_string(), "20M");
        assert_eq!(record.seq().as_bytes(), SEQ.to_vec());
        assert!(record.aux(b"ZA").is_err());
        assert!(record.aux(b"ZB").is_err());
        assert_eq!(record.aux(b"ZC").unwrap(), Aux::Float(0.0));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::HardClip(2), Cigar::SoftClip(5), Cigar::Match(15)],
            SEQ,
            100,
        );
        record.push_aux(b"NM", Aux::U8(0)).unwrap();

        assert!(remove_clipping(&mut record).unwrap().is_some());
        let seq = record.seq().as_bytes();
        let aux_count = record.aux_iter().count();
        assert_eq!(record.aux(b"NM").unwrap(), Aux::U8(0));

        assert_eq!(remove_clipping(&mut record).unwrap(), None);
        assert_eq!(record.seq().as_bytes(), seq);
        assert_eq!(record.aux_iter().count(), aux_count);
        assert_eq!(record.cigar().to_string(), "15M");
    }

    #[test]
    fn test_existing_clip_tags_are_replaced() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::SoftClip(5), Cigar::Match(15)],
            SEQ,
            100,
        );
        record.push_aux(b"ZC", Aux::Float(0.5)).unwrap();
        record.push_aux(b"ZB", Aux::I32(9)).unwrap();
        record.push_aux(b"NM", Aux::U8(1)).unwrap();

        let summary = remove_clipping(&mut record).unwrap().unwrap();
        assert_eq!((summary.clip_5, summary.clip_3), (5, 0));
        assert_eq!(record.cigar().to_string(), "15M");
        assert_eq!(record.seq().as_bytes(), SEQ[5..].to_vec());
        assert_eq!(record.aux(b"ZA").unwrap(), Aux::I32(5));
        // stale 3' count from an earlier clipper is gone
        assert!(record.aux(b"ZB").is_err());
        assert_eq!(record.aux(b"ZC").unwrap(), Aux::Float(0.25));
        assert_eq!(record.aux(b"NM").unwrap(), Aux::U8(1));
        assert_eq!(
            record.aux_iter().filter(|a| a.as_ref().map_or(false, |(tag, _)| *tag == b"ZC")).count(),
            1
        );
    }

    #[test]
    fn test_unmapped_reads_pass_through() {
        let mut record = mapped_record(
            b"r1",
            vec![Cigar::SoftClip(5), Cigar::Match(15)],
            SEQ,
            100,
        );
        record.set_unmapped();

        assert_eq!(remove_clipping(&mut record).unwrap(), None);
        assert_eq!(record.cigar().to_string(), "5S15M");
        assert_eq!(record.seq().len(), 20);
    }

    #[test]
    fn test_normalizer_tallies() {
        let mut normalizer = ClippingNormalizer::new();
        let mut clipped = mapped_record(
            b"a",
            vec![Cigar::SoftClip(5), Cigar::Match(15)],
            SEQ,
            100,
        );
        let mut plain = mapped_record(b"b", vec![Cigar::Match(20)], SEQ, 100);

        normalizer.process(&mut clipped).unwrap();
        normalizer.process(&mut plain).unwrap();
        normalizer.process(&mut clipped).unwrap();

        assert_eq!(normalizer.total(), 3);
        assert_eq!(normalizer.altered(), 1);
    }
}
