//! Frequency distributions of per-read values.
//!
//! A distribution tallies either a literal two-character aux tag (`NM`, `AS`, `IH`, ...)
//! or one of the derived values `LENGTH` (alias `LEN`), `MAPQ` and `MISMATCH`.

use crate::alignment_record::{aux_as_i64, mismatch_count};
use rust_htslib::bam::record::Aux;
use rust_htslib::bam::Record;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum TagError {
    InvalidRequest(String),
    MissingTag { tag: String, read: String },
    MissingEditDistance { read: String },
    UnsupportedType { tag: String, read: String },
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::InvalidRequest(request) => write!(
                f,
                "Invalid tag request '{}': expected a two-character tag, LENGTH, MAPQ or MISMATCH, optionally followed by ':+' or ':-'",
                request
            ),
            TagError::MissingTag { tag, read } => {
                write!(f, "Read '{}' is missing the requested tag {}", read, tag)
            }
            TagError::MissingEditDistance { read } => write!(
                f,
                "Read '{}' has no NM tag; MISMATCH needs the edit distance",
                read
            ),
            TagError::UnsupportedType { tag, read } => {
                write!(f, "Tag {} on read '{}' holds an array value", tag, read)
            }
        }
    }
}

impl std::error::Error for TagError {}

/// What a distribution measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Length,
    Mapq,
    Mismatch,
    Aux([u8; 2]),
}

/// A single parsed entry of a `--tags` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRequest {
    pub name: String,
    pub kind: TagKind,
    pub ascending: bool,
}

impl TagRequest {
    /// Parse `name`, `name:+` or `name:-`
    pub fn parse(request: &str) -> Result<Self, TagError> {
        let invalid = || TagError::InvalidRequest(request.to_string());

        let (name, ascending) = match request.split_once(':') {
            None => (request, true),
            Some((name, "+")) => (name, true),
            Some((name, "-")) => (name, false),
            Some(_) => return Err(invalid()),
        };

        let kind = match name {
            "LENGTH" | "LEN" => TagKind::Length,
            "MAPQ" => TagKind::Mapq,
            "MISMATCH" => TagKind::Mismatch,
            _ => match name.as_bytes() {
                &[a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphanumeric() => {
                    TagKind::Aux([a, b])
                }
                _ => return Err(invalid()),
            },
        };

        Ok(TagRequest {
            name: name.to_string(),
            kind,
            ascending,
        })
    }

    /// Parse a comma-separated list of requests
    pub fn parse_list(list: &str) -> Result<Vec<Self>, TagError> {
        list.split(',')
            .filter(|s| !s.is_empty())
            .map(TagRequest::parse)
            .collect()
    }
}

/// An observed value. Numbers sort before text; integers and floats compare numerically.
#[derive(Debug, Clone)]
pub enum TagValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
            TagValue::Text(_) => None,
        }
    }

    fn from_aux(aux: &Aux) -> Option<Self> {
        if let Some(v) = aux_as_i64(aux) {
            return Some(TagValue::Int(v));
        }
        match aux {
            Aux::Float(v) => Some(TagValue::Float(*v as f64)),
            Aux::Double(v) => Some(TagValue::Float(*v)),
            Aux::Char(c) => Some(TagValue::Text((*c as char).to_string())),
            Aux::String(s) | Aux::HexByteArray(s) => Some(TagValue::Text(s.to_string())),
            _ => None,
        }
    }
}

impl Ord for TagValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TagValue::Int(a), TagValue::Int(b)) => a.cmp(b),
            (TagValue::Float(a), TagValue::Float(b)) => a.total_cmp(b),
            (TagValue::Int(a), TagValue::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (TagValue::Float(a), TagValue::Int(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (TagValue::Text(a), TagValue::Text(b)) => a.cmp(b),
            (TagValue::Text(_), _) => Ordering::Greater,
            (_, TagValue::Text(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for TagValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TagValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TagValue {}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(v) => write!(f, "{}", v),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Histogram of the values one [`TagRequest`] takes across reads
pub struct TagDistribution {
    request: TagRequest,
    bins: BTreeMap<TagValue, u64>,
    min: Option<TagValue>,
    max: Option<TagValue>,
    numeric_sum: f64,
    numeric_count: u64,
}

impl TagDistribution {
    pub fn new(request: TagRequest) -> Self {
        TagDistribution {
            request,
            bins: BTreeMap::new(),
            min: None,
            max: None,
            numeric_sum: 0.0,
            numeric_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.request.name
    }

    /// Resolve the value this distribution tracks for one read
    pub fn value_of(&self, record: &Record) -> Result<TagValue, TagError> {
        let read_name = || String::from_utf8_lossy(record.qname()).into_owned();
        match self.request.kind {
            TagKind::Length => Ok(TagValue::Int(record.seq_len() as i64)),
            TagKind::Mapq => Ok(TagValue::Int(record.mapq() as i64)),
            TagKind::Mismatch => mismatch_count(record)
                .map(TagValue::Int)
                .ok_or_else(|| TagError::MissingEditDistance { read: read_name() }),
            TagKind::Aux(tag) => {
                let aux = record.aux(&tag).map_err(|_| TagError::MissingTag {
                    tag: self.request.name.clone(),
                    read: read_name(),
                })?;
                TagValue::from_aux(&aux).ok_or_else(|| TagError::UnsupportedType {
                    tag: self.request.name.clone(),
                    read: read_name(),
                })
            }
        }
    }

    pub fn add(&mut self, record: &Record) -> Result<(), TagError> {
        let value = self.value_of(record)?;
        self.add_value(value);
        Ok(())
    }

    pub fn add_value(&mut self, value: TagValue) {
        if let Some(v) = value.as_f64() {
            self.numeric_sum += v;
            self.numeric_count += 1;
        }
        if self.min.as_ref().map_or(true, |min| value < *min) {
            self.min = Some(value.clone());
        }
        if self.max.as_ref().map_or(true, |max| value > *max) {
            self.max = Some(value.clone());
        }
        *self.bins.entry(value).or_insert(0) += 1;
    }

    /// Mean over numeric observations; `None` if there were none
    pub fn mean(&self) -> Option<f64> {
        if self.numeric_count == 0 {
            None
        } else {
            Some(self.numeric_sum / self.numeric_count as f64)
        }
    }

    pub fn min(&self) -> Option<&TagValue> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&TagValue> {
        self.max.as_ref()
    }

    /// Number of reads tallied
    pub fn count(&self) -> u64 {
        self.bins.values().sum()
    }

    /// Distinct values with their counts, in the requested sort direction
    pub fn iter(&self) -> impl Iterator<Item = (&TagValue, u64)> + '_ {
        let mut entries: Vec<(&TagValue, u64)> =
            self.bins.iter().map(|(value, count)| (value, *count)).collect();
        if !self.request.ascending {
            entries.reverse();
        }
        entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_record::tests::mapped_record;
    use rust_htslib::bam::record::Cigar;

    fn filled(request: &str, values: &[i64]) -> TagDistribution {
        let mut dist = TagDistribution::new(TagRequest::parse(request).unwrap());
        for v in values {
            dist.add_value(TagValue::Int(*v));
        }
        dist
    }

    #[test]
    fn test_parse_requests() {
        let requests = TagRequest::parse_list("IH,LENGTH:-,MAPQ:+,LEN,MISMATCH").unwrap();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0].kind, TagKind::Aux(*b"IH"));
        assert!(requests[0].ascending);
        assert_eq!(requests[1].kind, TagKind::Length);
        assert!(!requests[1].ascending);
        assert_eq!(requests[2].kind, TagKind::Mapq);
        assert_eq!(requests[3].kind, TagKind::Length);
        assert_eq!(requests[3].name, "LEN");
        assert_eq!(requests[4].kind, TagKind::Mismatch);

        assert!(TagRequest::parse("NMX").is_err());
        assert!(TagRequest::parse("NM:x").is_err());
        assert!(TagRequest::parse("1M").is_err());
    }

    #[test]
    fn test_mean_max_and_order() {
        let dist = filled("XX", &[1, 1, 2, 3]);
        assert_eq!(dist.mean(), Some(1.75));
        assert_eq!(dist.max(), Some(&TagValue::Int(3)));
        assert_eq!(dist.min(), Some(&TagValue::Int(1)));
        assert_eq!(dist.count(), 4);

        let ascending: Vec<(String, u64)> =
            dist.iter().map(|(v, c)| (v.to_string(), c)).collect();
        assert_eq!(
            ascending,
            vec![("1".to_string(), 2), ("2".to_string(), 1), ("3".to_string(), 1)]
        );

        let descending = filled("XX:-", &[1, 1, 2, 3]);
        let values: Vec<(String, u64)> =
            descending.iter().map(|(v, c)| (v.to_string(), c)).collect();
        assert_eq!(
            values,
            vec![("3".to_string(), 1), ("2".to_string(), 1), ("1".to_string(), 2)]
        );

        // iteration does not consume the distribution
        assert_eq!(descending.iter().count(), 3);
    }

    #[test]
    fn test_mean_skips_text_values() {
        let mut dist = TagDistribution::new(TagRequest::parse("XS").unwrap());
        dist.add_value(TagValue::Text("abc".to_string()));
        assert_eq!(dist.mean(), None);
        dist.add_value(TagValue::Int(4));
        dist.add_value(TagValue::Float(2.0));
        assert_eq!(dist.mean(), Some(3.0));
        assert_eq!(dist.max(), Some(&TagValue::Text("abc".to_string())));
    }

    #[test]
    fn test_value_ordering() {
        assert!(TagValue::Int(2) < TagValue::Float(2.5));
        assert!(TagValue::Float(1.5) < TagValue::Int(2));
        assert!(TagValue::Int(2) < TagValue::Float(2.0));
        assert!(TagValue::Float(1e9) < TagValue::Text("a".to_string()));
    }

    #[test]
    fn test_values_from_records() {
        let mut record = mapped_record(b"r1", vec![Cigar::SoftClip(2), Cigar::Match(6)], b"ACGTACGT", 5);
        record.set_mapq(37);
        record.push_aux(b"NM", Aux::U8(1)).unwrap();
        record.push_aux(b"XT", Aux::Char(b'U')).unwrap();

        let mut length = TagDistribution::new(TagRequest::parse("LENGTH").unwrap());
        length.add(&record).unwrap();
        assert_eq!(length.max(), Some(&TagValue::Int(8)));

        let mapq = TagDistribution::new(TagRequest::parse("MAPQ").unwrap());
        assert_eq!(mapq.value_of(&record), Ok(TagValue::Int(37)));

        let nm = TagDistribution::new(TagRequest::parse("NM").unwrap());
        assert_eq!(nm.value_of(&record), Ok(TagValue::Int(1)));

        let mismatch = TagDistribution::new(TagRequest::parse("MISMATCH").unwrap());
        assert_eq!(mismatch.value_of(&record), Ok(TagValue::Int(1)));

        let xt = TagDistribution::new(TagRequest::parse("XT").unwrap());
        assert_eq!(xt.value_of(&record), Ok(TagValue::Text("U".to_string())));
    }

    #[test]
    fn test_missing_tags_are_errors() {
        let record = mapped_record(b"r1", vec![Cigar::Match(4)], b"ACGT", 5);

        let mut ih = TagDistribution::new(TagRequest::parse("IH").unwrap());
        assert_eq!(
            ih.add(&record),
            Err(TagError::MissingTag {
                tag: "IH".to_string(),
                read: "r1".to_string()
            })
        );
        assert_eq!(ih.count(), 0);

        let mismatch = TagDistribution::new(TagRequest::parse("MISMATCH").unwrap());
        assert_eq!(
            mismatch.value_of(&record),
            Err(TagError::MissingEditDistance {
                read: "r1".to_string()
            })
        );
    }
}
