//! Region selectors given on the command line.
//!
//! Regions are written 1-based and inclusive (`chr1:100-200`, or `chr1:100` for a
//! single base) and stored 0-based half-open, the way htslib fetches them.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, PartialEq)]
pub enum RegionError {
    InvalidFormat(String),
    InvalidCoordinate(String),
    EmptyRange(String),
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::InvalidFormat(s) => write!(
                f,
                "Invalid region '{}': expected `ref:start-end` or `ref:start`",
                s
            ),
            RegionError::InvalidCoordinate(s) => {
                write!(f, "Invalid region '{}': coordinates are 1-based and must be positive", s)
            }
            RegionError::EmptyRange(s) => {
                write!(f, "Invalid region '{}': start must not be after end", s)
            }
        }
    }
}

impl std::error::Error for RegionError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    /// 0-based, inclusive
    pub start: i64,
    /// 0-based, exclusive
    pub end: i64,
}

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+):([0-9,]+)(?:-([0-9,]+))?$").unwrap())
}

fn parse_coordinate(text: &str, region: &str) -> Result<i64, RegionError> {
    text.replace(',', "")
        .parse::<i64>()
        .map_err(|_| RegionError::InvalidCoordinate(region.to_string()))
}

impl Region {
    pub fn parse(region: &str) -> Result<Self, RegionError> {
        let caps = region_pattern()
            .captures(region)
            .ok_or_else(|| RegionError::InvalidFormat(region.to_string()))?;

        let name = caps[1].to_string();
        let start = parse_coordinate(&caps[2], region)?;
        if start < 1 {
            return Err(RegionError::InvalidCoordinate(region.to_string()));
        }

        let end = match caps.get(3) {
            Some(end) => parse_coordinate(end.as_str(), region)?,
            None => start,
        };
        if end < start {
            return Err(RegionError::EmptyRange(region.to_string()));
        }

        Ok(Region {
            name,
            start: start - 1,
            end,
        })
    }
}

impl fmt::Display for Region {
    /// Formats back in 1-based notation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end - self.start == 1 {
            write!(f, "{}:{}", self.name, self.start + 1)
        } else {
            write!(f, "{}:{}-{}", self.name, self.start + 1, self.end)
        }
    }
}
