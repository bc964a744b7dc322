//! Genomic coordinates used throughout the orchestration layer
//!
//! All intervals are 0-based, half-open `[start, end)`, matching what the
//! prediction backend expects. Variant positions are 1-based, as in VCF.
//!
//! | Type | Basis | Notes |
//! |------|-------|-------|
//! | [`Interval`] | 0-based half-open | `width = end - start` |
//! | [`Variant::position`] | 1-based | reference interval is `[position-1, position)` |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PredictError;

/// Largest absolute coordinate accepted (2^40), far past any chromosome
///
/// Bounding coordinates keeps resizing arithmetic well inside `i64`.
pub const MAX_COORDINATE: i64 = 1 << 40;

/// Strand of a transcript or track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    #[default]
    Plus,
    #[serde(rename = "-")]
    Minus,
    /// Unstranded data
    #[serde(rename = ".")]
    Unstranded,
}

impl Strand {
    /// Parse a strand symbol; anything other than `+` or `-` is unstranded
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "+" => Strand::Plus,
            "-" => Strand::Minus,
            _ => Strand::Unstranded,
        }
    }

    /// Get the strand symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Unstranded => ".",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A genomic interval (0-based, half-open)
///
/// Intervals are immutable; [`Interval::resize`] returns a new interval.
/// Resized intervals may start below zero near chromosome starts, which is
/// why coordinates are signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    chromosome: String,
    start: i64,
    end: i64,
}

impl Interval {
    /// Create an interval, rejecting empty, inverted or out-of-range bounds
    pub fn new(chromosome: impl Into<String>, start: i64, end: i64) -> Result<Self, PredictError> {
        let chromosome = chromosome.into();
        if start < -MAX_COORDINATE || end > MAX_COORDINATE {
            return Err(PredictError::invalid_request(format!(
                "interval {}:{}-{} is outside the supported coordinate range (±{})",
                chromosome, start, end, MAX_COORDINATE
            )));
        }
        if end <= start {
            return Err(PredictError::InvalidRange {
                chromosome,
                start,
                end,
            });
        }
        Ok(Self {
            chromosome,
            start,
            end,
        })
    }

    /// Chromosome name (e.g. "chr19")
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Start position (0-based, inclusive)
    pub fn start(&self) -> i64 {
        self.start
    }

    /// End position (0-based, exclusive)
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Number of bases covered
    pub fn width(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    /// Midpoint used for resizing (floor of `(start + end) / 2`)
    pub fn center(&self) -> i64 {
        self.start + (self.end - self.start) / 2
    }

    /// Return a new interval of `width` bases centered on this one
    ///
    /// `new_start = center - width / 2` and `new_end = new_start + width`, so
    /// the result is reproducible for a given input regardless of whether
    /// the interval grows or shrinks.
    ///
    /// Widths are clamped to `[1, MAX_COORDINATE]`.
    pub fn resize(&self, width: u64) -> Interval {
        let width = width.clamp(1, MAX_COORDINATE as u64) as i64;
        let start = self.center() - width / 2;
        Interval {
            chromosome: self.chromosome.clone(),
            start,
            end: start + width,
        }
    }

    /// Whether this interval shares at least one base with `[start, end)`
    /// on the same chromosome
    pub fn overlaps(&self, chromosome: &str, start: i64, end: i64) -> bool {
        self.chromosome == chromosome && start < self.end && end > self.start
    }

    /// Whether a 0-based position falls inside the interval
    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// A point variant (1-based position, VCF style alleles)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    chromosome: String,
    position: u64,
    reference_bases: String,
    alternate_bases: String,
}

impl Variant {
    /// Create a variant; the position must be 1-based and alleles non-empty
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        reference_bases: impl Into<String>,
        alternate_bases: impl Into<String>,
    ) -> Result<Self, PredictError> {
        let reference_bases = reference_bases.into();
        let alternate_bases = alternate_bases.into();
        if position == 0 {
            return Err(PredictError::invalid_request(
                "variant position must be 1-based (greater than 0)",
            ));
        }
        if position > MAX_COORDINATE as u64 {
            return Err(PredictError::invalid_request(format!(
                "variant position {} is outside the supported coordinate range (max {})",
                position, MAX_COORDINATE
            )));
        }
        if reference_bases.is_empty() || alternate_bases.is_empty() {
            return Err(PredictError::invalid_request(
                "reference and alternate alleles must not be empty",
            ));
        }
        Ok(Self {
            chromosome: chromosome.into(),
            position,
            reference_bases,
            alternate_bases,
        })
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn reference_bases(&self) -> &str {
        &self.reference_bases
    }

    pub fn alternate_bases(&self) -> &str {
        &self.alternate_bases
    }

    /// The single-base interval `[position - 1, position)` anchored at the variant
    pub fn reference_interval(&self) -> Interval {
        let start = self.position as i64 - 1;
        Interval {
            chromosome: self.chromosome.clone(),
            start,
            end: start + 1,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}>{}",
            self.chromosome, self.position, self.reference_bases, self.alternate_bases
        )
    }
}
