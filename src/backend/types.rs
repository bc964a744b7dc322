//! Backend result types
//!
//! A [`PredictionOutput`] maps each requested [`OutputType`] to its
//! [`TrackData`]. Lookups go through the enum key, so callers never need to
//! know how the backend names its result fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::genome::{Interval, Strand};

/// Genomic signal categories the backend can predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputType {
    Atac,
    Cage,
    Dnase,
    RnaSeq,
    ChipHistone,
    ChipTf,
    SpliceSites,
    SpliceSiteUsage,
    SpliceJunctions,
    ContactMaps,
    Procap,
}

impl OutputType {
    /// Get the wire name (e.g. "RNA_SEQ")
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Atac => "ATAC",
            OutputType::Cage => "CAGE",
            OutputType::Dnase => "DNASE",
            OutputType::RnaSeq => "RNA_SEQ",
            OutputType::ChipHistone => "CHIP_HISTONE",
            OutputType::ChipTf => "CHIP_TF",
            OutputType::SpliceSites => "SPLICE_SITES",
            OutputType::SpliceSiteUsage => "SPLICE_SITE_USAGE",
            OutputType::SpliceJunctions => "SPLICE_JUNCTIONS",
            OutputType::ContactMaps => "CONTACT_MAPS",
            OutputType::Procap => "PROCAP",
        }
    }

    /// Parse a wire name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|ot| ot.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Human-readable description shown by the metadata endpoint
    pub fn description(&self) -> &'static str {
        match self {
            OutputType::Atac => "ATAC-seq chromatin accessibility",
            OutputType::Cage => "CAGE transcription start sites",
            OutputType::Dnase => "DNase-seq chromatin accessibility",
            OutputType::RnaSeq => "RNA sequencing gene expression",
            OutputType::ChipHistone => "ChIP-seq histone modifications",
            OutputType::ChipTf => "ChIP-seq transcription factors",
            OutputType::SpliceSites => "Splice site predictions",
            OutputType::SpliceSiteUsage => "Splice site usage",
            OutputType::SpliceJunctions => "Splice junctions",
            OutputType::ContactMaps => "3D chromatin contacts",
            OutputType::Procap => "PRO-cap nascent transcription",
        }
    }

    /// All output types, in declaration order
    pub fn all() -> &'static [OutputType] {
        &[
            OutputType::Atac,
            OutputType::Cage,
            OutputType::Dnase,
            OutputType::RnaSeq,
            OutputType::ChipHistone,
            OutputType::ChipTf,
            OutputType::SpliceSites,
            OutputType::SpliceSiteUsage,
            OutputType::SpliceJunctions,
            OutputType::ContactMaps,
            OutputType::Procap,
        ]
    }

    /// Lowercase form used in artifact names (e.g. "rna_seq")
    pub fn file_suffix(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-track (per-column) metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track name (e.g. "UBERON:0002048 polyA plus RNA-seq")
    pub name: String,
    #[serde(default)]
    pub strand: Strand,
    /// Ontology term (tissue or cell type) this track was measured in
    #[serde(default)]
    pub ontology_term: Option<String>,
    #[serde(default)]
    pub biosample_name: Option<String>,
}

/// Summary statistics of one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Predicted values for one output type
///
/// `values` is row-major: one row per genomic bin (of `resolution` bases),
/// one column per track described in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub values: Vec<Vec<f32>>,
    pub metadata: Vec<TrackMetadata>,
    pub interval: Interval,
    /// Bases per row
    pub resolution: u32,
}

impl TrackData {
    /// Number of tracks (columns)
    pub fn num_tracks(&self) -> usize {
        self.metadata.len()
    }

    /// Number of genomic bins (rows)
    pub fn num_positions(&self) -> usize {
        self.values.len()
    }

    /// Check that every row has one value per track
    pub fn check_shape(&self) -> Result<(), String> {
        let expected = self.metadata.len();
        match self.values.iter().position(|row| row.len() != expected) {
            Some(i) => Err(format!(
                "row {} has {} values but {} tracks are described",
                i,
                self.values[i].len(),
                expected
            )),
            None => Ok(()),
        }
    }

    /// Iterate over the values of one track
    pub fn column(&self, track: usize) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().filter_map(move |row| row.get(track).copied())
    }

    /// Min/max/mean of one track, or `None` for an unknown or empty track
    pub fn stats(&self, track: usize) -> Option<TrackStats> {
        if track >= self.num_tracks() {
            return None;
        }
        let mut count = 0usize;
        let mut sum = 0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in self.column(track).map(f64::from) {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return None;
        }
        Some(TrackStats {
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

/// Result of an interval prediction, keyed by output type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub tracks: BTreeMap<OutputType, TrackData>,
}

impl PredictionOutput {
    /// Track data for one output type
    pub fn get(&self, output_type: OutputType) -> Option<&TrackData> {
        self.tracks.get(&output_type)
    }

    /// Insert (or replace) the tracks of one output type
    pub fn insert(&mut self, output_type: OutputType, data: TrackData) {
        self.tracks.insert(output_type, data);
    }

    /// Output types present in this result
    pub fn output_types(&self) -> impl Iterator<Item = OutputType> + '_ {
        self.tracks.keys().copied()
    }
}

/// REF and ALT predictions for a variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantOutput {
    pub reference: PredictionOutput,
    pub alternate: PredictionOutput,
}

impl VariantOutput {
    /// REF and ALT track data for one output type, if both are present
    pub fn pair(&self, output_type: OutputType) -> Option<(&TrackData, &TrackData)> {
        Some((
            self.reference.get(output_type)?,
            self.alternate.get(output_type)?,
        ))
    }
}
