//! Variant scorers and score tidying
//!
//! Each output type has one recommended scorer. A scoring call returns a
//! [`ScorerOutput`]: a gene-by-track matrix of raw (and optionally quantile)
//! scores. [`tidy_scores`] flattens that matrix into one [`ScoreRecord`] per
//! (gene, track) cell, in row-major order.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{OutputType, TrackMetadata};
use crate::genome::Strand;
use crate::scores::ScoreRecord;

/// How REF and ALT predictions are combined inside a scoring mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationType {
    DiffMean,
    DiffSum,
    DiffSumLog2,
    DiffLog2Sum,
    L2Diff,
    ActiveMean,
    ActiveSum,
}

/// A variant scoring strategy understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantScorer {
    /// Aggregate the REF/ALT difference in a window centered on the variant
    CenterMask {
        requested_output: OutputType,
        width: Option<u32>,
        aggregation: AggregationType,
    },
    /// Log fold change of expression over each gene's exons
    GeneMaskLfc { requested_output: OutputType },
    /// Maximum splicing change within each gene
    GeneMaskSplicing {
        requested_output: OutputType,
        width: Option<u32>,
    },
    /// Change in predicted junction usage
    SpliceJunction,
    /// Change in local 3D contacts around the variant
    ContactMap,
}

impl VariantScorer {
    /// The recommended scorer for an output type
    pub fn recommended(output_type: OutputType) -> Self {
        match output_type {
            OutputType::Atac
            | OutputType::Cage
            | OutputType::Dnase
            | OutputType::ChipTf
            | OutputType::Procap => VariantScorer::CenterMask {
                requested_output: output_type,
                width: Some(501),
                aggregation: AggregationType::DiffLog2Sum,
            },
            OutputType::ChipHistone => VariantScorer::CenterMask {
                requested_output: output_type,
                width: Some(2001),
                aggregation: AggregationType::DiffLog2Sum,
            },
            OutputType::RnaSeq => VariantScorer::GeneMaskLfc {
                requested_output: output_type,
            },
            OutputType::SpliceSites | OutputType::SpliceSiteUsage => {
                VariantScorer::GeneMaskSplicing {
                    requested_output: output_type,
                    width: None,
                }
            }
            OutputType::SpliceJunctions => VariantScorer::SpliceJunction,
            OutputType::ContactMaps => VariantScorer::ContactMap,
        }
    }

    /// Output type this scorer reads
    pub fn output_type(&self) -> OutputType {
        match self {
            VariantScorer::CenterMask {
                requested_output, ..
            }
            | VariantScorer::GeneMaskLfc { requested_output }
            | VariantScorer::GeneMaskSplicing {
                requested_output, ..
            } => *requested_output,
            VariantScorer::SpliceJunction => OutputType::SpliceJunctions,
            VariantScorer::ContactMap => OutputType::ContactMaps,
        }
    }

    /// Whether scores are reported per gene (rows) rather than once per track
    pub fn is_gene_centric(&self) -> bool {
        matches!(
            self,
            VariantScorer::GeneMaskLfc { .. }
                | VariantScorer::GeneMaskSplicing { .. }
                | VariantScorer::SpliceJunction
        )
    }
}

impl fmt::Display for VariantScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantScorer::CenterMask {
                requested_output,
                width,
                aggregation,
            } => write!(
                f,
                "CenterMaskScorer(requested_output={}, width={}, aggregation_type={:?})",
                requested_output,
                width.map(|w| w.to_string()).unwrap_or_else(|| "None".to_string()),
                aggregation
            ),
            VariantScorer::GeneMaskLfc { requested_output } => {
                write!(f, "GeneMaskLFCScorer(requested_output={})", requested_output)
            }
            VariantScorer::GeneMaskSplicing {
                requested_output,
                width,
            } => write!(
                f,
                "GeneMaskSplicingScorer(requested_output={}, width={})",
                requested_output,
                width.map(|w| w.to_string()).unwrap_or_else(|| "None".to_string()),
            ),
            VariantScorer::SpliceJunction => write!(f, "SpliceJunctionScorer()"),
            VariantScorer::ContactMap => write!(f, "ContactMapScorer()"),
        }
    }
}

/// Gene a row of scores refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGene {
    pub gene_id: String,
    pub gene_name: String,
    #[serde(default)]
    pub strand: Strand,
}

/// Raw output of one scorer: rows are genes (or a single anonymous row for
/// scorers that are not gene-centric), columns are tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerOutput {
    pub scorer: VariantScorer,
    #[serde(default)]
    pub genes: Vec<ScoredGene>,
    pub tracks: Vec<TrackMetadata>,
    pub raw_scores: Vec<Vec<f32>>,
    #[serde(default)]
    pub quantile_scores: Option<Vec<Vec<f32>>>,
}

impl ScorerOutput {
    /// Number of score rows implied by the gene list
    fn expected_rows(&self) -> usize {
        self.genes.len().max(1)
    }

    fn check_shape(&self) -> Result<(), String> {
        let rows = self.expected_rows();
        let cols = self.tracks.len();
        let check = |name: &str, matrix: &[Vec<f32>]| -> Result<(), String> {
            if matrix.len() != rows {
                return Err(format!(
                    "{} has {} rows, expected {}",
                    name,
                    matrix.len(),
                    rows
                ));
            }
            if let Some(i) = matrix.iter().position(|row| row.len() != cols) {
                return Err(format!(
                    "{} row {} has {} columns, expected {}",
                    name,
                    i,
                    matrix[i].len(),
                    cols
                ));
            }
            Ok(())
        };
        check("raw_scores", &self.raw_scores)?;
        if let Some(quantiles) = &self.quantile_scores {
            check("quantile_scores", quantiles)?;
        }
        Ok(())
    }
}

/// Flatten a scorer output into score records
///
/// Records are emitted gene by gene, track by track. With
/// `match_gene_strand`, stranded tracks on the opposite strand of a
/// stranded gene are dropped. Missing quantiles are reported as 0.
pub fn tidy_scores(
    output: &ScorerOutput,
    match_gene_strand: bool,
) -> Result<Vec<ScoreRecord>, String> {
    output.check_shape()?;

    let output_type = output.scorer.output_type();
    let anonymous = ScoredGene {
        gene_id: String::new(),
        gene_name: String::new(),
        strand: Strand::Unstranded,
    };
    let genes: Vec<&ScoredGene> = if output.genes.is_empty() {
        vec![&anonymous]
    } else {
        output.genes.iter().collect()
    };

    let mut records = Vec::with_capacity(genes.len() * output.tracks.len());
    for (row, gene) in genes.iter().enumerate() {
        for (col, track) in output.tracks.iter().enumerate() {
            if match_gene_strand && !strands_compatible(gene.strand, track.strand) {
                continue;
            }
            let quantile = output
                .quantile_scores
                .as_ref()
                .map(|q| f64::from(q[row][col]))
                .unwrap_or(0.0);
            records.push(ScoreRecord {
                gene_name: gene.gene_name.clone(),
                gene_id: gene.gene_id.clone(),
                strand: track.strand,
                ontology_term: track.ontology_term.clone().unwrap_or_default(),
                biosample_name: track.biosample_name.clone().unwrap_or_default(),
                raw_score: f64::from(output.raw_scores[row][col]),
                quantile_score: quantile,
                output_type,
            });
        }
    }
    Ok(records)
}

fn strands_compatible(gene: Strand, track: Strand) -> bool {
    match (gene, track) {
        (Strand::Unstranded, _) | (_, Strand::Unstranded) => true,
        (g, t) => g == t,
    }
}
