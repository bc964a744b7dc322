//! Mock prediction backend for testing
//!
//! Produces small, deterministic track matrices and score tables, records
//! every call it receives, and can be told to reject keys, fail specific
//! operations or stall.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::scorers::{ScoredGene, ScorerOutput, VariantScorer};
use super::types::{OutputType, PredictionOutput, TrackData, TrackMetadata, VariantOutput};
use super::{BackendError, PredictionBackend};
use crate::genome::{Interval, Strand, Variant};
use crate::orchestrator::Credential;

/// Default ontology term used when a request names none
const DEFAULT_ONTOLOGY_TERM: &str = "UBERON:0002048";

/// A call received by the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    ValidateApiKey,
    PredictInterval {
        interval: Interval,
        outputs: Vec<OutputType>,
        ontology_terms: Vec<String>,
    },
    PredictVariant {
        interval: Interval,
        variant: Variant,
        outputs: Vec<OutputType>,
    },
    ScoreVariant {
        interval: Interval,
        variant: Variant,
        scorers: Vec<VariantScorer>,
    },
}

/// In-process backend returning synthetic predictions
pub struct MockBackend {
    rejected_keys: HashSet<String>,
    prediction_failure: Option<String>,
    scoring_failures: HashMap<OutputType, String>,
    genes: Vec<ScoredGene>,
    delay: Option<Duration>,
    calls: Mutex<Vec<BackendCall>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a backend that accepts every non-empty key
    pub fn new() -> Self {
        Self {
            rejected_keys: HashSet::new(),
            prediction_failure: None,
            scoring_failures: HashMap::new(),
            genes: vec![
                ScoredGene {
                    gene_id: "ENSG00000100342.21".to_string(),
                    gene_name: "APOL1".to_string(),
                    strand: Strand::Plus,
                },
                ScoredGene {
                    gene_id: "ENSG00000100336.18".to_string(),
                    gene_name: "APOL4".to_string(),
                    strand: Strand::Minus,
                },
            ],
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reject the given API key at validation time
    pub fn with_rejected_key(mut self, key: impl Into<String>) -> Self {
        self.rejected_keys.insert(key.into());
        self
    }

    /// Fail every interval and variant prediction with `msg`
    pub fn with_prediction_failure(mut self, msg: impl Into<String>) -> Self {
        self.prediction_failure = Some(msg.into());
        self
    }

    /// Fail scoring calls whose scorer reads `output_type`
    pub fn with_scoring_failure(mut self, output_type: OutputType, msg: impl Into<String>) -> Self {
        self.scoring_failures.insert(output_type, msg.into());
        self
    }

    /// Genes reported by gene-centric scorers
    pub fn with_genes(mut self, genes: Vec<ScoredGene>) -> Self {
        self.genes = genes;
        self
    }

    /// Sleep before answering any prediction or scoring call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of prediction and scoring calls (credential checks excluded)
    pub fn prediction_call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !matches!(c, BackendCall::ValidateApiKey))
            .count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_prediction_failure(&self) -> Result<(), BackendError> {
        match &self.prediction_failure {
            Some(msg) => Err(BackendError::Status {
                status: 500,
                message: msg.clone(),
            }),
            None => Ok(()),
        }
    }

    fn tracks_for(output_type: OutputType, ontology_terms: &[String]) -> Vec<TrackMetadata> {
        let default_terms = [DEFAULT_ONTOLOGY_TERM.to_string()];
        let terms = if ontology_terms.is_empty() {
            &default_terms[..]
        } else {
            ontology_terms
        };
        let strands: &[Strand] = if is_stranded(output_type) {
            &[Strand::Plus, Strand::Minus]
        } else {
            &[Strand::Unstranded]
        };

        let mut tracks = Vec::new();
        for term in terms {
            for strand in strands {
                tracks.push(TrackMetadata {
                    name: format!("{} {} {}", term, output_type, strand),
                    strand: *strand,
                    ontology_term: Some(term.clone()),
                    biosample_name: Some(format!("biosample {}", term)),
                });
            }
        }
        tracks
    }

    fn synthesize(
        output_type: OutputType,
        interval: &Interval,
        ontology_terms: &[String],
        scale: impl Fn(usize) -> f32,
    ) -> TrackData {
        let resolution: u32 = if output_type == OutputType::ContactMaps {
            2048
        } else {
            128
        };
        let rows = (interval.width() / u64::from(resolution)).max(1) as usize;
        let metadata = Self::tracks_for(output_type, ontology_terms);
        let values = (0..rows)
            .map(|i| {
                (0..metadata.len())
                    .map(|col| ((i as f32 * 0.05 + col as f32).sin().abs() + 0.1) * scale(i))
                    .collect()
            })
            .collect();
        TrackData {
            values,
            metadata,
            interval: interval.clone(),
            resolution,
        }
    }

    fn score(&self, scorer: &VariantScorer) -> ScorerOutput {
        let output_type = scorer.output_type();
        if scorer.is_gene_centric() {
            let tracks = Self::tracks_for(output_type, &[]);
            let tracks = if tracks.len() == 1 {
                vec![
                    TrackMetadata {
                        strand: Strand::Plus,
                        ..tracks[0].clone()
                    },
                    TrackMetadata {
                        strand: Strand::Minus,
                        ..tracks[0].clone()
                    },
                ]
            } else {
                tracks
            };
            let rows = self.genes.len().max(1);
            let raw_scores = (0..rows)
                .map(|g| (0..tracks.len()).map(|t| (g * 10 + t) as f32 * 0.1 - 0.5).collect())
                .collect();
            let quantile_scores = (0..rows)
                .map(|g| (0..tracks.len()).map(|t| ((g + t) as f32 * 0.25).min(1.0)).collect())
                .collect();
            ScorerOutput {
                scorer: *scorer,
                genes: self.genes.clone(),
                tracks,
                raw_scores,
                quantile_scores: Some(quantile_scores),
            }
        } else {
            let tracks: Vec<TrackMetadata> = ["CL:0000084", "UBERON:0000955", "EFO:0002067"]
                .iter()
                .map(|term| TrackMetadata {
                    name: format!("{} {}", term, output_type),
                    strand: Strand::Unstranded,
                    ontology_term: Some(term.to_string()),
                    biosample_name: Some(format!("biosample {}", term)),
                })
                .collect();
            let raw_scores = vec![(0..tracks.len()).map(|t| t as f32 * 0.2 - 0.1).collect()];
            ScorerOutput {
                scorer: *scorer,
                genes: Vec::new(),
                tracks,
                raw_scores,
                quantile_scores: None,
            }
        }
    }
}

/// Output types whose tracks come in +/- strand pairs
fn is_stranded(output_type: OutputType) -> bool {
    matches!(
        output_type,
        OutputType::RnaSeq
            | OutputType::Cage
            | OutputType::Procap
            | OutputType::SpliceSites
            | OutputType::SpliceSiteUsage
            | OutputType::SpliceJunctions
    )
}

#[async_trait::async_trait]
impl PredictionBackend for MockBackend {
    async fn validate_api_key(&self, api_key: &str) -> Result<(), BackendError> {
        self.record(BackendCall::ValidateApiKey);
        if api_key.trim().is_empty() {
            return Err(BackendError::Unauthorized("API key is empty".to_string()));
        }
        if self.rejected_keys.contains(api_key) {
            return Err(BackendError::Unauthorized("API key not valid".to_string()));
        }
        Ok(())
    }

    async fn predict_interval(
        &self,
        _credential: &Credential,
        interval: &Interval,
        requested_outputs: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<PredictionOutput, BackendError> {
        self.record(BackendCall::PredictInterval {
            interval: interval.clone(),
            outputs: requested_outputs.to_vec(),
            ontology_terms: ontology_terms.to_vec(),
        });
        self.stall().await;
        self.check_prediction_failure()?;

        let mut output = PredictionOutput::default();
        for ot in requested_outputs {
            output.insert(*ot, Self::synthesize(*ot, interval, ontology_terms, |_| 1.0));
        }
        Ok(output)
    }

    async fn predict_variant(
        &self,
        _credential: &Credential,
        interval: &Interval,
        variant: &Variant,
        requested_outputs: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<VariantOutput, BackendError> {
        self.record(BackendCall::PredictVariant {
            interval: interval.clone(),
            variant: variant.clone(),
            outputs: requested_outputs.to_vec(),
        });
        self.stall().await;
        self.check_prediction_failure()?;

        let mut output = VariantOutput::default();
        for ot in requested_outputs {
            let reference = Self::synthesize(*ot, interval, ontology_terms, |_| 1.0);
            let variant_row = ((variant.position() as i64 - 1 - interval.start())
                / i64::from(reference.resolution)) as usize;
            let alternate = Self::synthesize(*ot, interval, ontology_terms, |row| {
                if row.abs_diff(variant_row) <= 4 {
                    1.5
                } else {
                    1.0
                }
            });
            output.reference.insert(*ot, reference);
            output.alternate.insert(*ot, alternate);
        }
        Ok(output)
    }

    async fn score_variant(
        &self,
        _credential: &Credential,
        interval: &Interval,
        variant: &Variant,
        scorers: &[VariantScorer],
    ) -> Result<Vec<ScorerOutput>, BackendError> {
        self.record(BackendCall::ScoreVariant {
            interval: interval.clone(),
            variant: variant.clone(),
            scorers: scorers.to_vec(),
        });
        self.stall().await;

        let mut outputs = Vec::with_capacity(scorers.len());
        for scorer in scorers {
            if let Some(msg) = self.scoring_failures.get(&scorer.output_type()) {
                return Err(BackendError::Status {
                    status: 500,
                    message: msg.clone(),
                });
            }
            outputs.push(self.score(scorer));
        }
        Ok(outputs)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
