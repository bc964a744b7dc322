//! Prediction orchestration
//!
//! An [`Orchestrator`] serves one request. It is built from a [`Credential`]
//! that was checked beforehand with [`validate_credential`], so every
//! orchestrator holds a key the backend has accepted.
//!
//! | Operation | Window | Backend call |
//! |-----------|--------|--------------|
//! | [`Orchestrator::predict_interval`] | smallest window containing the request | interval prediction |
//! | [`Orchestrator::predict_variant`] | smallest supported window | REF/ALT prediction |
//! | [`Orchestrator::score_variant`] | largest supported window | one scoring call per output type |

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::annotation::{AnnotationIndex, TranscriptRecord};
use crate::backend::{
    tidy_scores, BackendError, OutputType, PredictionBackend, PredictionOutput, VariantOutput,
    VariantScorer,
};
use crate::error::PredictError;
use crate::genome::{Interval, Variant};
use crate::scores::ScoreRecord;
use crate::window::{largest_window, select_window, smallest_window};
use crate::Result;

/// Most ontology filters a single prediction may carry
pub const MAX_ONTOLOGY_TERMS: usize = 5;

/// An API key the backend has accepted
#[derive(Clone)]
pub struct Credential {
    api_key: String,
}

impl Credential {
    pub(crate) fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// The raw key, for sending to the backend
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Check an API key against the backend
///
/// Surrounding whitespace is ignored. A rejected or unreachable key is an
/// authentication error.
pub async fn validate_credential(
    backend: &dyn PredictionBackend,
    api_key: &str,
) -> Result<Credential> {
    let api_key = api_key.trim();
    match backend.validate_api_key(api_key).await {
        Ok(()) => Ok(Credential::new(api_key)),
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, "API key rejected");
            Err(PredictError::Authentication { msg: e.to_string() })
        }
    }
}

/// Limits applied by the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time budget for each backend call
    pub backend_timeout: Duration,
    pub max_ontology_terms: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(300),
            max_ontology_terms: MAX_ONTOLOGY_TERMS,
        }
    }
}

/// Result of an interval prediction
#[derive(Debug, Clone)]
pub struct IntervalPrediction {
    pub output: PredictionOutput,
    /// The resized interval the backend actually predicted
    pub interval: Interval,
    /// Canonical transcripts overlapping `interval`
    pub transcripts: Vec<TranscriptRecord>,
}

/// Result of a variant prediction
#[derive(Debug, Clone)]
pub struct VariantPrediction {
    pub output: VariantOutput,
    pub variant: Variant,
    pub interval: Interval,
    pub transcripts: Vec<TranscriptRecord>,
}

/// Per-request prediction coordinator
pub struct Orchestrator {
    credential: Credential,
    backend: Arc<dyn PredictionBackend>,
    annotations: Arc<AnnotationIndex>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        credential: Credential,
        backend: Arc<dyn PredictionBackend>,
        annotations: Arc<AnnotationIndex>,
    ) -> Self {
        Self::with_config(credential, backend, annotations, OrchestratorConfig::default())
    }

    pub fn with_config(
        credential: Credential,
        backend: Arc<dyn PredictionBackend>,
        annotations: Arc<AnnotationIndex>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            credential,
            backend,
            annotations,
            config,
        }
    }

    /// Predict tracks over `[start, end)` on `chromosome`
    ///
    /// The interval is widened (or narrowed, past the largest window) to a
    /// supported sequence length around its midpoint before prediction.
    pub async fn predict_interval(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        output_types: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<IntervalPrediction> {
        let requested = Interval::new(chromosome, start, end)?;
        self.check_request(output_types, ontology_terms)?;

        let window = select_window(requested.width());
        let interval = requested.resize(window);
        tracing::debug!(
            requested = %requested,
            resized = %interval,
            window,
            "Selected sequence window"
        );

        const OPERATION: &str = "Prediction";
        let output = self
            .call_backend(
                OPERATION,
                self.backend.predict_interval(
                    &self.credential,
                    &interval,
                    output_types,
                    ontology_terms,
                ),
            )
            .await?;
        check_output(OPERATION, &output, output_types)?;

        let transcripts = self.annotations.extract(&interval).await?;

        Ok(IntervalPrediction {
            output,
            interval,
            transcripts,
        })
    }

    /// Predict REF and ALT tracks around a variant
    ///
    /// Always uses the smallest supported window.
    pub async fn predict_variant(
        &self,
        chromosome: &str,
        position: u64,
        reference_bases: &str,
        alternate_bases: &str,
        output_types: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<VariantPrediction> {
        let variant = Variant::new(chromosome, position, reference_bases, alternate_bases)?;
        self.check_request(output_types, ontology_terms)?;

        let interval = variant.reference_interval().resize(smallest_window());
        tracing::debug!(variant = %variant, interval = %interval, "Predicting variant effect");

        const OPERATION: &str = "Variant prediction";
        let output = self
            .call_backend(
                OPERATION,
                self.backend.predict_variant(
                    &self.credential,
                    &interval,
                    &variant,
                    output_types,
                    ontology_terms,
                ),
            )
            .await?;
        check_output(OPERATION, &output.reference, output_types)?;
        check_output(OPERATION, &output.alternate, output_types)?;

        let transcripts = self.annotations.extract(&interval).await?;

        Ok(VariantPrediction {
            output,
            variant,
            interval,
            transcripts,
        })
    }

    /// Score a variant with the recommended scorer of each output type
    ///
    /// Records are grouped by output type in request order. The first
    /// failing output type fails the whole call.
    pub async fn score_variant(
        &self,
        chromosome: &str,
        position: u64,
        reference_bases: &str,
        alternate_bases: &str,
        output_types: &[OutputType],
    ) -> Result<Vec<ScoreRecord>> {
        let variant = Variant::new(chromosome, position, reference_bases, alternate_bases)?;
        self.check_request(output_types, &[])?;

        let interval = variant.reference_interval().resize(largest_window());
        let mut records = Vec::new();

        for &output_type in output_types {
            let scorer = VariantScorer::recommended(output_type);
            tracing::debug!(variant = %variant, scorer = %scorer, "Scoring variant");

            let outputs = self
                .with_timeout(
                    |seconds| PredictError::ScoringTimeout {
                        output_type,
                        seconds,
                    },
                    self.backend.score_variant(
                        &self.credential,
                        &interval,
                        &variant,
                        std::slice::from_ref(&scorer),
                    ),
                )
                .await?
                .map_err(|e| PredictError::scoring(output_type, e.to_string()))?;

            if outputs.is_empty() {
                return Err(PredictError::scoring(
                    output_type,
                    "backend returned no scores",
                ));
            }

            for output in &outputs {
                let tidy = tidy_scores(output, true)
                    .map_err(|msg| PredictError::scoring(output_type, msg))?;
                records.extend(tidy.into_iter().map(|mut record| {
                    record.output_type = output_type;
                    record
                }));
            }
        }

        tracing::debug!(variant = %variant, records = records.len(), "Variant scored");
        Ok(records)
    }

    fn check_request(&self, output_types: &[OutputType], ontology_terms: &[String]) -> Result<()> {
        if output_types.is_empty() {
            return Err(PredictError::invalid_request(
                "at least one output type is required",
            ));
        }
        if ontology_terms.len() > self.config.max_ontology_terms {
            return Err(PredictError::invalid_request(format!(
                "at most {} ontology terms are allowed, got {}",
                self.config.max_ontology_terms,
                ontology_terms.len()
            )));
        }
        Ok(())
    }

    async fn with_timeout<T>(
        &self,
        on_timeout: impl FnOnce(u64) -> PredictError,
        call: impl Future<Output = std::result::Result<T, BackendError>>,
    ) -> Result<std::result::Result<T, BackendError>> {
        tokio::time::timeout(self.config.backend_timeout, call)
            .await
            .map_err(|_| on_timeout(self.config.backend_timeout.as_secs()))
    }

    async fn call_backend<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = std::result::Result<T, BackendError>>,
    ) -> Result<T> {
        self.with_timeout(|seconds| PredictError::Timeout { operation, seconds }, call)
            .await?
            .map_err(|e| PredictError::prediction(operation, e.to_string()))
    }
}

/// Every requested output type must be present with a consistent matrix
fn check_output(
    operation: &'static str,
    output: &PredictionOutput,
    requested: &[OutputType],
) -> Result<()> {
    for &output_type in requested {
        let data = output.get(output_type).ok_or_else(|| {
            PredictError::prediction(
                operation,
                format!("backend returned no data for {}", output_type),
            )
        })?;
        data.check_shape().map_err(|msg| {
            PredictError::prediction(operation, format!("{}: {}", output_type, msg))
        })?;
    }
    Ok(())
}
