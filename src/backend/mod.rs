//! Prediction backend integration
//!
//! This module defines the contract the orchestrator needs from the remote
//! sequence-model service:
//! - credential validation
//! - interval prediction
//! - variant (REF/ALT) prediction
//! - variant scoring with an explicit scorer
//!
//! Two implementations are provided: [`HttpBackend`] talks to the remote
//! service over JSON/HTTP, and [`MockBackend`] produces deterministic
//! results in-process for tests and offline use.

use crate::genome::{Interval, Variant};
use crate::orchestrator::Credential;

pub mod http;
pub mod mock;
pub mod scorers;
pub mod types;

pub use http::{HttpBackend, HttpBackendConfig};
pub use mock::{BackendCall, MockBackend};
pub use scorers::{tidy_scores, AggregationType, ScoredGene, ScorerOutput, VariantScorer};
pub use types::{OutputType, PredictionOutput, TrackData, TrackMetadata, TrackStats, VariantOutput};

/// Failures reported by a backend implementation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("credential rejected: {0}")]
    Unauthorized(String),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Decode(String),

    #[error("output type {0} is not supported by this backend")]
    UnsupportedOutput(OutputType),
}

/// Trait for remote prediction services
#[async_trait::async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Check that an API key is accepted, without running a prediction
    async fn validate_api_key(&self, api_key: &str) -> Result<(), BackendError>;

    /// Predict the requested output types over an interval whose width is a
    /// supported sequence length
    async fn predict_interval(
        &self,
        credential: &Credential,
        interval: &Interval,
        requested_outputs: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<PredictionOutput, BackendError>;

    /// Predict REF and ALT tracks for a variant inside `interval`
    async fn predict_variant(
        &self,
        credential: &Credential,
        interval: &Interval,
        variant: &Variant,
        requested_outputs: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<VariantOutput, BackendError>;

    /// Score a variant with the given scorers, one output per scorer
    async fn score_variant(
        &self,
        credential: &Credential,
        interval: &Interval,
        variant: &Variant,
        scorers: &[VariantScorer],
    ) -> Result<Vec<ScorerOutput>, BackendError>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}
