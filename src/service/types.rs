//! Request and response types for the prediction web service

use serde::{Deserialize, Serialize};

use crate::annotation::TranscriptRecord;
use crate::backend::{OutputType, TrackStats};
use crate::error::{ErrorKind, PredictError};
use crate::genome::{Interval, Strand, Variant};
use crate::scores::{ScoreRecord, DEFAULT_PAGE_SIZE};
use crate::window::label_for;

/// Request for an interval prediction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntervalPredictionRequest {
    /// Chromosome name (chr1-chr22, chrX, chrY)
    pub chromosome: String,
    /// Interval start
    pub start: i64,
    /// Interval end (must be greater than start)
    pub end: i64,
    /// Output types to predict
    pub output_types: Vec<OutputType>,
    /// Ontology terms (tissues or cell types) to restrict tracks to, at most 5
    #[serde(default)]
    pub ontology_terms: Vec<String>,
}

/// Request for a REF/ALT variant prediction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariantPredictionRequest {
    pub chromosome: String,
    /// 1-based variant position
    pub position: i64,
    #[serde(rename = "ref")]
    pub reference_bases: String,
    #[serde(rename = "alt")]
    pub alternate_bases: String,
    pub output_types: Vec<OutputType>,
    #[serde(default)]
    pub ontology_terms: Vec<String>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Request for variant scoring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariantScoreRequest {
    pub chromosome: String,
    pub position: i64,
    #[serde(rename = "ref")]
    pub reference_bases: String,
    #[serde(rename = "alt")]
    pub alternate_bases: String,
    pub output_types: Vec<OutputType>,
    /// 1-based page number (default: 1)
    #[serde(default = "default_page")]
    pub page: usize,
    /// Records per page (default: 50, max: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Request to check an API key
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

/// Resized interval actually sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalInfo {
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub width: u64,
    /// Window label (e.g. "128KB")
    pub sequence_length: String,
}

impl From<&Interval> for IntervalInfo {
    fn from(interval: &Interval) -> Self {
        Self {
            chromosome: interval.chromosome().to_string(),
            start: interval.start(),
            end: interval.end(),
            width: interval.width(),
            sequence_length: label_for(interval.width()),
        }
    }
}

/// Summary of one predicted track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub output_type: OutputType,
    pub track_name: String,
    pub strand: Strand,
    pub ontology_term: Option<String>,
    pub stats: Option<TrackStats>,
}

/// Gene overlapping the predicted interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptInfo {
    pub gene_name: String,
    pub gene_id: String,
    pub strand: Strand,
}

impl From<&TranscriptRecord> for TranscriptInfo {
    fn from(record: &TranscriptRecord) -> Self {
        Self {
            gene_name: record.gene_name.clone(),
            gene_id: record.gene_id.clone(),
            strand: record.strand,
        }
    }
}

/// Response for an interval prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalPredictionResponse {
    /// One plot reference per requested output type, in request order
    pub plot_urls: Vec<String>,
    pub interval: IntervalInfo,
    pub tracks: Vec<TrackInfo>,
    pub transcripts: Vec<TranscriptInfo>,
}

/// Variant as echoed back to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInfo {
    pub chromosome: String,
    pub position: u64,
    #[serde(rename = "ref")]
    pub reference_bases: String,
    #[serde(rename = "alt")]
    pub alternate_bases: String,
}

impl From<&Variant> for VariantInfo {
    fn from(variant: &Variant) -> Self {
        Self {
            chromosome: variant.chromosome().to_string(),
            position: variant.position(),
            reference_bases: variant.reference_bases().to_string(),
            alternate_bases: variant.alternate_bases().to_string(),
        }
    }
}

/// REF/ALT comparison summary for one output type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonInfo {
    pub output_type: OutputType,
    /// Genes near the variant (unique, at most 5)
    pub affected_genes: Vec<String>,
    pub summary: String,
}

/// Response for a variant prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantPredictionResponse {
    pub plot_urls: Vec<String>,
    pub variant: VariantInfo,
    pub interval: IntervalInfo,
    pub comparison: Vec<ComparisonInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Response for variant scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantScoreResponse {
    pub variant: VariantInfo,
    pub scores: Vec<ScoreRecord>,
    pub pagination: PaginationInfo,
}

/// Response for the API key check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub success: bool,
}

/// An output type and what it measures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTypeInfo {
    pub name: OutputType,
    pub description: String,
}

/// An ontology term clients can filter tracks by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyTermInfo {
    /// CURIE (e.g. "UBERON:0002048")
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTypesResponse {
    pub output_types: Vec<OutputTypeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyTermsResponse {
    pub terms: Vec<OntologyTermInfo>,
}

/// Query parameters for the ontology term listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OntologySearchQuery {
    /// Case-insensitive substring of the term name or code
    pub search: Option<String>,
}

/// Service liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" when the service answers
    pub status: String,
    /// Whether the transcript annotation index has been built
    pub annotations_ready: bool,
    pub backend: String,
    /// RFC 3339 time the check ran
    pub timestamp: String,
}

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<serde_json::Value>,
}

/// Service error types
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ServiceError {
    /// Convert to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthorized(_) => 401,
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Upstream(_) => 500,
            ServiceError::InternalError(_) => 500,
            ServiceError::ConfigError(_) => 500,
            ServiceError::Timeout(_) => 504,
        }
    }

    /// Convert to error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: match self {
                ServiceError::Unauthorized(_) => "authentication_error".to_string(),
                ServiceError::BadRequest(_) => "bad_request".to_string(),
                ServiceError::Upstream(_) => "upstream_error".to_string(),
                ServiceError::Timeout(_) => "timeout".to_string(),
                ServiceError::NotFound(_) => "not_found".to_string(),
                ServiceError::InternalError(_) => "internal_error".to_string(),
                ServiceError::ConfigError(_) => "config_error".to_string(),
            },
            message: self.to_string(),
            details: None,
        }
    }
}

impl From<PredictError> for ServiceError {
    fn from(e: PredictError) -> Self {
        let message = e.to_string();
        match e.kind() {
            ErrorKind::Authentication => ServiceError::Unauthorized(message),
            ErrorKind::BadRequest => ServiceError::BadRequest(message),
            ErrorKind::Upstream => ServiceError::Upstream(message),
            ErrorKind::Timeout => ServiceError::Timeout(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_info_labels_window() {
        let interval = Interval::new("chr19", 100, 131_172).unwrap();
        let info = IntervalInfo::from(&interval);
        assert_eq!(info.width, 131_072);
        assert_eq!(info.sequence_length, "128KB");
    }

    #[test]
    fn test_variant_request_uses_ref_alt_names() {
        let request: VariantScoreRequest = serde_json::from_str(
            r#"{"chromosome":"chr22","position":36201698,"ref":"A","alt":"C","output_types":["RNA_SEQ"]}"#,
        )
        .unwrap();
        assert_eq!(request.reference_bases, "A");
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 50);
    }

    #[test]
    fn test_predict_error_status_mapping() {
        let auth: ServiceError = PredictError::Authentication {
            msg: "nope".to_string(),
        }
        .into();
        assert_eq!(auth.status_code(), 401);
        assert_eq!(auth.to_string(), "Invalid API key: nope");

        let upstream: ServiceError = PredictError::prediction("Prediction", "boom").into();
        assert_eq!(upstream.status_code(), 500);
        assert_eq!(upstream.to_response().message, "Prediction failed: boom");

        let timeout: ServiceError = PredictError::Timeout {
            operation: "Prediction",
            seconds: 1,
        }
        .into();
        assert_eq!(timeout.status_code(), 504);
        assert_eq!(timeout.to_response().error, "timeout");
    }
}
