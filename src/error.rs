//! Error types for ferro-predict
//!
//! Every failure surfaced by the orchestration core is a [`PredictError`].
//! Each variant carries the operation (and output type, where one applies)
//! that failed plus the upstream cause, so callers can both categorize the
//! failure via [`PredictError::kind`] and show a readable message.

use std::fmt;
use thiserror::Error;

use crate::backend::OutputType;

/// Coarse error categories, used by callers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credential rejected by the backend
    Authentication,
    /// Malformed request data (bad bounds, too many filters, bad page)
    BadRequest,
    /// A dependency (backend, annotation source, renderer) failed
    Upstream,
    /// A dependency did not answer within the configured time
    Timeout,
}

impl ErrorKind {
    /// Get the error kind as a stable snake_case string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Upstream => "upstream_error",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for ferro-predict operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// The backend rejected the caller's credential
    #[error("Invalid API key: {msg}")]
    Authentication { msg: String },

    /// Interval bounds are not a valid half-open range
    #[error("Invalid range {chromosome}:{start}-{end}: end must be greater than start")]
    InvalidRange {
        chromosome: String,
        start: i64,
        end: i64,
    },

    /// A request argument is outside what the backend accepts
    #[error("Invalid request: {msg}")]
    InvalidRequest { msg: String },

    /// Interval or variant prediction failed in the backend
    #[error("{operation} failed: {msg}")]
    Prediction {
        operation: &'static str,
        msg: String,
    },

    /// Variant scoring failed for one output type
    #[error("Variant scoring failed for {output_type}: {msg}")]
    Scoring { output_type: OutputType, msg: String },

    /// The reference annotation table could not be fetched or parsed
    #[error("Annotation build failed: {msg}")]
    AnnotationBuild { msg: String },

    /// A plot artifact could not be rendered or written
    #[error("Failed to generate plot for {output_type}: {msg}")]
    Plot { output_type: OutputType, msg: String },

    /// A dependency call exceeded its time budget
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    /// Scoring one output type exceeded the backend time budget
    #[error("Variant scoring for {output_type} timed out after {seconds}s")]
    ScoringTimeout { output_type: OutputType, seconds: u64 },
}

impl PredictError {
    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        PredictError::InvalidRequest { msg: msg.into() }
    }

    /// Create a prediction error for the named operation
    pub fn prediction(operation: &'static str, msg: impl Into<String>) -> Self {
        PredictError::Prediction {
            operation,
            msg: msg.into(),
        }
    }

    /// Create a scoring error for one output type
    pub fn scoring(output_type: OutputType, msg: impl Into<String>) -> Self {
        PredictError::Scoring {
            output_type,
            msg: msg.into(),
        }
    }

    /// Get the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictError::Authentication { .. } => ErrorKind::Authentication,
            PredictError::InvalidRange { .. } | PredictError::InvalidRequest { .. } => {
                ErrorKind::BadRequest
            }
            PredictError::Prediction { .. }
            | PredictError::Scoring { .. }
            | PredictError::AnnotationBuild { .. }
            | PredictError::Plot { .. } => ErrorKind::Upstream,
            PredictError::Timeout { .. } | PredictError::ScoringTimeout { .. } => {
                ErrorKind::Timeout
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = PredictError::InvalidRange {
            chromosome: "chr1".to_string(),
            start: 10,
            end: 10,
        };
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = PredictError::scoring(OutputType::Atac, "boom");
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.to_string(), "Variant scoring failed for ATAC: boom");

        let err = PredictError::Authentication {
            msg: "rejected".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_prediction_message_names_operation() {
        let err = PredictError::prediction("Variant prediction", "quota exceeded");
        assert_eq!(err.to_string(), "Variant prediction failed: quota exceeded");
    }

    #[test]
    fn test_timeout_kind() {
        let err = PredictError::Timeout {
            operation: "Interval prediction",
            seconds: 30,
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.kind().as_str(), "timeout");

        let err = PredictError::ScoringTimeout {
            output_type: OutputType::RnaSeq,
            seconds: 30,
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(
            err.to_string(),
            "Variant scoring for RNA_SEQ timed out after 30s"
        );
    }
}
