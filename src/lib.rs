// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-predict: prediction orchestration for genomic sequence models
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! The crate sits between an interactive client and a remote sequence-model
//! backend. It fits requests to the backend's supported context windows,
//! annotates predictions with overlapping MANE Select transcripts, and turns
//! variant scores into a stable, paginated table.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ferro_predict::annotation::{AnnotationIndex, TranscriptIndex};
//! use ferro_predict::backend::{MockBackend, OutputType};
//! use ferro_predict::orchestrator::{validate_credential, Orchestrator};
//!
//! # tokio_test_block(async {
//! let backend = Arc::new(MockBackend::new());
//! let annotations = Arc::new(AnnotationIndex::preloaded(TranscriptIndex::default()));
//!
//! let credential = validate_credential(backend.as_ref(), "test-key").await.unwrap();
//! let orchestrator = Orchestrator::new(credential, backend, annotations);
//!
//! let prediction = orchestrator
//!     .predict_interval("chr19", 40_000_000, 40_100_000, &[OutputType::RnaSeq], &[])
//!     .await
//!     .unwrap();
//! assert_eq!(prediction.interval.width(), 131_072);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod annotation;
pub mod backend;
pub mod error;
pub mod genome;
pub mod orchestrator;
pub mod plot;
pub mod scores;
#[cfg(feature = "web-service")]
pub mod service;
pub mod window;

// Re-export commonly used types
pub use error::{ErrorKind, PredictError};
pub use genome::{Interval, Strand, Variant};
pub use orchestrator::{validate_credential, Credential, Orchestrator, OrchestratorConfig};
pub use scores::{paginate, Page, ScoreRecord};
pub use window::{label_for, select_window};

/// Result type alias for ferro-predict operations
pub type Result<T> = std::result::Result<T, PredictError>;
