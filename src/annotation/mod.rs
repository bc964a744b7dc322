//! Transcript annotation for prediction results
//!
//! The [`AnnotationIndex`] is a shared handle that builds its transcript
//! index on first use:
//!
//! 1. fetch the annotation table from its [`AnnotationSource`]
//! 2. keep protein-coding MANE Select transcripts, one per gene
//! 3. compile them into a [`TranscriptIndex`] for overlap queries
//!
//! Concurrent first callers wait for a single build attempt and share its
//! outcome, success or failure. A failed attempt is not cached: the first
//! caller to arrive after it starts a new one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};

use crate::error::PredictError;
use crate::genome::{Interval, Strand};

pub mod gtf;
pub mod index;
pub mod source;

pub use gtf::parse_gtf;
pub use index::TranscriptIndex;
pub use source::{
    open_reader, source_from_identifier, AnnotationSource, FileSource, StaticSource, UrlSource,
    DEFAULT_ANNOTATION_SOURCE,
};

/// A canonical transcript (0-based, half-open coordinates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub transcript_id: String,
    pub gene_id: String,
    pub gene_name: String,
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// Exon spans, sorted by start
    pub exons: Vec<(i64, i64)>,
}

/// Errors raised while fetching or parsing the annotation table
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnnotationError {
    #[error("failed to fetch annotation table: {0}")]
    Fetch(String),

    #[error("annotation source {url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed annotation at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("annotation fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("no annotation source configured")]
    NoSource,
}

impl From<AnnotationError> for PredictError {
    fn from(e: AnnotationError) -> Self {
        PredictError::AnnotationBuild { msg: e.to_string() }
    }
}

/// Shared, lazily built transcript index
pub struct AnnotationIndex {
    cell: OnceCell<Arc<TranscriptIndex>>,
    /// Held for the duration of a build; keeps the last failed attempt's error
    attempt: Mutex<Option<PredictError>>,
    /// Failed attempts so far
    failures: AtomicU64,
    source: Option<Arc<dyn AnnotationSource>>,
    fetch_timeout: Duration,
    builds: AtomicUsize,
}

impl AnnotationIndex {
    /// Create an unbuilt index that will load from `source`
    pub fn new(source: Arc<dyn AnnotationSource>, fetch_timeout: Duration) -> Self {
        Self {
            cell: OnceCell::new(),
            attempt: Mutex::new(None),
            failures: AtomicU64::new(0),
            source: Some(source),
            fetch_timeout,
            builds: AtomicUsize::new(0),
        }
    }

    /// Create an index that is already built and has no source
    pub fn preloaded(index: TranscriptIndex) -> Self {
        Self {
            cell: OnceCell::from(Arc::new(index)),
            attempt: Mutex::new(None),
            failures: AtomicU64::new(0),
            source: None,
            fetch_timeout: Duration::ZERO,
            builds: AtomicUsize::new(0),
        }
    }

    /// Whether the index has been built
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of build attempts started so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Identifier of the configured source, if any
    pub fn source_identifier(&self) -> Option<String> {
        self.source.as_ref().map(|s| s.identifier())
    }

    /// Drop the built index so the next use rebuilds it
    pub fn reset(&mut self) {
        self.cell = OnceCell::new();
        *self.attempt.get_mut() = None;
    }

    /// Build the index if needed and return it
    ///
    /// Callers that were waiting on an attempt that failed receive that
    /// attempt's error rather than starting another build.
    pub async fn ensure_ready(&self) -> Result<Arc<TranscriptIndex>, PredictError> {
        if let Some(index) = self.cell.get() {
            return Ok(Arc::clone(index));
        }

        let seen_failures = self.failures.load(Ordering::SeqCst);
        let mut last_failure = self.attempt.lock().await;

        if let Some(index) = self.cell.get() {
            return Ok(Arc::clone(index));
        }
        if self.failures.load(Ordering::SeqCst) != seen_failures {
            if let Some(e) = last_failure.as_ref() {
                return Err(e.clone());
            }
        }

        match self.build().await {
            Ok(index) => {
                // Only the lock holder builds, so the cell is still empty
                let _ = self.cell.set(Arc::clone(&index));
                Ok(index)
            }
            Err(e) => {
                *last_failure = Some(e.clone());
                self.failures.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Transcripts overlapping `interval`, building the index first if needed
    pub async fn extract(&self, interval: &Interval) -> Result<Vec<TranscriptRecord>, PredictError> {
        Ok(self.ensure_ready().await?.extract(interval))
    }

    async fn build(&self) -> Result<Arc<TranscriptIndex>, PredictError> {
        let source = self.source.as_ref().ok_or(AnnotationError::NoSource)?;
        self.builds.fetch_add(1, Ordering::SeqCst);

        let identifier = source.identifier();
        tracing::info!(source = %identifier, "Building transcript annotation index");
        let started = Instant::now();

        let result = self.fetch_and_parse(source.as_ref()).await;
        match result {
            Ok(records) => {
                let index = TranscriptIndex::from_records(records);
                tracing::info!(
                    source = %identifier,
                    transcripts = index.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Transcript annotation index ready"
                );
                Ok(Arc::new(index))
            }
            Err(e) => {
                tracing::warn!(source = %identifier, error = %e, "Annotation build failed");
                Err(e.into())
            }
        }
    }

    async fn fetch_and_parse(
        &self,
        source: &dyn AnnotationSource,
    ) -> Result<Vec<TranscriptRecord>, AnnotationError> {
        let bytes = if self.fetch_timeout.is_zero() {
            source.fetch().await?
        } else {
            tokio::time::timeout(self.fetch_timeout, source.fetch())
                .await
                .map_err(|_| AnnotationError::Timeout {
                    seconds: self.fetch_timeout.as_secs(),
                })??
        };

        tokio::task::spawn_blocking(move || parse_gtf(open_reader(bytes)))
            .await
            .map_err(|e| AnnotationError::Io(format!("annotation parser task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GTF: &str = "chr1\tHAVANA\ttranscript\t1001\t2000\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_type \"protein_coding\"; gene_name \"GENE1\"; transcript_type \"protein_coding\"; tag \"MANE_Select\";\n";

    struct FailingSource;

    #[async_trait::async_trait]
    impl AnnotationSource for FailingSource {
        fn identifier(&self) -> String {
            "failing".to_string()
        }

        async fn fetch(&self) -> Result<Vec<u8>, AnnotationError> {
            Err(AnnotationError::Fetch("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_lazy_build_from_static_source() {
        let annotations = AnnotationIndex::new(
            Arc::new(StaticSource::new("static", GTF)),
            Duration::from_secs(5),
        );
        assert!(!annotations.is_ready());

        let hits = annotations
            .extract(&Interval::new("chr1", 1500, 1600).unwrap())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].gene_name, "GENE1");
        assert!(annotations.is_ready());

        annotations.ensure_ready().await.unwrap();
        assert_eq!(annotations.build_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_reported_and_not_cached() {
        let annotations = AnnotationIndex::new(Arc::new(FailingSource), Duration::from_secs(5));
        let err = annotations.ensure_ready().await.unwrap_err();
        assert!(matches!(err, PredictError::AnnotationBuild { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert!(!annotations.is_ready());

        assert!(annotations.ensure_ready().await.is_err());
        assert_eq!(annotations.build_count(), 2);
    }

    #[tokio::test]
    async fn test_preloaded_and_reset() {
        let mut annotations = AnnotationIndex::preloaded(TranscriptIndex::default());
        assert!(annotations.is_ready());
        assert!(annotations.ensure_ready().await.unwrap().is_empty());

        annotations.reset();
        assert!(!annotations.is_ready());
        assert!(matches!(
            annotations.ensure_ready().await,
            Err(PredictError::AnnotationBuild { .. })
        ));
    }
}
