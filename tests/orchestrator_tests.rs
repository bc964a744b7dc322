//! Integration tests for the prediction orchestrator
//!
//! These run the orchestrator end to end against the mock backend and a
//! small in-memory transcript index.

use std::sync::Arc;
use std::time::Duration;

use ferro_predict::annotation::{AnnotationIndex, TranscriptIndex, TranscriptRecord};
use ferro_predict::backend::{BackendCall, MockBackend, OutputType, VariantScorer};
use ferro_predict::{
    paginate, validate_credential, ErrorKind, Orchestrator, OrchestratorConfig, PredictError,
    Strand,
};

// ==================== Fixtures ====================

fn transcript(id: &str, gene: &str, chromosome: &str, start: i64, end: i64) -> TranscriptRecord {
    TranscriptRecord {
        transcript_id: id.to_string(),
        gene_id: format!("ENSG_{}", gene),
        gene_name: gene.to_string(),
        chromosome: chromosome.to_string(),
        start,
        end,
        strand: Strand::Plus,
        exons: vec![(start, start + 200), (end - 200, end)],
    }
}

fn annotations() -> Arc<AnnotationIndex> {
    Arc::new(AnnotationIndex::preloaded(TranscriptIndex::from_records(
        vec![
            transcript("ENST01", "APOL1", "chr22", 36_253_000, 36_267_000),
            transcript("ENST02", "APOL2", "chr22", 36_226_000, 36_240_000),
            transcript("ENST03", "FAR", "chr22", 40_000_000, 40_010_000),
            transcript("ENST04", "OTHER", "chr19", 36_250_000, 36_260_000),
        ],
    )))
}

async fn orchestrator(backend: Arc<MockBackend>) -> Orchestrator {
    let credential = validate_credential(backend.as_ref(), "test-key").await.unwrap();
    Orchestrator::new(credential, backend, annotations())
}

// ==================== Interval Predictions ====================

#[tokio::test]
async fn test_interval_resized_to_smallest_containing_window() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;

    let prediction = orchestrator
        .predict_interval(
            "chr22",
            36_200_000,
            36_300_000,
            &[OutputType::RnaSeq, OutputType::Atac],
            &[],
        )
        .await
        .unwrap();

    // 100kb fits the 128KB window, centered on the request midpoint
    assert_eq!(prediction.interval.width(), 131_072);
    assert_eq!(prediction.interval.center(), 36_250_000);

    let calls = backend.calls();
    assert!(matches!(
        &calls[1],
        BackendCall::PredictInterval { interval, outputs, .. }
            if interval == &prediction.interval
                && outputs == &vec![OutputType::RnaSeq, OutputType::Atac]
    ));

    let genes: Vec<_> = prediction
        .transcripts
        .iter()
        .map(|t| t.gene_name.as_str())
        .collect();
    assert_eq!(genes, vec!["APOL2", "APOL1"]);

    let rna = prediction.output.get(OutputType::RnaSeq).unwrap();
    assert_eq!(rna.num_tracks(), 2);
    assert_eq!(rna.num_positions(), 131_072 / 128);
}

#[tokio::test]
async fn test_oversized_interval_clamped_to_largest_window() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(backend).await;

    let prediction = orchestrator
        .predict_interval("chr1", 1_000_000, 5_000_000, &[OutputType::Dnase], &[])
        .await
        .unwrap();
    assert_eq!(prediction.interval.width(), 1_048_576);
    assert_eq!(prediction.interval.center(), 3_000_000);
}

#[tokio::test]
async fn test_invalid_range_rejected_before_backend_call() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;

    let err = orchestrator
        .predict_interval("chr1", 5000, 5000, &[OutputType::Atac], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PredictError::InvalidRange { .. }));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(backend.prediction_call_count(), 0);
}

#[tokio::test]
async fn test_huge_coordinates_rejected_before_backend_call() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;

    let err = orchestrator
        .predict_interval("chr1", i64::MAX - 10, i64::MAX, &[OutputType::Atac], &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = orchestrator
        .score_variant("chr1", u64::MAX, "A", "C", &[OutputType::Atac])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(backend.prediction_call_count(), 0);
}

#[tokio::test]
async fn test_backend_failure_surfaces_as_prediction_error() {
    let backend = Arc::new(MockBackend::new().with_prediction_failure("model overloaded"));
    let orchestrator = orchestrator(backend).await;

    let err = orchestrator
        .predict_interval("chr1", 1000, 2000, &[OutputType::Atac], &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().starts_with("Prediction failed:"));
    assert!(err.to_string().contains("model overloaded"));
}

#[tokio::test]
async fn test_ontology_terms_forwarded() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;
    let terms = vec!["UBERON:0000955".to_string(), "CL:0000084".to_string()];

    let prediction = orchestrator
        .predict_interval("chr2", 10_000, 11_000, &[OutputType::Atac], &terms)
        .await
        .unwrap();

    let atac = prediction.output.get(OutputType::Atac).unwrap();
    let recorded: Vec<_> = atac
        .metadata
        .iter()
        .filter_map(|m| m.ontology_term.clone())
        .collect();
    assert_eq!(recorded, terms);
}

// ==================== Variant Predictions ====================

#[tokio::test]
async fn test_variant_prediction_uses_smallest_window() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;

    let prediction = orchestrator
        .predict_variant("chr22", 36_201_698, "A", "C", &[OutputType::RnaSeq], &[])
        .await
        .unwrap();

    assert_eq!(prediction.interval.width(), 16_384);
    assert!(prediction.interval.contains(36_201_697));
    assert_eq!(prediction.variant.to_string(), "chr22:36201698:A>C");

    let (reference, alternate) = prediction.output.pair(OutputType::RnaSeq).unwrap();
    assert_eq!(reference.num_positions(), alternate.num_positions());
    assert_ne!(reference.values, alternate.values);
}

#[tokio::test]
async fn test_variant_rejects_bad_position() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;

    let err = orchestrator
        .predict_variant("chr22", 0, "A", "C", &[OutputType::RnaSeq], &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(backend.prediction_call_count(), 0);
}

// ==================== Variant Scoring ====================

#[tokio::test]
async fn test_scores_grouped_by_output_type_in_request_order() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(Arc::clone(&backend)).await;

    let records = orchestrator
        .score_variant(
            "chr22",
            36_201_698,
            "A",
            "C",
            &[OutputType::RnaSeq, OutputType::Atac],
        )
        .await
        .unwrap();

    let first_atac = records
        .iter()
        .position(|r| r.output_type == OutputType::Atac)
        .unwrap();
    assert!(records[..first_atac]
        .iter()
        .all(|r| r.output_type == OutputType::RnaSeq));
    assert!(records[first_atac..]
        .iter()
        .all(|r| r.output_type == OutputType::Atac));

    // Gene-centric scores keep only tracks on the gene's strand
    let rna: Vec<_> = records[..first_atac].iter().collect();
    assert_eq!(rna.len(), 2);
    assert_eq!((rna[0].gene_name.as_str(), rna[0].strand), ("APOL1", Strand::Plus));
    assert_eq!((rna[1].gene_name.as_str(), rna[1].strand), ("APOL4", Strand::Minus));

    // Scoring always uses the largest window, one recommended scorer per type
    let scorers: Vec<_> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::ScoreVariant {
                interval, scorers, ..
            } => {
                assert_eq!(interval.width(), 1_048_576);
                Some(scorers)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        scorers,
        vec![
            vec![VariantScorer::recommended(OutputType::RnaSeq)],
            vec![VariantScorer::recommended(OutputType::Atac)],
        ]
    );
}

#[tokio::test]
async fn test_scoring_failure_fails_whole_request() {
    let backend =
        Arc::new(MockBackend::new().with_scoring_failure(OutputType::Atac, "scorer unavailable"));
    let orchestrator = orchestrator(backend).await;

    let err = orchestrator
        .score_variant(
            "chr22",
            36_201_698,
            "A",
            "C",
            &[OutputType::RnaSeq, OutputType::Atac],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("ATAC"));
    assert!(err.to_string().contains("scorer unavailable"));
}

#[tokio::test]
async fn test_scores_paginate() {
    let backend = Arc::new(MockBackend::new());
    let orchestrator = orchestrator(backend).await;

    let records = orchestrator
        .score_variant(
            "chr22",
            36_201_698,
            "A",
            "C",
            &[OutputType::RnaSeq, OutputType::Atac, OutputType::Dnase],
        )
        .await
        .unwrap();
    let total = records.len();

    let page = paginate(&records, 2, 3).unwrap();
    assert_eq!(page.total, total);
    assert_eq!(page.items, records[3..6.min(total)].to_vec());
}

// ==================== Timeouts ====================

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_secs(5)));
    let credential = validate_credential(backend.as_ref(), "test-key").await.unwrap();
    let orchestrator = Orchestrator::with_config(
        credential,
        backend,
        annotations(),
        OrchestratorConfig {
            backend_timeout: Duration::from_millis(20),
            ..OrchestratorConfig::default()
        },
    );

    let err = orchestrator
        .predict_interval("chr1", 1000, 2000, &[OutputType::Atac], &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_slow_scoring_timeout_names_output_type() {
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_secs(5)));
    let credential = validate_credential(backend.as_ref(), "test-key").await.unwrap();
    let orchestrator = Orchestrator::with_config(
        credential,
        backend,
        annotations(),
        OrchestratorConfig {
            backend_timeout: Duration::from_millis(20),
            ..OrchestratorConfig::default()
        },
    );

    let err = orchestrator
        .score_variant("chr22", 36_201_698, "A", "C", &[OutputType::RnaSeq])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(matches!(
        err,
        PredictError::ScoringTimeout {
            output_type: OutputType::RnaSeq,
            ..
        }
    ));
    assert!(err.to_string().contains("RNA_SEQ"));
}
