//! Integration tests for web service handlers
//!
//! These call the handler functions directly with a mock backend, a
//! preloaded transcript index and a temporary plot directory, testing the
//! full code path from request to response.

#![cfg(feature = "web-service")]

use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::Json,
};
use tempfile::TempDir;

use ferro_predict::annotation::{AnnotationIndex, TranscriptIndex, TranscriptRecord};
use ferro_predict::backend::{MockBackend, OutputType};
use ferro_predict::plot::SvgPlotRenderer;
use ferro_predict::service::config::ServiceConfig;
use ferro_predict::service::handlers::{assets, config, health, metadata, predict, variants};
use ferro_predict::service::server::AppState;
use ferro_predict::service::types::*;
use ferro_predict::Strand;

// ==================== Fixtures ====================

struct TestService {
    state: AppState,
    backend: Arc<MockBackend>,
    plots: TempDir,
}

fn transcript(gene: &str, start: i64, end: i64, strand: Strand) -> TranscriptRecord {
    TranscriptRecord {
        transcript_id: format!("ENST_{}", gene),
        gene_id: format!("ENSG_{}", gene),
        gene_name: gene.to_string(),
        chromosome: "chr22".to_string(),
        start,
        end,
        strand,
        exons: vec![(start, start + 300), (end - 300, end)],
    }
}

fn create_test_service(backend: MockBackend) -> TestService {
    let plots = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::default();
    config.backend.mock = true;
    config.plots.dir = plots.path().to_path_buf();

    let annotations = AnnotationIndex::preloaded(TranscriptIndex::from_records(vec![
        transcript("APOL4", 36_195_000, 36_203_000, Strand::Minus),
        transcript("APOL2", 36_200_500, 36_206_000, Strand::Minus),
        transcript("APOL1", 36_253_000, 36_267_000, Strand::Plus),
    ]));

    let backend = Arc::new(backend);
    let state = AppState::with_components(
        config,
        backend.clone(),
        Arc::new(annotations),
        Arc::new(SvgPlotRenderer::default()),
    );
    TestService {
        state,
        backend,
        plots,
    }
}

fn api_key_headers(key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(key).unwrap());
    headers
}

fn interval_request(output_types: Vec<OutputType>) -> IntervalPredictionRequest {
    IntervalPredictionRequest {
        chromosome: "chr22".to_string(),
        start: 36_190_000,
        end: 36_290_000,
        output_types,
        ontology_terms: vec![],
    }
}

fn variant_request(output_types: Vec<OutputType>) -> VariantPredictionRequest {
    VariantPredictionRequest {
        chromosome: "chr22".to_string(),
        position: 36_201_698,
        reference_bases: "A".to_string(),
        alternate_bases: "C".to_string(),
        output_types,
        ontology_terms: vec![],
    }
}

fn score_request(page: usize, page_size: usize) -> VariantScoreRequest {
    VariantScoreRequest {
        chromosome: "chr22".to_string(),
        position: 36_201_698,
        reference_bases: "A".to_string(),
        alternate_bases: "C".to_string(),
        output_types: vec![OutputType::RnaSeq, OutputType::Atac],
        page,
        page_size,
    }
}

fn plot_name(url: &str) -> &str {
    url.strip_prefix("/plots/").unwrap()
}

// ==================== Health and Metadata ====================

#[tokio::test]
async fn test_health_reports_backend_and_annotations() {
    let service = create_test_service(MockBackend::new());
    let Json(response) = health::health_check(State(service.state)).await;
    assert_eq!(response.status, "ok");
    assert!(response.annotations_ready);
    assert_eq!(response.backend, "mock");
}

#[tokio::test]
async fn test_ontology_search_handler() {
    let result = metadata::ontology_terms(Query(OntologySearchQuery {
        search: Some("Lung".to_string()),
    }))
    .await;
    let Json(response) = result.unwrap();
    assert_eq!(response.terms.len(), 1);
    assert_eq!(response.terms[0].code, "UBERON:0002048");

    let (status, _) = metadata::ontology_terms(Query(OntologySearchQuery {
        search: Some("x".repeat(500)),
    }))
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==================== Interval Predictions ====================

#[tokio::test]
async fn test_predict_interval_handler() {
    let service = create_test_service(MockBackend::new());

    let result = predict::predict_interval(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(interval_request(vec![OutputType::RnaSeq, OutputType::Dnase])),
    )
    .await;

    let Json(response) = result.unwrap();
    assert_eq!(response.interval.width, 131_072);
    assert_eq!(response.interval.sequence_length, "128KB");

    // One plot per output type, in request order, written to the plot directory
    assert_eq!(response.plot_urls.len(), 2);
    assert!(response.plot_urls[0].ends_with("_rna_seq.svg"));
    assert!(response.plot_urls[1].ends_with("_dnase.svg"));
    for url in &response.plot_urls {
        assert!(service.plots.path().join(plot_name(url)).is_file());
    }

    // RNA-seq has +/- tracks, DNase one unstranded track
    let kinds: Vec<_> = response.tracks.iter().map(|t| t.output_type).collect();
    assert_eq!(
        kinds,
        vec![OutputType::RnaSeq, OutputType::RnaSeq, OutputType::Dnase]
    );
    assert!(response.tracks.iter().all(|t| t.stats.is_some()));

    let genes: Vec<_> = response
        .transcripts
        .iter()
        .map(|t| t.gene_name.as_str())
        .collect();
    assert_eq!(genes, vec!["APOL4", "APOL2", "APOL1"]);
}

#[tokio::test]
async fn test_predict_interval_requires_api_key() {
    let service = create_test_service(MockBackend::new());

    let (status, Json(body)) = predict::predict_interval(
        State(service.state.clone()),
        HeaderMap::new(),
        Json(interval_request(vec![OutputType::Atac])),
    )
    .await
    .unwrap_err();

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.error, "authentication_error");
    assert_eq!(service.backend.prediction_call_count(), 0);
}

#[tokio::test]
async fn test_predict_interval_rejected_key() {
    let service = create_test_service(MockBackend::new().with_rejected_key("revoked"));

    let (status, Json(body)) = predict::predict_interval(
        State(service.state.clone()),
        api_key_headers("revoked"),
        Json(interval_request(vec![OutputType::Atac])),
    )
    .await
    .unwrap_err();

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.message.starts_with("Invalid API key:"));
    assert_eq!(service.backend.prediction_call_count(), 0);
}

#[tokio::test]
async fn test_predict_interval_validation_errors() {
    let service = create_test_service(MockBackend::new());

    let mut bad_chromosome = interval_request(vec![OutputType::Atac]);
    bad_chromosome.chromosome = "chrM".to_string();

    let mut empty_range = interval_request(vec![OutputType::Atac]);
    empty_range.end = empty_range.start;

    let no_outputs = interval_request(vec![]);

    let mut bad_term = interval_request(vec![OutputType::Atac]);
    bad_term.ontology_terms = vec!["lung".to_string()];

    for request in [bad_chromosome, empty_range, no_outputs, bad_term] {
        let (status, Json(body)) = predict::predict_interval(
            State(service.state.clone()),
            api_key_headers("test-key"),
            Json(request),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "bad_request");
    }

    // Validation happens before the key is even checked
    assert!(service.backend.calls().is_empty());
}

#[tokio::test]
async fn test_predict_interval_backend_failure() {
    let service = create_test_service(MockBackend::new().with_prediction_failure("quota exceeded"));

    let (status, Json(body)) = predict::predict_interval(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(interval_request(vec![OutputType::Atac])),
    )
    .await
    .unwrap_err();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.message.starts_with("Prediction failed:"));
    assert!(body.message.contains("quota exceeded"));
}

// ==================== Variant Predictions ====================

#[tokio::test]
async fn test_predict_variant_handler() {
    let service = create_test_service(MockBackend::new());

    let result = variants::predict_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(variant_request(vec![OutputType::RnaSeq, OutputType::Atac])),
    )
    .await;

    let Json(response) = result.unwrap();
    assert_eq!(response.variant.position, 36_201_698);
    assert_eq!(response.variant.reference_bases, "A");
    assert_eq!(response.interval.sequence_length, "16KB");
    assert_eq!(response.plot_urls.len(), 2);
    assert!(response.plot_urls[0].ends_with("_variant_rna_seq.svg"));
    assert!(response.plot_urls[1].ends_with("_variant_atac.svg"));

    assert_eq!(response.comparison.len(), 2);
    assert_eq!(response.comparison[0].output_type, OutputType::RnaSeq);
    assert_eq!(response.comparison[0].affected_genes, vec!["APOL4", "APOL2"]);
    assert_eq!(
        response.comparison[0].summary,
        "Comparison of REF (A) vs ALT (C)"
    );
}

#[tokio::test]
async fn test_predict_variant_rejects_bad_alleles() {
    let service = create_test_service(MockBackend::new());

    let mut request = variant_request(vec![OutputType::Atac]);
    request.alternate_bases = "X".to_string();
    let (status, _) = variants::predict_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(request),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut request = variant_request(vec![OutputType::Atac]);
    request.position = -5;
    let (status, _) = variants::predict_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(request),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==================== Variant Scoring ====================

#[tokio::test]
async fn test_score_variant_pagination() {
    let service = create_test_service(MockBackend::new());

    // RNA-seq: 2 strand-matched gene records; ATAC: 3 track records
    let Json(first) = variants::score_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(score_request(1, 2)),
    )
    .await
    .unwrap();
    assert_eq!(first.pagination.total, 5);
    assert_eq!(first.pagination.page, 1);
    assert_eq!(first.pagination.page_size, 2);
    assert_eq!(first.scores.len(), 2);
    assert!(first
        .scores
        .iter()
        .all(|s| s.output_type == OutputType::RnaSeq));

    let Json(last) = variants::score_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(score_request(3, 2)),
    )
    .await
    .unwrap();
    assert_eq!(last.scores.len(), 1);
    assert_eq!(last.scores[0].output_type, OutputType::Atac);

    let Json(past_end) = variants::score_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(score_request(9, 2)),
    )
    .await
    .unwrap();
    assert!(past_end.scores.is_empty());
    assert_eq!(past_end.pagination.total, 5);
}

#[tokio::test]
async fn test_score_variant_rejects_bad_page_size() {
    let service = create_test_service(MockBackend::new());

    let (status, _) = variants::score_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(score_request(1, 101)),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(service.backend.prediction_call_count(), 0);
}

#[tokio::test]
async fn test_score_variant_failure() {
    let service = create_test_service(
        MockBackend::new().with_scoring_failure(OutputType::RnaSeq, "gene mask missing"),
    );

    let (status, Json(body)) = variants::score_variant(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(score_request(1, 50)),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.message.starts_with("Variant scoring failed"));
}

// ==================== API Key ====================

#[tokio::test]
async fn test_set_api_key_handler() {
    let service = create_test_service(MockBackend::new().with_rejected_key("revoked"));

    let Json(response) = config::set_api_key(
        State(service.state.clone()),
        Json(ApiKeyRequest {
            api_key: "  good-key  ".to_string(),
        }),
    )
    .await
    .unwrap();
    assert!(response.success);

    let (status, Json(body)) = config::set_api_key(
        State(service.state.clone()),
        Json(ApiKeyRequest {
            api_key: "revoked".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.message.starts_with("Invalid API key:"));
}

// ==================== Static Files ====================

#[tokio::test]
async fn test_generated_plot_is_served() {
    let service = create_test_service(MockBackend::new());

    let Json(prediction) = predict::predict_interval(
        State(service.state.clone()),
        api_key_headers("test-key"),
        Json(interval_request(vec![OutputType::Cage])),
    )
    .await
    .unwrap();
    let name = plot_name(&prediction.plot_urls[0]).to_string();

    let response = assets::plot_file(State(service.state.clone()), Path(name)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("<svg"));

    let missing = assets::plot_file(
        State(service.state.clone()),
        Path("deadbeef_cage.svg".to_string()),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let traversal =
        assets::plot_file(State(service.state.clone()), Path("..%2Fsecret".to_string())).await;
    assert_eq!(traversal.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_frontend_fallback() {
    let dist = tempfile::tempdir().unwrap();
    std::fs::write(dist.path().join("index.html"), "<html>app</html>").unwrap();
    std::fs::create_dir(dist.path().join("assets")).unwrap();
    std::fs::write(dist.path().join("assets/app.js"), "console.log(1)").unwrap();

    let plots = tempfile::tempdir().unwrap();
    let mut service_config = ServiceConfig::default();
    service_config.plots.dir = plots.path().to_path_buf();
    service_config.plots.frontend_dist_dir = Some(dist.path().to_path_buf());
    let state = AppState::with_components(
        service_config,
        Arc::new(MockBackend::new()),
        Arc::new(AnnotationIndex::preloaded(TranscriptIndex::default())),
        Arc::new(SvgPlotRenderer::default()),
    );

    let asset = assets::frontend_fallback(
        State(state.clone()),
        "/assets/app.js".parse::<Uri>().unwrap(),
    )
    .await;
    assert_eq!(asset.status(), StatusCode::OK);
    assert_eq!(
        asset.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/javascript"
    );

    let route = assets::frontend_fallback(
        State(state.clone()),
        "/variants/chr22".parse::<Uri>().unwrap(),
    )
    .await;
    let body = to_bytes(route.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<html>app</html>");

    let api = assets::frontend_fallback(State(state), "/api/unknown".parse::<Uri>().unwrap()).await;
    assert_eq!(api.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fallback_without_frontend_is_404() {
    let service = create_test_service(MockBackend::new());
    let response =
        assets::frontend_fallback(State(service.state), "/anything".parse::<Uri>().unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
