//! Variant prediction and scoring endpoints

use axum::{extract::State, http::HeaderMap, response::Json};

use super::{error_response, HandlerResult};
use crate::annotation::TranscriptRecord;
use crate::backend::OutputType;
use crate::genome::Variant;
use crate::plot::variant_plots;
use crate::scores::paginate;
use crate::service::{
    server::AppState,
    types::{
        ComparisonInfo, IntervalInfo, PaginationInfo, ServiceError, VariantInfo,
        VariantPredictionRequest, VariantPredictionResponse, VariantScoreRequest,
        VariantScoreResponse,
    },
    validation::{validate_score_request, validate_variant_request},
};

/// Genes listed per comparison entry
const MAX_AFFECTED_GENES: usize = 5;

/// Predict REF and ALT tracks around a variant and plot each output type
pub async fn predict_variant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VariantPredictionRequest>,
) -> HandlerResult<VariantPredictionResponse> {
    validate_variant_request(&request).map_err(error_response)?;
    let position = to_position(request.position).map_err(error_response)?;
    let orchestrator = state.orchestrator(&headers).await.map_err(error_response)?;

    let prediction = orchestrator
        .predict_variant(
            &request.chromosome,
            position,
            &request.reference_bases,
            &request.alternate_bases,
            &request.output_types,
            &request.ontology_terms,
        )
        .await
        .map_err(error_response)?;

    let plot_urls = variant_plots(
        state.renderer.as_ref(),
        &state.artifacts,
        &prediction,
        &request.output_types,
    )
    .await
    .map_err(error_response)?;

    Ok(Json(VariantPredictionResponse {
        plot_urls,
        variant: VariantInfo::from(&prediction.variant),
        interval: IntervalInfo::from(&prediction.interval),
        comparison: comparisons(
            &prediction.variant,
            &prediction.transcripts,
            &request.output_types,
        ),
    }))
}

/// Score a variant and return one page of the score table
pub async fn score_variant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VariantScoreRequest>,
) -> HandlerResult<VariantScoreResponse> {
    validate_score_request(&request).map_err(error_response)?;
    let position = to_position(request.position).map_err(error_response)?;
    let orchestrator = state.orchestrator(&headers).await.map_err(error_response)?;

    let records = orchestrator
        .score_variant(
            &request.chromosome,
            position,
            &request.reference_bases,
            &request.alternate_bases,
            &request.output_types,
        )
        .await
        .map_err(error_response)?;

    let page = paginate(&records, request.page, request.page_size).map_err(error_response)?;

    Ok(Json(VariantScoreResponse {
        variant: VariantInfo {
            chromosome: request.chromosome,
            position,
            reference_bases: request.reference_bases,
            alternate_bases: request.alternate_bases,
        },
        scores: page.items,
        pagination: PaginationInfo {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        },
    }))
}

/// One comparison entry per requested output type
pub fn comparisons(
    variant: &Variant,
    transcripts: &[TranscriptRecord],
    output_types: &[OutputType],
) -> Vec<ComparisonInfo> {
    let affected_genes = affected_genes(transcripts);
    let summary = format!(
        "Comparison of REF ({}) vs ALT ({})",
        variant.reference_bases(),
        variant.alternate_bases()
    );
    output_types
        .iter()
        .map(|&output_type| ComparisonInfo {
            output_type,
            affected_genes: affected_genes.clone(),
            summary: summary.clone(),
        })
        .collect()
}

/// Unique gene names in transcript order, capped
fn affected_genes(transcripts: &[TranscriptRecord]) -> Vec<String> {
    let mut genes: Vec<String> = Vec::new();
    for record in transcripts {
        if genes.len() == MAX_AFFECTED_GENES {
            break;
        }
        if !genes.contains(&record.gene_name) {
            genes.push(record.gene_name.clone());
        }
    }
    genes
}

fn to_position(position: i64) -> Result<u64, ServiceError> {
    u64::try_from(position)
        .map_err(|_| ServiceError::BadRequest(format!("position must be greater than 0, got {}", position)))
}
