//! Interval prediction endpoint

use axum::{extract::State, http::HeaderMap, response::Json};

use super::{error_response, HandlerResult};
use crate::backend::{OutputType, PredictionOutput};
use crate::plot::interval_plots;
use crate::service::{
    server::AppState,
    types::{
        IntervalInfo, IntervalPredictionRequest, IntervalPredictionResponse, TrackInfo,
        TranscriptInfo,
    },
    validation::validate_interval_request,
};

/// Predict tracks over a genomic interval and plot each output type
pub async fn predict_interval(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<IntervalPredictionRequest>,
) -> HandlerResult<IntervalPredictionResponse> {
    validate_interval_request(&request).map_err(error_response)?;
    let orchestrator = state.orchestrator(&headers).await.map_err(error_response)?;

    let prediction = orchestrator
        .predict_interval(
            &request.chromosome,
            request.start,
            request.end,
            &request.output_types,
            &request.ontology_terms,
        )
        .await
        .map_err(error_response)?;

    let plot_urls = interval_plots(
        state.renderer.as_ref(),
        &state.artifacts,
        &prediction,
        &request.output_types,
    )
    .await
    .map_err(error_response)?;

    Ok(Json(IntervalPredictionResponse {
        plot_urls,
        interval: IntervalInfo::from(&prediction.interval),
        tracks: track_summaries(&prediction.output, &request.output_types),
        transcripts: prediction.transcripts.iter().map(TranscriptInfo::from).collect(),
    }))
}

/// One entry per predicted track, grouped by output type in request order
pub fn track_summaries(output: &PredictionOutput, output_types: &[OutputType]) -> Vec<TrackInfo> {
    output_types
        .iter()
        .filter_map(|&ot| output.get(ot).map(|data| (ot, data)))
        .flat_map(|(output_type, data)| {
            data.metadata
                .iter()
                .enumerate()
                .map(move |(i, meta)| TrackInfo {
                    output_type,
                    track_name: meta.name.clone(),
                    strand: meta.strand,
                    ontology_term: meta.ontology_term.clone(),
                    stats: data.stats(i),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{TrackData, TrackMetadata};
    use crate::genome::{Interval, Strand};

    fn track(name: &str, strand: Strand) -> TrackMetadata {
        TrackMetadata {
            name: name.to_string(),
            strand,
            ontology_term: Some("UBERON:0002048".to_string()),
            biosample_name: None,
        }
    }

    #[test]
    fn test_track_summaries_follow_request_order() {
        let interval = Interval::new("chr1", 0, 256).unwrap();
        let mut output = PredictionOutput::default();
        output.insert(
            OutputType::Atac,
            TrackData {
                values: vec![vec![1.0], vec![3.0]],
                metadata: vec![track("atac", Strand::Unstranded)],
                interval: interval.clone(),
                resolution: 128,
            },
        );
        output.insert(
            OutputType::RnaSeq,
            TrackData {
                values: vec![vec![0.0, 2.0], vec![4.0, 6.0]],
                metadata: vec![track("rna+", Strand::Plus), track("rna-", Strand::Minus)],
                interval,
                resolution: 128,
            },
        );

        let tracks = track_summaries(&output, &[OutputType::RnaSeq, OutputType::Atac]);
        let names: Vec<_> = tracks.iter().map(|t| t.track_name.as_str()).collect();
        assert_eq!(names, vec!["rna+", "rna-", "atac"]);

        let stats = tracks[1].stats.as_ref().unwrap();
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.mean, 4.0);
    }
}
