//! Metadata endpoints for output types and ontology terms

use axum::extract::Query;
use axum::response::Json;

use super::{error_response, HandlerResult};
use crate::backend::OutputType;
use crate::service::{
    types::{
        OntologySearchQuery, OntologyTermInfo, OntologyTermsResponse, OutputTypeInfo,
        OutputTypesResponse,
    },
    validation::validate_search,
};

/// Commonly used tissue and cell-type terms
pub const ONTOLOGY_TERMS: &[(&str, &str)] = &[
    ("UBERON:0000955", "brain"),
    ("UBERON:0001157", "transverse colon"),
    ("UBERON:0001114", "right lobe of liver"),
    ("UBERON:0002048", "lung"),
    ("UBERON:0000948", "heart"),
    ("UBERON:0002107", "liver"),
    ("UBERON:0002113", "kidney"),
    ("UBERON:0000945", "stomach"),
    ("UBERON:0002097", "skin of body"),
    ("UBERON:0001134", "skeletal muscle tissue"),
    ("UBERON:0000178", "blood"),
    ("UBERON:0002367", "prostate gland"),
    ("UBERON:0000992", "ovary"),
    ("UBERON:0000473", "testis"),
    ("UBERON:0001264", "pancreas"),
    ("UBERON:0002046", "thyroid gland"),
    ("UBERON:0001013", "adipose tissue"),
    ("UBERON:0002106", "spleen"),
    ("CL:0000084", "T-cell"),
    ("CL:0000236", "B cell"),
    ("CL:0000576", "monocyte"),
    ("CL:0000623", "natural killer cell"),
    ("CL:0000182", "hepatocyte"),
    ("CL:0000057", "fibroblast"),
    ("CL:0000115", "endothelial cell"),
    ("CL:0000540", "neuron"),
    ("EFO:0002067", "K562"),
    ("EFO:0001187", "HepG2"),
    ("EFO:0002784", "GM12878"),
    ("EFO:0001086", "A549"),
    ("EFO:0002824", "HeLa-S3"),
    ("EFO:0003042", "H1"),
];

/// List every output type with its description
pub async fn output_types() -> Json<OutputTypesResponse> {
    let output_types = OutputType::all()
        .iter()
        .map(|ot| OutputTypeInfo {
            name: *ot,
            description: ot.description().to_string(),
        })
        .collect();
    Json(OutputTypesResponse { output_types })
}

/// List ontology terms, optionally filtered by a search string
pub async fn ontology_terms(
    Query(query): Query<OntologySearchQuery>,
) -> HandlerResult<OntologyTermsResponse> {
    let search = query.search.unwrap_or_default();
    validate_search(&search).map_err(error_response)?;

    Ok(Json(OntologyTermsResponse {
        terms: search_ontology_terms(&search),
    }))
}

/// Terms whose name or code contains `search` (case-insensitive)
pub fn search_ontology_terms(search: &str) -> Vec<OntologyTermInfo> {
    let needle = search.trim().to_lowercase();
    ONTOLOGY_TERMS
        .iter()
        .filter(|(code, name)| {
            needle.is_empty()
                || name.to_lowercase().contains(&needle)
                || code.to_lowercase().contains(&needle)
        })
        .map(|(code, name)| OntologyTermInfo {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect()
}
