//! Variant score table
//!
//! Scoring produces a flat list of [`ScoreRecord`]s. [`paginate`] slices
//! that list into pages for display.

use serde::{Deserialize, Serialize};

use crate::backend::OutputType;
use crate::error::PredictError;
use crate::genome::Strand;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Page size used when the caller does not choose one
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One (gene, track) score for one output type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub gene_name: String,
    pub gene_id: String,
    pub strand: Strand,
    pub ontology_term: String,
    pub biosample_name: String,
    pub raw_score: f64,
    pub quantile_score: f64,
    pub output_type: OutputType,
}

/// A page of items plus the size of the full collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` items
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }
}

/// Take page `page` (1-based) of `page_size` items from `records`
///
/// Pages past the end are empty but still report the full `total`.
pub fn paginate<T: Clone>(
    records: &[T],
    page: usize,
    page_size: usize,
) -> Result<Page<T>, PredictError> {
    if page == 0 {
        return Err(PredictError::invalid_request("page must be at least 1"));
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(PredictError::invalid_request(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let total = records.len();
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    Ok(Page {
        total,
        page,
        page_size,
        items: records[start..end].to_vec(),
    })
}
