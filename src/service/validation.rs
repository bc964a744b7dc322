//! Input validation for prediction requests
//!
//! Requests are checked here before they reach the orchestrator, so that
//! malformed input is rejected with a 400 and never costs a backend call.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::OutputType;
use crate::genome::MAX_COORDINATE;
use crate::orchestrator::MAX_ONTOLOGY_TERMS;
use crate::scores::MAX_PAGE_SIZE;
use crate::service::types::{
    IntervalPredictionRequest, ServiceError, VariantPredictionRequest, VariantScoreRequest,
};

/// Maximum allele length accepted
const MAX_ALLELE_LENGTH: usize = 100;

/// Maximum length of an ontology search string
const MAX_SEARCH_LENGTH: usize = 200;

/// Human autosomes 1-22 plus X and Y, UCSC style
static CHROMOSOME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^chr([1-9]|1[0-9]|2[0-2]|X|Y)$").unwrap());

static ALLELE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ACGTN]+$").unwrap());

/// Ontology CURIEs such as "UBERON:0002048" or "CL:0000084"
static ONTOLOGY_TERM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+:[0-9]+$").unwrap());

/// Validation errors for user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Chromosome is not chr1-chr22, chrX or chrY
    InvalidChromosome(String),
    /// A coordinate is not positive
    NonPositive { field: &'static str, value: i64 },
    /// A coordinate is past the largest supported position
    CoordinateTooLarge {
        field: &'static str,
        value: i64,
        max: i64,
    },
    /// Interval end is not after its start
    EmptyInterval { start: i64, end: i64 },
    /// Allele is empty or too long
    AlleleLength {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    /// Allele contains something other than A, C, G, T or N
    InvalidAllele { field: &'static str },
    /// No output types requested
    NoOutputTypes,
    /// Too many ontology terms
    TooManyOntologyTerms { max: usize, actual: usize },
    /// Ontology term is not a CURIE
    InvalidOntologyTerm(String),
    /// Page number is zero
    InvalidPage,
    /// Page size is out of range
    InvalidPageSize { max: usize, actual: usize },
    /// Search string is too long
    SearchTooLong { max: usize, actual: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidChromosome(chrom) => write!(
                f,
                "Invalid chromosome '{}': expected chr1-chr22, chrX or chrY",
                chrom
            ),
            ValidationError::NonPositive { field, value } => {
                write!(f, "{} must be greater than 0, got {}", field, value)
            }
            ValidationError::CoordinateTooLarge { field, value, max } => {
                write!(f, "{} must be at most {}, got {}", field, max, value)
            }
            ValidationError::EmptyInterval { start, end } => {
                write!(f, "End ({}) must be greater than start ({})", end, start)
            }
            ValidationError::AlleleLength { field, max, actual } => write!(
                f,
                "{} allele must be 1-{} bases, got {}",
                field, max, actual
            ),
            ValidationError::InvalidAllele { field } => {
                write!(f, "{} allele may only contain A, C, G, T or N", field)
            }
            ValidationError::NoOutputTypes => write!(f, "At least one output type is required"),
            ValidationError::TooManyOntologyTerms { max, actual } => {
                write!(f, "At most {} ontology terms are allowed, got {}", max, actual)
            }
            ValidationError::InvalidOntologyTerm(term) => {
                write!(f, "Invalid ontology term '{}'", term)
            }
            ValidationError::InvalidPage => write!(f, "Page must be at least 1"),
            ValidationError::InvalidPageSize { max, actual } => {
                write!(f, "Page size {} is out of range (1-{})", actual, max)
            }
            ValidationError::SearchTooLong { max, actual } => {
                write!(f, "Search string too long: {} characters (max: {})", actual, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        ServiceError::BadRequest(e.to_string())
    }
}

/// Validate a chromosome name
pub fn validate_chromosome(chromosome: &str) -> Result<(), ValidationError> {
    if CHROMOSOME_PATTERN.is_match(chromosome) {
        Ok(())
    } else {
        Err(ValidationError::InvalidChromosome(chromosome.to_string()))
    }
}

/// Validate that a coordinate is positive and within the supported range
pub fn validate_positive(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        Err(ValidationError::NonPositive { field, value })
    } else if value > MAX_COORDINATE {
        Err(ValidationError::CoordinateTooLarge {
            field,
            value,
            max: MAX_COORDINATE,
        })
    } else {
        Ok(())
    }
}

/// Validate a REF or ALT allele
pub fn validate_allele(field: &'static str, allele: &str) -> Result<(), ValidationError> {
    if allele.is_empty() || allele.len() > MAX_ALLELE_LENGTH {
        return Err(ValidationError::AlleleLength {
            field,
            max: MAX_ALLELE_LENGTH,
            actual: allele.len(),
        });
    }
    if !ALLELE_PATTERN.is_match(allele) {
        return Err(ValidationError::InvalidAllele { field });
    }
    Ok(())
}

/// Validate the requested output types and ontology filters
pub fn validate_outputs(
    output_types: &[OutputType],
    ontology_terms: &[String],
) -> Result<(), ValidationError> {
    if output_types.is_empty() {
        return Err(ValidationError::NoOutputTypes);
    }
    if ontology_terms.len() > MAX_ONTOLOGY_TERMS {
        return Err(ValidationError::TooManyOntologyTerms {
            max: MAX_ONTOLOGY_TERMS,
            actual: ontology_terms.len(),
        });
    }
    if let Some(term) = ontology_terms
        .iter()
        .find(|t| !ONTOLOGY_TERM_PATTERN.is_match(t))
    {
        return Err(ValidationError::InvalidOntologyTerm(term.clone()));
    }
    Ok(())
}

/// Validate pagination parameters
pub fn validate_pagination(page: usize, page_size: usize) -> Result<(), ValidationError> {
    if page == 0 {
        return Err(ValidationError::InvalidPage);
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::InvalidPageSize {
            max: MAX_PAGE_SIZE,
            actual: page_size,
        });
    }
    Ok(())
}

/// Validate an ontology search string
pub fn validate_search(search: &str) -> Result<(), ValidationError> {
    if search.len() > MAX_SEARCH_LENGTH {
        return Err(ValidationError::SearchTooLong {
            max: MAX_SEARCH_LENGTH,
            actual: search.len(),
        });
    }
    Ok(())
}

/// Validate an interval prediction request
pub fn validate_interval_request(request: &IntervalPredictionRequest) -> Result<(), ValidationError> {
    validate_chromosome(&request.chromosome)?;
    validate_positive("start", request.start)?;
    validate_positive("end", request.end)?;
    if request.end <= request.start {
        return Err(ValidationError::EmptyInterval {
            start: request.start,
            end: request.end,
        });
    }
    validate_outputs(&request.output_types, &request.ontology_terms)
}

/// Validate a variant prediction request
pub fn validate_variant_request(request: &VariantPredictionRequest) -> Result<(), ValidationError> {
    validate_chromosome(&request.chromosome)?;
    validate_positive("position", request.position)?;
    validate_allele("Reference", &request.reference_bases)?;
    validate_allele("Alternate", &request.alternate_bases)?;
    validate_outputs(&request.output_types, &request.ontology_terms)
}

/// Validate a variant scoring request
pub fn validate_score_request(request: &VariantScoreRequest) -> Result<(), ValidationError> {
    validate_chromosome(&request.chromosome)?;
    validate_positive("position", request.position)?;
    validate_allele("Reference", &request.reference_bases)?;
    validate_allele("Alternate", &request.alternate_bases)?;
    validate_outputs(&request.output_types, &[])?;
    validate_pagination(request.page, request.page_size)
}
