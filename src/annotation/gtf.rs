//! GTF parsing with canonical-transcript filtering
//!
//! Only features that belong to a canonical transcript survive: the gene and
//! the transcript must both be protein coding and the transcript must carry
//! the `MANE_Select` tag. Filtering happens per line, so non-canonical
//! records are never held in memory.

use std::collections::HashMap;
use std::io::BufRead;

use super::{AnnotationError, TranscriptRecord};
use crate::genome::Strand;

/// Parse canonical transcripts from GTF text
///
/// Coordinates are converted from GTF (1-based, closed) to 0-based
/// half-open. When a gene has more than one tagged transcript, the one with
/// the smallest transcript ID is kept.
pub fn parse_gtf<R: BufRead>(reader: R) -> Result<Vec<TranscriptRecord>, AnnotationError> {
    let mut builders: HashMap<String, TranscriptBuilder> = HashMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|e| AnnotationError::Io(format!("Failed to read line: {}", e)))?;

        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            continue;
        }

        let feature_type = fields[2];
        if feature_type != "transcript" && feature_type != "exon" {
            continue;
        }

        let attrs = parse_gtf_attributes(fields[8]);
        if !is_canonical(&attrs) {
            continue;
        }
        let Some(transcript_id) = attrs.get("transcript_id").cloned() else {
            continue;
        };

        let start = parse_coordinate(fields[3], line_number)?;
        let end = parse_coordinate(fields[4], line_number)?;
        if end < start {
            return Err(AnnotationError::Parse {
                line: line_number,
                msg: format!("end {} is before start {}", end, start),
            });
        }
        // 1-based closed -> 0-based half-open
        let (start, end) = (start - 1, end);

        let builder = builders
            .entry(transcript_id.clone())
            .or_insert_with(|| TranscriptBuilder {
                transcript_id,
                gene_id: attrs.get("gene_id").cloned().unwrap_or_default(),
                gene_name: attrs
                    .get("gene_name")
                    .or_else(|| attrs.get("gene_id"))
                    .cloned()
                    .unwrap_or_default(),
                chromosome: fields[0].to_string(),
                strand: Strand::parse(fields[6]),
                start,
                end,
                exons: Vec::new(),
            });

        match feature_type {
            "transcript" => {
                builder.start = start;
                builder.end = end;
            }
            _ => {
                builder.start = builder.start.min(start);
                builder.end = builder.end.max(end);
                builder.exons.push((start, end));
            }
        }
    }

    Ok(one_per_gene(builders.into_values().map(TranscriptBuilder::build)))
}

/// Keep a single transcript per gene (smallest transcript ID wins)
fn one_per_gene(records: impl Iterator<Item = TranscriptRecord>) -> Vec<TranscriptRecord> {
    let mut by_gene: HashMap<String, TranscriptRecord> = HashMap::new();
    for record in records {
        let key = if record.gene_id.is_empty() {
            record.transcript_id.clone()
        } else {
            record.gene_id.clone()
        };
        match by_gene.get(&key) {
            Some(existing) if existing.transcript_id <= record.transcript_id => {}
            _ => {
                by_gene.insert(key, record);
            }
        }
    }
    let mut records: Vec<TranscriptRecord> = by_gene.into_values().collect();
    records.sort_by(|a, b| {
        (&a.chromosome, a.start, a.end, &a.transcript_id).cmp(&(
            &b.chromosome,
            b.start,
            b.end,
            &b.transcript_id,
        ))
    });
    records
}

/// Whether a feature belongs to a protein-coding MANE Select transcript
fn is_canonical(attrs: &HashMap<String, String>) -> bool {
    let protein_coding = |key: &str| attrs.get(key).map(String::as_str) == Some("protein_coding");
    let mane_select = attrs
        .get("tag")
        .map(|tags| tags.split(',').any(|t| t == "MANE_Select"))
        .unwrap_or(false);
    protein_coding("gene_type") && protein_coding("transcript_type") && mane_select
}

fn parse_coordinate(s: &str, line: usize) -> Result<i64, AnnotationError> {
    match s.trim().parse::<i64>() {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(AnnotationError::Parse {
            line,
            msg: format!("invalid coordinate '{}'", s),
        }),
    }
}

/// Parse a GTF attribute string
///
/// Repeated keys (GENCODE emits one `tag` entry per tag) are joined with
/// commas.
pub fn parse_gtf_attributes(attr_str: &str) -> HashMap<String, String> {
    let mut attrs: HashMap<String, String> = HashMap::new();

    for part in attr_str.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        // GTF format: key "value"
        let mut iter = part.splitn(2, ' ');
        if let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            let value = value.trim().trim_matches('"');
            attrs
                .entry(key.to_string())
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }

    attrs
}

struct TranscriptBuilder {
    transcript_id: String,
    gene_id: String,
    gene_name: String,
    chromosome: String,
    strand: Strand,
    start: i64,
    end: i64,
    exons: Vec<(i64, i64)>,
}

impl TranscriptBuilder {
    fn build(mut self) -> TranscriptRecord {
        self.exons.sort_unstable();
        TranscriptRecord {
            transcript_id: self.transcript_id,
            gene_id: self.gene_id,
            gene_name: self.gene_name,
            chromosome: self.chromosome,
            start: self.start,
            end: self.end,
            strand: self.strand,
            exons: self.exons,
        }
    }
}
