//! Interval index over canonical transcripts

use std::collections::HashMap;

use super::TranscriptRecord;
use crate::genome::Interval;

/// Per-chromosome transcript list sorted by `(start, end)`
///
/// Overlap queries binary-search the start coordinate, bounded below by the
/// longest transcript on the chromosome.
#[derive(Debug, Clone, Default)]
pub struct TranscriptIndex {
    by_chromosome: HashMap<String, ChromosomeBin>,
    len: usize,
}

#[derive(Debug, Clone, Default)]
struct ChromosomeBin {
    transcripts: Vec<TranscriptRecord>,
    max_len: i64,
}

impl TranscriptIndex {
    /// Build an index from transcript records (any order)
    pub fn from_records(records: impl IntoIterator<Item = TranscriptRecord>) -> Self {
        let mut by_chromosome: HashMap<String, ChromosomeBin> = HashMap::new();
        let mut len = 0;
        for record in records {
            let bin = by_chromosome.entry(record.chromosome.clone()).or_default();
            bin.max_len = bin.max_len.max(record.end - record.start);
            bin.transcripts.push(record);
            len += 1;
        }
        for bin in by_chromosome.values_mut() {
            bin.transcripts.sort_by(|a, b| {
                (a.start, a.end, &a.transcript_id).cmp(&(b.start, b.end, &b.transcript_id))
            });
        }
        Self { by_chromosome, len }
    }

    /// Number of indexed transcripts
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Chromosomes with at least one transcript
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.by_chromosome.keys().map(String::as_str)
    }

    /// Transcripts overlapping `interval`, in coordinate order
    pub fn extract(&self, interval: &Interval) -> Vec<TranscriptRecord> {
        self.overlapping(interval.chromosome(), interval.start(), interval.end())
            .cloned()
            .collect()
    }

    /// Iterate over transcripts overlapping `[start, end)` on `chromosome`
    pub fn overlapping<'a>(
        &'a self,
        chromosome: &str,
        start: i64,
        end: i64,
    ) -> impl Iterator<Item = &'a TranscriptRecord> + 'a {
        let slice: &[TranscriptRecord] = match self.by_chromosome.get(chromosome) {
            Some(bin) => {
                let earliest = start.saturating_sub(bin.max_len);
                let lo = bin.transcripts.partition_point(|t| t.start < earliest);
                let hi = bin.transcripts.partition_point(|t| t.start < end);
                &bin.transcripts[lo..hi.max(lo)]
            }
            None => &[],
        };
        slice.iter().filter(move |t| t.end > start && t.start < end)
    }
}
