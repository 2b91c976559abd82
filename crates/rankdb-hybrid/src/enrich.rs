//! Presentation helpers layered over ranked results: metadata enrichment,
//! recent-search history, and upload batch summaries.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use rankdb_core::traits::MetadataStore;
use rankdb_core::types::{DocumentId, DocumentMetadata, ScoredResult};

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub result: ScoredResult,
    pub matching_rate_percent: f32,
    pub metadata: DocumentMetadata,
}

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

/// Attach metadata to each result. Documents without an entry get empty
/// metadata; a gap between index and store is expected after a crash.
pub fn enrich(results: Vec<ScoredResult>, store: &dyn MetadataStore) -> Vec<EnrichedResult> {
    results
        .into_iter()
        .map(|result| {
            let metadata = store.get(&result.document).unwrap_or_default();
            let matching_rate_percent = round2(result.score * 100.0);
            EnrichedResult { result, matching_rate_percent, metadata }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRecord {
    pub id: u64,
    pub query: String,
    pub at: DateTime<Utc>,
    pub results: usize,
    /// Mean matching rate of the returned results, rounded.
    pub match_score: u32,
}

#[derive(Debug)]
pub struct SearchHistory {
    capacity: usize,
    inner: Mutex<(u64, VecDeque<SearchRecord>)>,
}

impl Default for SearchHistory {
    fn default() -> Self { Self::new(HISTORY_LIMIT) }
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new((0, VecDeque::new())) }
    }

    pub fn record(&self, query: &str, results: &[EnrichedResult]) -> SearchRecord {
        let match_score = if results.is_empty() {
            0
        } else {
            let mean = results.iter().map(|r| r.matching_rate_percent).sum::<f32>() / results.len() as f32;
            mean.round().max(0.0) as u32
        };
        let mut guard = self.inner.lock();
        let (next_id, entries) = &mut *guard;
        *next_id += 1;
        let record = SearchRecord { id: *next_id, query: query.to_string(), at: Utc::now(), results: results.len(), match_score };
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(record.clone());
        record
    }

    /// Most recent first.
    pub fn recent(&self) -> Vec<SearchRecord> {
        self.inner.lock().1.iter().rev().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchFile {
    pub document: DocumentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `Partial` once any file of the batch failed to index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub id: String,
    pub name: String,
    pub date: Option<DateTime<Utc>>,
    pub status: BatchStatus,
    pub file_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub files: Vec<BatchFile>,
}

/// Group stored documents by upload batch, newest batch first.
pub fn recent_batches(store: &dyn MetadataStore, limit: usize) -> Vec<BatchSummary> {
    let mut groups: BTreeMap<String, BatchSummary> = BTreeMap::new();
    for (document, meta) in store.all() {
        let Some(batch_id) = meta.batch_id.clone() else { continue };
        let summary = groups.entry(batch_id.clone()).or_insert_with(|| BatchSummary {
            id: batch_id,
            name: meta.batch_name.clone().unwrap_or_default(),
            date: meta.batch_time,
            status: BatchStatus::Completed,
            file_count: 0,
            success_count: 0,
            failed_count: 0,
            files: Vec::new(),
        });
        if meta.is_failed() {
            summary.failed_count += 1;
            summary.status = BatchStatus::Partial;
        } else {
            summary.success_count += 1;
        }
        let name = meta.name.clone().unwrap_or_else(|| document.clone());
        summary.files.push(BatchFile { document, name, error: meta.error });
        summary.file_count += 1;
    }
    let mut batches: Vec<BatchSummary> = groups
        .into_values()
        .map(|mut b| {
            if b.name.is_empty() {
                b.name = format!("Batch Upload ({} files)", b.file_count);
            }
            b
        })
        .collect();
    batches.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    batches.truncate(limit);
    batches
}
