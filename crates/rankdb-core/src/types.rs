//! Domain types shared by the vector, text and hybrid crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of one inserted vector. Assigned in insertion order, never reused.
pub type Slot = usize;

/// Opaque key of a source document, usually a file path.
pub type DocumentId = String;

/// Raw nearest-neighbor hit before any keyword evidence is applied.
///
/// `distance` is the squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub slot: Slot,
    pub distance: f32,
}

/// A ranked hit returned by hybrid search.
///
/// `score` is the weighted blend of `vector_score` and `keyword_score`;
/// higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub slot: Slot,
    pub document: DocumentId,
    pub score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
}

/// One document queued for insertion together with its embedding.
#[derive(Debug, Clone)]
pub struct IngestItem {
    pub document: DocumentId,
    pub vector: Vec<f32>,
    pub metadata: DocumentMetadata,
}

impl IngestItem {
    pub fn new(document: impl Into<DocumentId>, vector: Vec<f32>) -> Self {
        Self { document: document.into(), vector, metadata: DocumentMetadata::default() }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Descriptive fields kept in the metadata store and shown next to results.
///
/// Every field is optional in practice: a document indexed before its
/// metadata was written resolves to `DocumentMetadata::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentMetadata {
    pub name: Option<String>,
    pub skills: Vec<String>,
    pub total_experience: f32,
    pub num_positions: usize,
    pub batch_id: Option<String>,
    pub batch_name: Option<String>,
    pub batch_time: Option<DateTime<Utc>>,
    /// Why the document could not be indexed in its upload batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentMetadata {
    pub fn is_failed(&self) -> bool { self.error.is_some() }
}
