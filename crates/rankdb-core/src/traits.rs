//! Seams between the index and its collaborators.

use crate::error::Result;
use crate::types::{Candidate, DocumentId, DocumentMetadata, Slot};

/// Turns text into fixed-dimension vectors.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `hash:xxh64:d768`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbor structure over fixed-dimension vectors.
///
/// Implementations must assign slots densely in insertion order and order
/// search hits by ascending distance, breaking ties by ascending slot.
pub trait NearestNeighbors: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn add(&mut self, vector: &[f32]) -> Result<Slot>;
    fn search_nearest(&self, query: &[f32], n: usize) -> Result<Vec<Candidate>>;
}

/// Reads and extracts the raw text of a document by identifier.
pub trait DocumentSource: Send + Sync {
    fn read_text(&self, document: &str) -> Result<String>;
}

/// Per-document descriptive fields, keyed by document identifier.
pub trait MetadataStore: Send + Sync {
    fn get(&self, document: &str) -> Option<DocumentMetadata>;
    fn contains(&self, document: &str) -> bool {
        self.get(document).is_some()
    }
    /// Insert or replace entries, persisting them if the store is durable.
    fn upsert_many(&self, entries: Vec<(DocumentId, DocumentMetadata)>) -> Result<()>;
    fn all(&self) -> Vec<(DocumentId, DocumentMetadata)>;
}
