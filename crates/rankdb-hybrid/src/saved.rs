//! Shortlist of documents a user has saved from search results.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use rankdb_core::error::{Error, Result};
use rankdb_core::traits::MetadataStore;
use rankdb_core::types::{DocumentId, DocumentMetadata};

use crate::metadata::{read_json_or_default, write_json};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedCandidate {
    pub document: DocumentId,
    pub metadata: DocumentMetadata,
}

/// Saved documents, persisted as a JSON array when opened from a file.
#[derive(Debug, Default)]
pub struct SavedCandidates {
    path: Option<PathBuf>,
    entries: RwLock<BTreeSet<DocumentId>>,
}

impl SavedCandidates {
    pub fn in_memory() -> Self { Self::default() }

    /// Open the list at `path`; a missing file is an empty list.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeSet<DocumentId> = read_json_or_default(&path)?;
        tracing::debug!(path = %path.display(), saved = entries.len(), "saved candidates opened");
        Ok(Self { path: Some(path), entries: RwLock::new(entries) })
    }

    /// Add `document` to the list. Only documents that were indexed
    /// successfully, according to `store`, can be saved. Saving twice is a
    /// no-op.
    pub fn save(&self, document: &str, store: &dyn MetadataStore) -> Result<()> {
        match store.get(document) {
            Some(meta) if !meta.is_failed() => {}
            _ => return Err(Error::NotFound(document.to_string())),
        }
        let mut entries = self.entries.write();
        if entries.contains(document) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.insert(document.to_string());
        if let Some(path) = &self.path {
            write_json(path, &next)?;
        }
        *entries = next;
        tracing::info!(%document, "candidate saved");
        Ok(())
    }

    pub fn contains(&self, document: &str) -> bool { self.entries.read().contains(document) }

    /// Saved documents in identifier order.
    pub fn list(&self) -> Vec<DocumentId> { self.entries.read().iter().cloned().collect() }

    /// Saved documents with their current metadata; entries the store no
    /// longer knows get empty metadata.
    pub fn enriched(&self, store: &dyn MetadataStore) -> Vec<SavedCandidate> {
        self.list()
            .into_iter()
            .map(|document| {
                let metadata = store.get(&document).unwrap_or_default();
                SavedCandidate { document, metadata }
            })
            .collect()
    }
}
