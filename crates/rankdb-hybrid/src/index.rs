//! The hybrid index service: vectors, slot map and text cache behind one lock.
//!
//! Searches take the read side; inserts and snapshot swaps take the write
//! side, so a query never observes a vector without its map entry or a map
//! from a different snapshot than its vectors.

use parking_lot::RwLock;
use std::sync::Arc;

use rankdb_core::config::{expand_path, Settings};
use rankdb_core::error::{Error, Result};
use rankdb_core::traits::{DocumentSource, NearestNeighbors};
use rankdb_core::types::{DocumentId, IngestItem, ScoredResult, Slot};
use rankdb_text::TextCache;
use rankdb_vector::{DocumentMap, FlatIndex, PersistenceManager};

use crate::scorer::{HybridScorer, IndexView};

struct IndexState {
    vectors: FlatIndex,
    map: DocumentMap,
    texts: TextCache,
}

impl IndexState {
    fn empty(dim: usize) -> Self {
        Self::from_parts(FlatIndex::new(dim), DocumentMap::new())
    }

    fn from_parts(vectors: FlatIndex, map: DocumentMap) -> Self {
        Self { vectors, map, texts: TextCache::new() }
    }

    fn insert(&mut self, document: &str, vector: &[f32]) -> Result<Slot> {
        let expected = self.vectors.dim();
        if vector.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: vector.len() });
        }
        if self.vectors.len() != self.map.len() {
            return Err(Error::Operation(format!(
                "index holds {} vectors but map holds {} entries",
                self.vectors.len(),
                self.map.len()
            )));
        }
        let slot = self.vectors.add(vector)?;
        self.map.record(slot, document)?;
        Ok(slot)
    }
}

pub struct HybridIndex {
    dim: usize,
    state: RwLock<IndexState>,
    source: Arc<dyn DocumentSource>,
    scorer: HybridScorer,
    persistence: Option<PersistenceManager>,
}

impl HybridIndex {
    /// Empty, memory-only index.
    pub fn new(dim: usize, source: Arc<dyn DocumentSource>, scorer: HybridScorer) -> Self {
        Self { dim, state: RwLock::new(IndexState::empty(dim)), source, scorer, persistence: None }
    }

    pub fn with_persistence(mut self, persistence: PersistenceManager) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Build from settings and restore the snapshot at `index.base_path` if one
    /// exists. A snapshot that fails to load is logged and replaced by an empty
    /// index; use [`HybridIndex::load`] to treat that as an error instead.
    pub fn open(settings: &Settings, source: Arc<dyn DocumentSource>) -> Self {
        let scorer = HybridScorer::new(settings.scoring.clone(), settings.index.overfetch);
        let persistence = PersistenceManager::new(expand_path(&settings.index.base_path));
        let index = Self::new(settings.index.dim, source, scorer).with_persistence(persistence.clone());
        if !persistence.exists() {
            tracing::info!(base = %persistence.base().display(), "no snapshot found; starting empty");
            return index;
        }
        if let Err(e) = index.load() {
            tracing::warn!(base = %persistence.base().display(), error = %e, "snapshot unusable; starting empty");
        }
        index
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn scorer(&self) -> &HybridScorer { &self.scorer }

    pub fn source(&self) -> &Arc<dyn DocumentSource> { &self.source }

    pub fn persistence(&self) -> Option<&PersistenceManager> { self.persistence.as_ref() }

    pub fn slot_count(&self) -> usize { self.state.read().vectors.len() }

    pub fn clear_text_cache(&self) { self.state.read().texts.clear(); }

    /// Whether any slot points at `document`. The index, not the metadata
    /// store, decides what has been ingested.
    pub fn contains_document(&self, document: &str) -> bool {
        self.state.read().map.slots_of(document).next().is_some()
    }

    pub fn resolve(&self, slot: Slot) -> Result<DocumentId> {
        self.state.read().map.resolve(slot).map(str::to_string)
    }

    /// Insert one vector and its document as a single step.
    pub fn add_one(&self, document: &str, vector: &[f32]) -> Result<Slot> {
        self.state.write().insert(document, vector)
    }

    /// Insert items in order under one write lock; each item succeeds or
    /// fails on its own.
    pub fn add_many(&self, items: &[IngestItem]) -> Vec<Result<Slot>> {
        let mut state = self.state.write();
        items.iter().map(|item| state.insert(&item.document, &item.vector)).collect()
    }

    pub fn search(&self, query_vector: &[f32], query_text: &str, k: usize) -> Result<Vec<ScoredResult>> {
        let state = self.state.read();
        let view = IndexView {
            vectors: &state.vectors,
            map: &state.map,
            texts: &state.texts,
            source: self.source.as_ref(),
        };
        self.scorer.search(&view, query_vector, query_text, k)
    }

    pub fn save(&self) -> Result<()> {
        let persistence = self.require_persistence()?;
        self.save_to(persistence)
    }

    pub fn save_to(&self, persistence: &PersistenceManager) -> Result<()> {
        let state = self.state.read();
        persistence.save(&state.vectors, &state.map)
    }

    pub fn load(&self) -> Result<()> {
        let persistence = self.require_persistence()?;
        self.load_from(persistence)
    }

    /// Replace the whole index with a snapshot. The snapshot is read before
    /// the write lock is taken; the swap itself is instantaneous for readers.
    pub fn load_from(&self, persistence: &PersistenceManager) -> Result<()> {
        let (vectors, map) = persistence.load(self.dim)?;
        let loaded = IndexState::from_parts(vectors, map);
        *self.state.write() = loaded;
        Ok(())
    }

    /// Final save before the service goes away, when persistence is configured.
    pub fn teardown(self) -> Result<()> {
        match &self.persistence {
            Some(p) => self.save_to(p),
            None => Ok(()),
        }
    }

    fn require_persistence(&self) -> Result<&PersistenceManager> {
        self.persistence
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("index has no snapshot path configured".into()))
    }
}
