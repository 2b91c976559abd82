//! Hybrid retrieval for rankdb: exact vector search blended with keyword
//! evidence, plus the ingestion and presentation layers around it.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;

use rankdb_core::config::{expand_path, Settings};
use rankdb_core::discovery::DocumentDiscovery;
use rankdb_core::traits::{Embedder, MetadataStore};
use rankdb_embed::{get_default_embedder, l2_normalize};
use rankdb_text::FsDocumentSource;

pub mod enrich;
pub mod index;
pub mod ingest;
pub mod metadata;
pub mod saved;
pub mod scorer;

pub use enrich::{
    enrich, recent_batches, BatchFile, BatchStatus, BatchSummary, EnrichedResult, SearchHistory, SearchRecord,
    HISTORY_LIMIT,
};
pub use index::HybridIndex;
pub use ingest::{BatchInfo, BatchReport, IngestionPipeline, ItemError};
pub use metadata::{InMemoryMetadataStore, JsonMetadataStore};
pub use saved::{SavedCandidate, SavedCandidates};
pub use scorer::{HybridScorer, IndexView};

/// Query and ingestion front door: embeds text, runs hybrid search over the
/// shared index, and decorates results with metadata.
pub struct HybridSearchEngine {
    index: Arc<HybridIndex>,
    pipeline: IngestionPipeline,
    embedder: Box<dyn Embedder>,
    history: SearchHistory,
    saved: SavedCandidates,
}

impl HybridSearchEngine {
    pub fn new(index: Arc<HybridIndex>, metadata: Arc<dyn MetadataStore>, embedder: Box<dyn Embedder>) -> Result<Self> {
        if embedder.dim() != index.dim() {
            return Err(anyhow!(
                "embedder {} produces {} dimensions but the index expects {}",
                embedder.embedder_id(),
                embedder.dim(),
                index.dim()
            ));
        }
        let pipeline = IngestionPipeline::new(index.clone(), metadata);
        Ok(Self { index, pipeline, embedder, history: SearchHistory::default(), saved: SavedCandidates::in_memory() })
    }

    /// Wire the filesystem source, the JSON metadata store, the saved list and
    /// the cached hashing embedder from settings, restoring the snapshot if
    /// present.
    pub fn open(settings: &Settings) -> Result<Self> {
        let index = Arc::new(HybridIndex::open(settings, Arc::new(FsDocumentSource::new())));
        let metadata_path = expand_path(&settings.metadata.path);
        let metadata = JsonMetadataStore::open(&metadata_path)
            .with_context(|| format!("opening metadata store {}", metadata_path.display()))?;
        let saved_path = expand_path(&settings.metadata.saved_path);
        let saved = SavedCandidates::open(&saved_path)
            .with_context(|| format!("opening saved candidates {}", saved_path.display()))?;
        let embedder = get_default_embedder(settings.index.dim, settings.embed.cache_capacity)?;
        Ok(Self::new(index, Arc::new(metadata), embedder)?.with_saved_candidates(saved))
    }

    pub fn with_saved_candidates(mut self, saved: SavedCandidates) -> Self {
        self.saved = saved;
        self
    }

    pub fn with_progress(mut self, bar: indicatif::ProgressBar) -> Self {
        self.pipeline = self.pipeline.with_progress(bar);
        self
    }

    pub fn index(&self) -> &Arc<HybridIndex> { &self.index }

    pub fn pipeline(&self) -> &IngestionPipeline { &self.pipeline }

    pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }

    pub fn query(&self, query: &str, k: usize) -> Result<Vec<EnrichedResult>> {
        let mut q_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;
        l2_normalize(&mut q_vec);
        let hits = self.index.search(&q_vec, query, k)?;
        let enriched = enrich(hits, self.pipeline.metadata().as_ref());
        self.history.record(query, &enriched);
        Ok(enriched)
    }

    pub fn index_directory(&self, dir: &Path, discovery: &DocumentDiscovery, batch: &BatchInfo) -> Result<BatchReport> {
        Ok(self.pipeline.ingest_directory(dir, discovery, self.embedder.as_ref(), batch)?)
    }

    pub fn recent_searches(&self) -> Vec<SearchRecord> { self.history.recent() }

    pub fn recent_uploads(&self) -> Vec<BatchSummary> {
        recent_batches(self.pipeline.metadata().as_ref(), HISTORY_LIMIT)
    }

    /// Shortlist an indexed document. Unknown documents are `NotFound`.
    pub fn save_candidate(&self, document: &str) -> Result<()> {
        Ok(self.saved.save(document, self.pipeline.metadata().as_ref())?)
    }

    pub fn is_saved(&self, document: &str) -> bool { self.saved.contains(document) }

    pub fn saved_candidates(&self) -> Vec<SavedCandidate> {
        self.saved.enriched(self.pipeline.metadata().as_ref())
    }

    /// Save the index one last time when a snapshot path is configured.
    pub fn teardown(self) -> Result<()> {
        let Self { index, pipeline, .. } = self;
        drop(pipeline);
        match Arc::try_unwrap(index) {
            Ok(index) => index.teardown()?,
            Err(shared) if shared.persistence().is_some() => shared.save()?,
            Err(_) => {}
        }
        Ok(())
    }
}
