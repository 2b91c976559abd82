//! Single-writer ingestion: index first, then metadata, then snapshot.
//!
//! The three steps are not one transaction. A crash between them leaves the
//! index ahead of the metadata store (or the other way round); readers
//! tolerate that by enriching unknown documents with empty metadata, and
//! directory ingestion asks the index, not the store, what is already in.
//!
//! Items of an upload batch that could not be indexed are still written to
//! the metadata store, stamped with the batch and carrying the error, so the
//! upload history can report them.

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

use rankdb_core::discovery::DocumentDiscovery;
use rankdb_core::error::{Error, Result};
use rankdb_core::traits::{Embedder, MetadataStore};
use rankdb_core::types::{DocumentId, DocumentMetadata, IngestItem, Slot};
use rankdb_embed::l2_normalize;

use crate::index::HybridIndex;

/// One item of a batch that was not indexed.
#[derive(Debug)]
pub struct ItemError {
    /// Position of the item in the submitted batch.
    pub position: usize,
    pub document: DocumentId,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub inserted: Vec<(DocumentId, Slot)>,
    pub failures: Vec<ItemError>,
    /// Documents left out because the index already holds them.
    pub skipped: usize,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool { self.failures.is_empty() }
}

/// Upload batch stamped onto the metadata of every document it ingests.
#[derive(Debug, Clone)]
pub struct BatchInfo {
    pub id: String,
    pub name: Option<String>,
    pub time: DateTime<Utc>,
}

impl BatchInfo {
    /// A batch identified by its own upload time.
    pub fn now() -> Self {
        let time = Utc::now();
        Self { id: time.to_rfc3339(), name: None, time }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn stamp(&self, metadata: &mut DocumentMetadata) {
        metadata.batch_id = Some(self.id.clone());
        metadata.batch_name = self.name.clone();
        metadata.batch_time = Some(self.time);
    }
}

pub struct IngestionPipeline {
    index: Arc<HybridIndex>,
    metadata: Arc<dyn MetadataStore>,
    writer: Mutex<()>,
    progress: ProgressBar,
}

impl IngestionPipeline {
    pub fn new(index: Arc<HybridIndex>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { index, metadata, writer: Mutex::new(()), progress: ProgressBar::hidden() }
    }

    /// Report directory ingestion progress on `bar`.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    pub fn index(&self) -> &Arc<HybridIndex> { &self.index }

    pub fn metadata(&self) -> &Arc<dyn MetadataStore> { &self.metadata }

    /// Insert one document. Unlike a batch, a bad vector fails the call.
    pub fn add_one(&self, item: IngestItem) -> Result<Slot> {
        let _writer = self.writer.lock();
        let slot = self.index.add_one(&item.document, &item.vector)?;
        self.metadata.upsert_many(vec![(item.document, item.metadata)])?;
        self.save_if_persistent()?;
        Ok(slot)
    }

    /// Insert items in order, skipping the ones that fail.
    ///
    /// Item failures land in the report. An `Err` means the metadata update or
    /// the snapshot save failed after the index had already been extended.
    pub fn add_batch(&self, items: Vec<IngestItem>) -> Result<BatchReport> {
        self.commit(items.into_iter().enumerate().collect(), BatchReport::default(), Vec::new())
    }

    /// Discover, read, and embed every new document under `dir`, then commit
    /// the results as one batch.
    ///
    /// Documents the index already holds are skipped; anything else is tried
    /// again, including documents whose earlier commit never reached the
    /// snapshot. Reading and embedding run on the rayon pool; only the commit
    /// is serialized.
    pub fn ingest_directory(
        &self,
        dir: &Path,
        discovery: &DocumentDiscovery,
        embedder: &dyn Embedder,
        batch: &BatchInfo,
    ) -> Result<BatchReport> {
        if !dir.is_dir() {
            return Err(Error::NotFound(dir.display().to_string()));
        }
        if embedder.dim() != self.index.dim() {
            return Err(Error::DimensionMismatch { expected: self.index.dim(), actual: embedder.dim() });
        }
        let mut report = BatchReport::default();
        let pending: Vec<(usize, DocumentId)> = discovery
            .list_documents(dir)
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|doc| {
                let known = self.index.contains_document(doc);
                if known {
                    report.skipped += 1;
                }
                !known
            })
            .enumerate()
            .collect();
        tracing::info!(dir = %dir.display(), pending = pending.len(), skipped = report.skipped, batch = %batch.id, "ingesting directory");

        self.progress.set_length(pending.len() as u64);
        self.progress.set_position(0);
        let prepared: Vec<(usize, DocumentId, Result<IngestItem>)> = pending
            .into_par_iter()
            .map(|(position, doc)| {
                let item = self.prepare(&doc, embedder, batch);
                self.progress.inc(1);
                (position, doc, item)
            })
            .collect();

        let mut items = Vec::with_capacity(prepared.len());
        let mut failed = Vec::new();
        for (position, document, outcome) in prepared {
            match outcome {
                Ok(item) => items.push((position, item)),
                Err(error) => {
                    tracing::warn!(%document, error = %error, "document not ingested");
                    let mut metadata = DocumentMetadata::default();
                    batch.stamp(&mut metadata);
                    metadata.error = Some(error.to_string());
                    failed.push((document.clone(), metadata));
                    report.failures.push(ItemError { position, document, error });
                }
            }
        }
        let report = self.commit(items, report, failed)?;
        self.progress.finish_with_message(format!("{} indexed, {} failed", report.inserted.len(), report.failures.len()));
        Ok(report)
    }

    fn prepare(&self, document: &str, embedder: &dyn Embedder, batch: &BatchInfo) -> Result<IngestItem> {
        let text = self.index.source().read_text(document)?;
        if text.trim().is_empty() {
            return Err(Error::unavailable(document, "no extractable text"));
        }
        let mut vector = embedder
            .embed_batch(&[text])
            .map_err(|e| Error::Operation(format!("embedding failed: {}", e)))?
            .pop()
            .ok_or_else(|| Error::Operation("embedder returned no vector".into()))?;
        l2_normalize(&mut vector);
        let mut metadata = DocumentMetadata::default();
        batch.stamp(&mut metadata);
        Ok(IngestItem::new(document, vector).with_metadata(metadata))
    }

    /// `failed` holds metadata for batch items that never reached the index;
    /// it is written alongside the successes.
    fn commit(
        &self,
        items: Vec<(usize, IngestItem)>,
        mut report: BatchReport,
        mut failed: Vec<(DocumentId, DocumentMetadata)>,
    ) -> Result<BatchReport> {
        let _writer = self.writer.lock();
        let (positions, items): (Vec<usize>, Vec<IngestItem>) = items.into_iter().unzip();
        let outcomes = self.index.add_many(&items);

        let mut metadata = Vec::with_capacity(items.len());
        for ((position, item), outcome) in positions.into_iter().zip(items).zip(outcomes) {
            match outcome {
                Ok(slot) => {
                    report.inserted.push((item.document.clone(), slot));
                    metadata.push((item.document, item.metadata));
                }
                Err(error) => {
                    tracing::warn!(document = %item.document, position, error = %error, "batch item rejected");
                    // A failed re-insert must not overwrite the metadata of the indexed copy.
                    if item.metadata.batch_id.is_some() && !self.index.contains_document(&item.document) {
                        let mut meta = item.metadata;
                        meta.error = Some(error.to_string());
                        failed.push((item.document.clone(), meta));
                    }
                    report.failures.push(ItemError { position, document: item.document, error });
                }
            }
        }
        report.failures.sort_by_key(|f| f.position);

        let grew = !metadata.is_empty();
        metadata.append(&mut failed);
        if !metadata.is_empty() {
            self.metadata.upsert_many(metadata)?;
        }
        if grew {
            self.save_if_persistent()?;
        }
        tracing::info!(
            inserted = report.inserted.len(),
            failed = report.failures.len(),
            skipped = report.skipped,
            slots = self.index.slot_count(),
            "batch committed"
        );
        Ok(report)
    }

    fn save_if_persistent(&self) -> Result<()> {
        if self.index.persistence().is_some() {
            self.index.save()?;
        }
        Ok(())
    }
}
