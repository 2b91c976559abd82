//! Metadata stores keyed by document identifier.
//!
//! The index never reads these while scoring; they are written during
//! ingestion and read back only to decorate results.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rankdb_core::error::Result;
use rankdb_core::traits::MetadataStore;
use rankdb_core::types::{DocumentId, DocumentMetadata};

#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    entries: RwLock<BTreeMap<DocumentId, DocumentMetadata>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self { Self::default() }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, document: &str) -> Option<DocumentMetadata> {
        self.entries.read().get(document).cloned()
    }

    fn upsert_many(&self, entries: Vec<(DocumentId, DocumentMetadata)>) -> Result<()> {
        self.entries.write().extend(entries);
        Ok(())
    }

    fn all(&self) -> Vec<(DocumentId, DocumentMetadata)> {
        self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// JSON file holding one object keyed by document identifier.
///
/// Every upsert rewrites the file through a temp file and a rename.
#[derive(Debug)]
pub struct JsonMetadataStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<DocumentId, DocumentMetadata>>,
}

impl JsonMetadataStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        tracing::info!(path = %path.display(), documents = entries.len(), "metadata store opened");
        Ok(Self { path, entries: RwLock::new(entries) })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Pick up writes made by another process.
    pub fn reload(&self) -> Result<()> {
        let entries = read_entries(&self.path)?;
        *self.entries.write() = entries;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<DocumentId, DocumentMetadata>) -> Result<()> {
        write_json(&self.path, entries)
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<DocumentId, DocumentMetadata>> {
    read_json_or_default(path)
}

/// Replace `path` with the pretty JSON of `value` through a temp file.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// A missing file reads as `T::default()`.
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl MetadataStore for JsonMetadataStore {
    fn get(&self, document: &str) -> Option<DocumentMetadata> {
        self.entries.read().get(document).cloned()
    }

    fn upsert_many(&self, entries: Vec<(DocumentId, DocumentMetadata)>) -> Result<()> {
        let mut current = self.entries.write();
        let mut next = current.clone();
        next.extend(entries);
        self.persist(&next)?;
        *current = next;
        Ok(())
    }

    fn all(&self) -> Vec<(DocumentId, DocumentMetadata)> {
        self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
