//! Write-through embedding cache keyed by content hash.
//!
//! Entries are addressed by `(embedder_id, blake3(text))`, so switching models
//! never serves a stale vector. Only misses reach the wrapped embedder, and
//! they are embedded as one batch.

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::collections::HashMap;

use rankdb_core::traits::Embedder;

pub fn hash_content(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

pub struct CachedEmbedder<E> {
    inner: E,
    /// 0 keeps every entry.
    capacity: usize,
    entries: Mutex<HashMap<String, Vec<f32>>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        Self { inner, capacity, entries: Mutex::new(HashMap::new()) }
    }

    pub fn inner(&self) -> &E { &self.inner }

    pub fn len(&self) -> usize { self.entries.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn key(&self, text: &str) -> String {
        format!("{}:{}", self.inner.embedder_id(), hash_content(text))
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { self.inner.dim() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| self.key(t)).collect();
        let mut vectors: Vec<Option<Vec<f32>>> = {
            let entries = self.entries.lock();
            keys.iter().map(|k| entries.get(k).cloned()).collect()
        };
        let miss_indices: Vec<usize> = (0..texts.len()).filter(|&i| vectors[i].is_none()).collect();
        if !miss_indices.is_empty() {
            let miss_texts: Vec<String> = miss_indices.iter().map(|&i| texts[i].clone()).collect();
            let embs = self.inner.embed_batch(&miss_texts)?;
            if embs.len() != miss_texts.len() {
                return Err(anyhow!("embedder returned {} vectors for {} texts", embs.len(), miss_texts.len()));
            }
            let mut entries = self.entries.lock();
            for (&i, v) in miss_indices.iter().zip(embs) {
                if self.capacity == 0 || entries.len() < self.capacity {
                    entries.insert(keys[i].clone(), v.clone());
                }
                vectors[i] = Some(v);
            }
        }
        tracing::debug!(total = texts.len(), misses = miss_indices.len(), "embedding cache lookup");
        vectors
            .into_iter()
            .map(|v| v.ok_or_else(|| anyhow!("missing embedding")))
            .collect()
    }
}
