//! Embedding helpers for rankdb.
//!
//! Model inference lives outside this workspace; what ships here is the
//! normalization every provider must apply, a deterministic hashing embedder
//! for development and tests, and a content-addressed embedding cache.

use anyhow::{anyhow, Result};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use rankdb_core::traits::Embedder;

pub mod cache;

pub use cache::CachedEmbedder;

/// Scale `v` to unit length in place. Zero vectors stay zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-10);
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Bag-of-tokens embedder: every whitespace token is hashed into one bucket.
///
/// Texts sharing tokens land close together, which is enough to exercise
/// ranking end to end without loading a model.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{}", dim) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 {
            return v;
        }
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Default embedder for the engine: the hashing embedder behind a content
/// cache holding at most `cache_capacity` vectors (0 = unbounded).
pub fn get_default_embedder(dim: usize, cache_capacity: usize) -> Result<Box<dyn Embedder>> {
    if dim == 0 { return Err(anyhow!("embedding dimension must be positive")); }
    tracing::info!(dim, cache_capacity, "using cached hashing embedder");
    Ok(Box::new(CachedEmbedder::new(HashEmbedder::new(dim), cache_capacity)))
}
