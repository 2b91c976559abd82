//! Paired on-disk snapshot of a `FlatIndex` and its `DocumentMap`.
//!
//! Two artifacts live beside a base path:
//! - `<base>.index`: `RKIX` magic, the bincode-encoded `IndexArtifact`
//!   (version, dim, count, row-major `f32` payload), then the blake3 digest of
//!   everything before it.
//! - `<base>_map.json`: the slot → document table plus the index digest it
//!   was written with.
//!
//! Both are written to `*.tmp` and renamed only after both writes succeed.
//! A crash between the two renames leaves a map whose recorded digest does
//! not match the index, which `load` reports as corruption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rankdb_core::error::{Error, Result};
use rankdb_core::traits::NearestNeighbors;
use rankdb_core::types::DocumentId;

use crate::{DocumentMap, FlatIndex};

const INDEX_MAGIC: &[u8; 4] = b"RKIX";
const FORMAT_VERSION: u32 = 2;
const DIGEST_LEN: usize = 32;

/// Body of the index artifact, between the magic and the digest trailer.
#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact<'a> {
    version: u32,
    dim: usize,
    count: usize,
    data: Cow<'a, [f32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapArtifact {
    version: u32,
    dim: usize,
    count: usize,
    index_digest: String,
    saved_at: DateTime<Utc>,
    entries: Vec<DocumentId>,
}

#[derive(Debug, Clone)]
pub struct PersistenceManager {
    base: PathBuf,
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = base.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

impl PersistenceManager {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path { &self.base }

    pub fn index_path(&self) -> PathBuf { with_suffix(&self.base, ".index") }

    pub fn map_path(&self) -> PathBuf { with_suffix(&self.base, "_map.json") }

    /// True when at least one artifact is on disk.
    pub fn exists(&self) -> bool {
        self.index_path().exists() || self.map_path().exists()
    }

    pub fn save(&self, index: &FlatIndex, map: &DocumentMap) -> Result<()> {
        if index.len() != map.len() {
            return Err(Error::Operation(format!(
                "refusing to save {} vectors with {} map entries",
                index.len(),
                map.len()
            )));
        }
        if let Some(parent) = self.base.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let index_bytes = encode_index(index)?;
        let digest = blake3::hash(&index_bytes[..index_bytes.len() - DIGEST_LEN]).to_hex().to_string();
        let artifact = MapArtifact {
            version: FORMAT_VERSION,
            dim: index.dim(),
            count: map.len(),
            index_digest: digest,
            saved_at: Utc::now(),
            entries: map.entries().to_vec(),
        };
        let map_bytes = serde_json::to_vec(&artifact)?;

        let (index_path, map_path) = (self.index_path(), self.map_path());
        let index_tmp = with_suffix(&index_path, ".tmp");
        let map_tmp = with_suffix(&map_path, ".tmp");
        write_synced(&index_tmp, &index_bytes)?;
        write_synced(&map_tmp, &map_bytes)?;
        fs::rename(&index_tmp, &index_path)?;
        fs::rename(&map_tmp, &map_path)?;

        tracing::info!(base = %self.base.display(), vectors = index.len(), dim = index.dim(), "snapshot saved");
        Ok(())
    }

    /// Read both artifacts back. `expected_dim` is the dimension the caller is
    /// configured with; a snapshot written with another dimension is rejected.
    pub fn load(&self, expected_dim: usize) -> Result<(FlatIndex, DocumentMap)> {
        let index_path = self.index_path();
        let map_path = self.map_path();
        let index_bytes = fs::read(&index_path)
            .map_err(|e| Error::corrupt(format!("cannot read {}: {}", index_path.display(), e)))?;
        let map_bytes = fs::read(&map_path)
            .map_err(|e| Error::corrupt(format!("cannot read {}: {}", map_path.display(), e)))?;

        let (index, digest) = decode_index(&index_bytes)?;
        let artifact: MapArtifact = serde_json::from_slice(&map_bytes)
            .map_err(|e| Error::corrupt(format!("unreadable map artifact: {}", e)))?;

        if index.dim() != expected_dim {
            return Err(Error::corrupt(format!(
                "snapshot dimension {} differs from configured dimension {}",
                index.dim(),
                expected_dim
            )));
        }
        if artifact.version != FORMAT_VERSION || artifact.dim != index.dim() {
            return Err(Error::corrupt("map artifact does not describe this index"));
        }
        if artifact.count != artifact.entries.len() || artifact.entries.len() != index.len() {
            return Err(Error::corrupt(format!(
                "index holds {} vectors but map holds {} entries",
                index.len(),
                artifact.entries.len()
            )));
        }
        if artifact.index_digest != digest {
            return Err(Error::corrupt("map artifact was written for a different index artifact"));
        }

        tracing::info!(base = %self.base.display(), vectors = index.len(), saved_at = %artifact.saved_at, "snapshot loaded");
        Ok((index, DocumentMap::from_entries(artifact.entries)))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn encode_index(index: &FlatIndex) -> Result<Vec<u8>> {
    let artifact = IndexArtifact {
        version: FORMAT_VERSION,
        dim: index.dim(),
        count: index.len(),
        data: Cow::Borrowed(index.as_slice()),
    };
    let body = bincode::serialize(&artifact)
        .map_err(|e| Error::Operation(format!("cannot encode index artifact: {}", e)))?;
    let mut out = Vec::with_capacity(INDEX_MAGIC.len() + body.len() + DIGEST_LEN);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&body);
    let digest = blake3::hash(&out);
    out.extend_from_slice(digest.as_bytes());
    Ok(out)
}

fn decode_index(bytes: &[u8]) -> Result<(FlatIndex, String)> {
    if bytes.len() < INDEX_MAGIC.len() + DIGEST_LEN || !bytes.starts_with(INDEX_MAGIC) {
        return Err(Error::corrupt("index artifact has no valid header"));
    }
    let (covered, stored) = bytes.split_at(bytes.len() - DIGEST_LEN);
    let digest = blake3::hash(covered);
    if digest.as_bytes() != stored {
        return Err(Error::corrupt("index artifact checksum mismatch"));
    }

    let artifact: IndexArtifact<'_> = bincode::deserialize(&covered[INDEX_MAGIC.len()..])
        .map_err(|e| Error::corrupt(format!("undecodable index artifact: {}", e)))?;
    if artifact.version != FORMAT_VERSION {
        return Err(Error::corrupt(format!("unsupported index format version {}", artifact.version)));
    }
    if artifact.count.checked_mul(artifact.dim) != Some(artifact.data.len()) {
        return Err(Error::corrupt(format!(
            "index artifact claims {} vectors of dimension {} but holds {} values",
            artifact.count,
            artifact.dim,
            artifact.data.len()
        )));
    }
    let index = FlatIndex::from_raw(artifact.dim, artifact.data.into_owned())
        .map_err(|e| Error::corrupt(e.to_string()))?;
    Ok((index, digest.to_hex().to_string()))
}
