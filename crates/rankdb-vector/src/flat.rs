use std::cmp::Ordering;

use rankdb_core::error::{Error, Result};
use rankdb_core::traits::NearestNeighbors;
use rankdb_core::types::{Candidate, Slot};

/// Brute-force index over row-major `f32` vectors.
///
/// Every search scans all stored vectors; there is no deletion or update.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    /// Rebuild from row-major storage, e.g. when loading a snapshot.
    pub fn from_raw(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(Error::corrupt(format!(
                "{} stored values do not form rows of dimension {}",
                data.len(),
                dim
            )));
        }
        Ok(Self { dim, data })
    }

    pub fn as_slice(&self) -> &[f32] { &self.data }

    fn check_dim(&self, actual: usize) -> Result<()> {
        if actual != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual });
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn by_distance_then_slot(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance.total_cmp(&b.distance).then(a.slot.cmp(&b.slot))
}

impl NearestNeighbors for FlatIndex {
    fn dim(&self) -> usize { self.dim }

    fn len(&self) -> usize { self.data.len() / self.dim.max(1) }

    fn add(&mut self, vector: &[f32]) -> Result<Slot> {
        self.check_dim(vector.len())?;
        let slot = self.len();
        self.data.extend_from_slice(vector);
        Ok(slot)
    }

    fn search_nearest(&self, query: &[f32], n: usize) -> Result<Vec<Candidate>> {
        self.check_dim(query.len())?;
        if n == 0 || self.data.is_empty() { return Ok(Vec::new()); }
        let mut hits: Vec<Candidate> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(slot, row)| Candidate { slot, distance: squared_l2(query, row) })
            .collect();
        if n < hits.len() {
            hits.select_nth_unstable_by(n - 1, by_distance_then_slot);
            hits.truncate(n);
        }
        hits.sort_by(by_distance_then_slot);
        Ok(hits)
    }
}
