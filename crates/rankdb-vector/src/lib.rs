//! rankdb-vector
//!
//! Exact nearest-neighbor storage (`FlatIndex`), the slot → document table
//! that grows beside it (`DocumentMap`), and the paired on-disk snapshot of
//! both (`PersistenceManager`).

pub mod flat;
pub mod map;
pub mod snapshot;

pub use flat::FlatIndex;
pub use map::DocumentMap;
pub use snapshot::PersistenceManager;
