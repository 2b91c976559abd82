use serde::{Deserialize, Serialize};

use rankdb_core::error::{Error, Result};
use rankdb_core::types::{DocumentId, Slot};

/// Append-only slot → document table; position in `entries` is the slot.
///
/// The same document may appear under several slots when it is indexed again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMap {
    entries: Vec<DocumentId>,
}

impl DocumentMap {
    pub fn new() -> Self { Self::default() }

    pub fn from_entries(entries: Vec<DocumentId>) -> Self { Self { entries } }

    /// Append `document` at `slot`, which must be the next free slot.
    pub fn record(&mut self, slot: Slot, document: impl Into<DocumentId>) -> Result<()> {
        if slot != self.entries.len() {
            return Err(Error::Operation(format!(
                "slot {} recorded out of order; next slot is {}",
                slot,
                self.entries.len()
            )));
        }
        self.entries.push(document.into());
        Ok(())
    }

    pub fn resolve(&self, slot: Slot) -> Result<&str> {
        self.entries.get(slot).map(String::as_str).ok_or(Error::UnknownSlot(slot))
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entries(&self) -> &[DocumentId] { &self.entries }

    /// Slots currently pointing at `document`.
    pub fn slots_of<'a>(&'a self, document: &'a str) -> impl Iterator<Item = Slot> + 'a {
        self.entries.iter().enumerate().filter(move |(_, d)| d.as_str() == document).map(|(s, _)| s)
    }
}
