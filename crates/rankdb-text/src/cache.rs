//! Per-slot raw text, filled on first use and kept for the process lifetime.
//!
//! Failed reads are not cached: the document may become readable later, so
//! the next lookup tries the source again. Entries are never evicted; a
//! loaded snapshot gets a fresh cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use rankdb_core::traits::DocumentSource;
use rankdb_core::types::Slot;
use rankdb_vector::DocumentMap;

#[derive(Debug, Default)]
pub struct TextCache {
    entries: Mutex<HashMap<Slot, Arc<str>>>,
}

impl TextCache {
    pub fn new() -> Self { Self::default() }

    /// Text of the document at `slot`, or empty text when it cannot be read.
    pub fn get_text(&self, slot: Slot, map: &DocumentMap, source: &dyn DocumentSource) -> Arc<str> {
        if let Some(text) = self.entries.lock().get(&slot) {
            return Arc::clone(text);
        }
        let document = match map.resolve(slot) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(slot, error = %e, "text requested for unmapped slot");
                return Arc::from("");
            }
        };
        // Read outside the lock; a racing reader may extract the same text twice.
        match source.read_text(document) {
            Ok(text) => {
                let text: Arc<str> = Arc::from(text);
                self.entries.lock().entry(slot).or_insert_with(|| Arc::clone(&text));
                text
            }
            Err(e) => {
                tracing::warn!(slot, document, error = %e, "document text unavailable; keyword evidence is empty");
                Arc::from("")
            }
        }
    }

    pub fn contains(&self, slot: Slot) -> bool { self.entries.lock().contains_key(&slot) }

    pub fn len(&self) -> usize { self.entries.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn clear(&self) { self.entries.lock().clear(); }
}
