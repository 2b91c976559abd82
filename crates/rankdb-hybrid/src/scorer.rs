//! Two-stage hybrid ranking: vector over-fetch, keyword pre-filter, blend.

use std::cmp::Ordering;

use rankdb_core::config::{PrefilterMode, ScoringSettings};
use rankdb_core::error::Result;
use rankdb_core::traits::{DocumentSource, NearestNeighbors};
use rankdb_core::types::{Candidate, ScoredResult};
use rankdb_text::keywords::keyword_density;
use rankdb_text::{Keywords, TextCache};
use rankdb_vector::DocumentMap;

/// Read-only borrow of everything a query touches.
pub struct IndexView<'a> {
    pub vectors: &'a dyn NearestNeighbors,
    pub map: &'a DocumentMap,
    pub texts: &'a TextCache,
    pub source: &'a dyn DocumentSource,
}

#[derive(Debug, Clone)]
pub struct HybridScorer {
    settings: ScoringSettings,
    overfetch: usize,
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self::new(ScoringSettings::default(), 10)
    }
}

struct Evidence {
    candidate: Candidate,
    text_lower: String,
}

impl HybridScorer {
    pub fn new(settings: ScoringSettings, overfetch: usize) -> Self {
        Self { settings, overfetch: overfetch.max(1) }
    }

    pub fn settings(&self) -> &ScoringSettings { &self.settings }

    pub fn overfetch(&self) -> usize { self.overfetch }

    /// Rank at most `k` documents for an embedded query and its raw text.
    ///
    /// Empty `query_text` is allowed and ranks purely by vector similarity.
    pub fn search(
        &self,
        view: &IndexView<'_>,
        query_vector: &[f32],
        query_text: &str,
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let raw = view.vectors.search_nearest(query_vector, k.saturating_mul(self.overfetch))?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let keywords = Keywords::from_query(query_text);

        let evidence: Vec<Evidence> = raw
            .into_iter()
            .filter(|c| view.map.resolve(c.slot).is_ok())
            .map(|candidate| {
                let text_lower = if keywords.is_empty() {
                    String::new()
                } else {
                    view.texts.get_text(candidate.slot, view.map, view.source).to_lowercase()
                };
                Evidence { candidate, text_lower }
            })
            .collect();
        let raw_count = evidence.len();
        let chosen = self.prefilter(evidence, &keywords);

        let mut results = Vec::with_capacity(chosen.len());
        for ev in chosen {
            let vector_score = 1.0 - ev.candidate.distance;
            let keyword_score = keyword_density(keywords.occurrences(&ev.text_lower), self.settings.keyword_cap);
            results.push(ScoredResult {
                slot: ev.candidate.slot,
                document: view.map.resolve(ev.candidate.slot)?.to_string(),
                score: self.settings.vector_weight * vector_score + self.settings.keyword_weight * keyword_score,
                vector_score,
                keyword_score,
            });
        }
        results.sort_by(by_score_then_slot);
        results.truncate(k);

        tracing::debug!(
            candidates = raw_count,
            keywords = keywords.len(),
            returned = results.len(),
            "hybrid search"
        );
        Ok(results)
    }

    fn prefilter(&self, evidence: Vec<Evidence>, keywords: &Keywords) -> Vec<Evidence> {
        let total = evidence.len();
        let (matched, unmatched): (Vec<Evidence>, Vec<Evidence>) =
            evidence.into_iter().partition(|ev| keywords.any_in(&ev.text_lower));
        let keep_filtered = match self.settings.prefilter {
            PrefilterMode::Legacy => matched.len() == total,
            PrefilterMode::PreferMatches => !matched.is_empty(),
        };
        if keep_filtered {
            return matched;
        }
        let mut all = matched;
        all.extend(unmatched);
        all
    }
}

/// Ordering used for final results: blended score descending, then slot.
pub fn by_score_then_slot(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score.total_cmp(&a.score).then(a.slot.cmp(&b.slot))
}
