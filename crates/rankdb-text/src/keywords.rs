use std::collections::BTreeSet;

/// Lowercased, de-duplicated whitespace tokens of a query.
///
/// No stemming and no stop-word removal: a token matches wherever it occurs
/// as a substring of the lowercased document text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords {
    tokens: BTreeSet<String>,
}

impl Keywords {
    pub fn from_query(query: &str) -> Self {
        Self { tokens: query.to_lowercase().split_whitespace().map(str::to_string).collect() }
    }

    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }

    pub fn len(&self) -> usize { self.tokens.len() }

    pub fn iter(&self) -> impl Iterator<Item = &str> { self.tokens.iter().map(String::as_str) }

    /// `text_lower` must already be lowercased.
    pub fn any_in(&self, text_lower: &str) -> bool {
        self.tokens.iter().any(|t| text_lower.contains(t.as_str()))
    }

    /// Non-overlapping occurrences of every token, summed.
    pub fn occurrences(&self, text_lower: &str) -> usize {
        self.tokens.iter().map(|t| text_lower.matches(t.as_str()).count()).sum()
    }
}

/// Occurrence count scaled to `[0, 1]`, saturating at `cap` occurrences.
pub fn keyword_density(occurrences: usize, cap: usize) -> f32 {
    (occurrences as f32 / cap.max(1) as f32).min(1.0)
}
