//! Source reputation lookup.
//!
//! Credibility scoring consults an injected, stateless [`SourceReputation`]
//! instead of holding its own caches. [`StaticReputationTable`] is the default
//! implementation and can be extended from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Read-only reputation lookup for author, institution, and publication names.
///
/// Returning `None` means "unknown"; the scorer then applies its own default.
pub trait SourceReputation: Send + Sync {
    fn author_score(&self, author: &str) -> Option<f64>;
    fn institution_score(&self, institution: &str) -> Option<f64>;
    fn publication_score(&self, publication: &str) -> Option<f64>;
}

/// Shared handle to a reputation lookup.
pub type SharedReputation = Arc<dyn SourceReputation>;

/// Reputation table keyed by lowercase name fragments.
///
/// A name matches a key if it equals the key or contains it as a whole
/// substring; the highest-scoring match wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticReputationTable {
    pub authors: BTreeMap<String, f64>,
    pub institutions: BTreeMap<String, f64>,
    pub publications: BTreeMap<String, f64>,
}

fn seed(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

fn lookup(table: &BTreeMap<String, f64>, name: &str) -> Option<f64> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(score) = table.get(&needle) {
        return Some(score.clamp(0.0, 1.0));
    }
    table
        .iter()
        .filter(|(key, _)| needle.contains(key.as_str()))
        .map(|(_, score)| score.clamp(0.0, 1.0))
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
}

impl StaticReputationTable {
    /// Empty table: every lookup is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with widely cited institutions and publications.
    pub fn with_defaults() -> Self {
        Self {
            authors: BTreeMap::new(),
            institutions: seed(&[
                ("mit", 0.95),
                ("stanford", 0.95),
                ("harvard", 0.95),
                ("oxford", 0.95),
                ("cambridge", 0.93),
                ("world bank", 0.92),
                ("imf", 0.92),
                ("oecd", 0.92),
                ("federal reserve", 0.92),
                ("european commission", 0.88),
                ("gartner", 0.82),
                ("forrester", 0.80),
                ("idc", 0.80),
                ("mckinsey", 0.80),
                ("bcg", 0.78),
                ("deloitte", 0.76),
            ]),
            publications: seed(&[
                ("nature", 0.97),
                ("science", 0.96),
                ("the lancet", 0.96),
                ("new england journal of medicine", 0.96),
                ("harvard business review", 0.88),
                ("financial times", 0.86),
                ("the economist", 0.86),
                ("wall street journal", 0.85),
                ("reuters", 0.85),
                ("bloomberg", 0.85),
                ("mit technology review", 0.84),
                ("techcrunch", 0.65),
                ("press release", 0.40),
                ("blog", 0.35),
            ]),
        }
    }

    pub fn author(mut self, name: &str, score: f64) -> Self {
        self.authors.insert(name.to_lowercase(), score);
        self
    }

    pub fn institution(mut self, name: &str, score: f64) -> Self {
        self.institutions.insert(name.to_lowercase(), score);
        self
    }

    pub fn publication(mut self, name: &str, score: f64) -> Self {
        self.publications.insert(name.to_lowercase(), score);
        self
    }

    /// Overlay entries from `other`, replacing duplicates.
    pub fn merged(mut self, other: &StaticReputationTable) -> Self {
        for (k, v) in &other.authors {
            self.authors.insert(k.to_lowercase(), *v);
        }
        for (k, v) in &other.institutions {
            self.institutions.insert(k.to_lowercase(), *v);
        }
        for (k, v) in &other.publications {
            self.publications.insert(k.to_lowercase(), *v);
        }
        self
    }
}

impl SourceReputation for StaticReputationTable {
    fn author_score(&self, author: &str) -> Option<f64> {
        lookup(&self.authors, author)
    }

    fn institution_score(&self, institution: &str) -> Option<f64> {
        lookup(&self.institutions, institution)
    }

    fn publication_score(&self, publication: &str) -> Option<f64> {
        lookup(&self.publications, publication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_substring_lookup() {
        let table = StaticReputationTable::with_defaults();
        assert_eq!(table.publication_score("Nature"), Some(0.97));
        assert_eq!(table.institution_score("MIT Sloan School"), Some(0.95));
        assert_eq!(table.publication_score("Unknown Gazette"), None);
    }

    #[test]
    fn test_highest_match_wins() {
        let table = StaticReputationTable::with_defaults();
        assert_eq!(table.publication_score("Nature Science Digest"), Some(0.97));
        assert_eq!(table.publication_score("MIT Technology Review"), Some(0.84));
    }

    #[test]
    fn test_builder_and_merge() {
        let extra = StaticReputationTable::new().author("Jane Analyst", 0.9);
        let table = StaticReputationTable::with_defaults().merged(&extra);
        assert_eq!(table.author_score("jane analyst"), Some(0.9));
        assert_eq!(table.author_score(""), None);
    }

    #[test]
    fn test_scores_are_clamped() {
        let table = StaticReputationTable::new().publication("hype weekly", 3.0);
        assert_eq!(table.publication_score("Hype Weekly"), Some(1.0));
    }
}
