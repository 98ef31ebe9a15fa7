//! Deterministic token-level text helpers used by the dimension scorers.
//!
//! Everything here works on lowercase alphanumeric tokens collected into
//! ordered sets, so results never depend on hash iteration order.

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "are", "was", "were", "will",
    "has", "have", "had", "its", "their", "our", "but", "not", "than", "then", "over", "under",
    "about", "which", "who", "what", "when", "where", "how", "why", "can", "could", "should",
    "would", "may", "might", "been", "being", "also", "such", "these", "those", "they", "them",
    "there", "per", "via", "all", "any", "each", "more", "most", "less", "least",
];

const POSITIVE_DIRECTION: &[&str] = &[
    "increase", "increased", "increases", "increasing", "growth", "grow", "grows", "growing",
    "rise", "rises", "rising", "gain", "gains", "expand", "expands", "expanding", "expansion",
    "higher", "improve", "improves", "improving", "outperform", "outperforms", "surge", "up",
];

const NEGATIVE_DIRECTION: &[&str] = &[
    "decrease", "decreased", "decreases", "decreasing", "decline", "declines", "declining",
    "fall", "falls", "falling", "drop", "drops", "dropping", "shrink", "shrinks", "shrinking",
    "contraction", "lower", "worsen", "worsens", "worsening", "underperform", "underperforms",
    "slump", "down",
];

/// Net direction asserted by a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    pub fn opposes(self, other: Polarity) -> bool {
        matches!(
            (self, other),
            (Self::Positive, Self::Negative) | (Self::Negative, Self::Positive)
        )
    }
}

fn raw_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Content tokens: lowercase, length ≥ 3, stopwords removed.
pub fn tokens(text: &str) -> BTreeSet<String> {
    raw_words(text)
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of `target` tokens present in `source`. Empty target yields `None`.
pub fn coverage(target: &BTreeSet<String>, source: &BTreeSet<String>) -> Option<f64> {
    if target.is_empty() {
        return None;
    }
    let hit = target.intersection(source).count();
    Some(hit as f64 / target.len() as f64)
}

/// Jaccard similarity of two token sets; 0.0 when both are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Number of `markers` occurring in `text` (case-insensitive substring match).
///
/// Each marker counts at most once.
pub fn count_markers(text: &str, markers: &[&str]) -> usize {
    let lower = text.to_lowercase();
    markers.iter().filter(|m| lower.contains(*m)).count()
}

/// Whether any of `markers` occurs in `text`.
pub fn contains_any(text: &str, markers: &[&str]) -> bool {
    count_markers(text, markers) > 0
}

/// Count of whitespace-separated tokens that contain a digit.
pub fn numeric_tokens(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_ascii_digit()))
        .count()
}

fn direction_counts(text: &str) -> (usize, usize) {
    let mut pos = 0;
    let mut neg = 0;
    for w in raw_words(text) {
        if POSITIVE_DIRECTION.contains(&w.as_str()) {
            pos += 1;
        } else if NEGATIVE_DIRECTION.contains(&w.as_str()) {
            neg += 1;
        }
    }
    (pos, neg)
}

pub fn polarity(text: &str) -> Polarity {
    let (pos, neg) = direction_counts(text);
    match pos.cmp(&neg) {
        std::cmp::Ordering::Greater => Polarity::Positive,
        std::cmp::Ordering::Less => Polarity::Negative,
        std::cmp::Ordering::Equal => Polarity::Neutral,
    }
}

/// Whether the passage asserts both directions at once.
pub fn mixed_direction(text: &str) -> bool {
    let (pos, neg) = direction_counts(text);
    pos > 0 && neg > 0
}
