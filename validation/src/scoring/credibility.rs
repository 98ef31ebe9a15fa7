//! Credibility dimension.
//!
//! | Factor                  | Weight |
//! |-------------------------|--------|
//! | author expertise        | 0.20 |
//! | institution             | 0.15 |
//! | publication reputation  | 0.20 |
//! | peer review             | 0.15 |
//! | citations (log-scaled)  | 0.10 |
//! | funding independence    | 0.10 |
//! | conflict-free (inverted)| 0.10 |

use serde::{Deserialize, Serialize};

use super::reputation::SourceReputation;
use crate::model::SourceMetadata;

/// Score for a named source that the reputation table does not know.
const UNKNOWN_NAME: f64 = 0.5;
/// Score for a missing name field.
const ABSENT_NAME: f64 = 0.2;
/// Citation count that saturates the citation factor.
const CITATION_SATURATION: f64 = 100.0;
/// Reduction of the conflict-free factor per declared conflict.
const CONFLICT_STEP: f64 = 0.34;

/// Per-factor credibility values, kept for explanation text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibilityBreakdown {
    pub author: f64,
    pub institution: f64,
    pub publication: f64,
    pub peer_review: f64,
    pub citations: f64,
    pub funding_independence: f64,
    pub conflict_free: f64,
    pub score: f64,
}

fn name_factor(name: Option<&str>, lookup: impl Fn(&str) -> Option<f64>) -> f64 {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => lookup(n).unwrap_or(UNKNOWN_NAME),
        None => ABSENT_NAME,
    }
}

/// Normalized citation factor: `ln(1 + c) / ln(1 + 100)`, capped at 1.
pub fn citation_factor(citations: u32) -> f64 {
    ((1.0 + citations as f64).ln() / (1.0 + CITATION_SATURATION).ln()).min(1.0)
}

pub fn score(metadata: &SourceMetadata, reputation: &dyn SourceReputation) -> CredibilityBreakdown {
    let author = name_factor(metadata.author.as_deref(), |n| reputation.author_score(n));
    let institution = name_factor(metadata.institution.as_deref(), |n| {
        reputation.institution_score(n)
    });
    let publication = name_factor(metadata.publication.as_deref(), |n| {
        reputation.publication_score(n)
    });
    let peer_review = if metadata.peer_reviewed { 1.0 } else { 0.3 };
    let citations = citation_factor(metadata.citation_count);
    let funding_independence = if metadata.funding_independent { 1.0 } else { 0.4 };
    let conflict_free =
        1.0 - (CONFLICT_STEP * metadata.conflicts_of_interest.len() as f64).min(1.0);

    let score = 0.20 * author
        + 0.15 * institution
        + 0.20 * publication
        + 0.15 * peer_review
        + 0.10 * citations
        + 0.10 * funding_independence
        + 0.10 * conflict_free;

    CredibilityBreakdown {
        author,
        institution,
        publication,
        peer_review,
        citations,
        funding_independence,
        conflict_free,
        score: score.clamp(0.0, 1.0),
    }
}
