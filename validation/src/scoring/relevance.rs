//! Relevance dimension: how well an evidence item fits the question and the decision.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::text;
use super::ScoringContext;
use crate::model::{Evidence, EvidenceDomain};
use crate::weighting::DecisionType;

/// Neutral value when a signal cannot be computed (no question, no keywords).
const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceBreakdown {
    pub topic_alignment: f64,
    pub question_similarity: f64,
    pub strategic_importance: f64,
    pub decision_fit: f64,
    pub geographic_fit: f64,
    pub temporal_fit: f64,
    pub score: f64,
}

fn strategic_importance(domain: EvidenceDomain, hint: Option<EvidenceDomain>) -> f64 {
    match hint {
        Some(h) if h == domain => 1.0,
        _ if domain == EvidenceDomain::Other => 0.5,
        Some(_) => 0.6,
        None => 0.7,
    }
}

fn decision_fit(domain: EvidenceDomain, decision: DecisionType) -> f64 {
    let preferred = decision.preferred_domains();
    if preferred.is_empty() {
        0.7
    } else if preferred.contains(&domain) {
        1.0
    } else {
        0.5
    }
}

fn geographic_fit(evidence_region: Option<&str>, target: Option<&str>) -> f64 {
    match (evidence_region, target) {
        (Some(e), Some(t)) if e.trim().eq_ignore_ascii_case(t.trim()) => 1.0,
        (Some(e), Some(t))
            if e.eq_ignore_ascii_case("global") || t.eq_ignore_ascii_case("global") =>
        {
            0.8
        }
        (Some(_), Some(_)) => 0.3,
        _ => 0.7,
    }
}

/// 1.0 within two years of the reference date, linear down to 0.4 at ten years.
fn temporal_fit(collected: Option<NaiveDate>, reference: NaiveDate) -> f64 {
    let Some(date) = collected else {
        return 0.6;
    };
    let years = (reference - date).num_days().max(0) as f64 / 365.25;
    if years <= 2.0 {
        1.0
    } else if years >= 10.0 {
        0.4
    } else {
        1.0 - 0.6 * (years - 2.0) / 8.0
    }
}

pub fn score(evidence: &Evidence, ctx: &ScoringContext) -> RelevanceBreakdown {
    let evidence_tokens = text::tokens(&evidence.text);

    let topic_alignment =
        text::coverage(&ctx.keyword_tokens(), &evidence_tokens).unwrap_or(NEUTRAL);
    // Square root softens raw term coverage into a similarity-like curve.
    let question_similarity = text::coverage(&ctx.question_tokens(), &evidence_tokens)
        .map(f64::sqrt)
        .unwrap_or(NEUTRAL);
    let strategic_importance = strategic_importance(evidence.domain, ctx.decision.domain_hint);
    let decision_fit = decision_fit(evidence.domain, ctx.decision.decision_type);
    let geographic_fit = geographic_fit(evidence.region.as_deref(), ctx.region.as_deref());
    let temporal_fit = temporal_fit(
        evidence.data_collection_date.or(evidence.publication_date),
        ctx.reference_date,
    );

    let score = 0.25 * topic_alignment
        + 0.25 * question_similarity
        + 0.15 * strategic_importance
        + 0.15 * decision_fit
        + 0.10 * geographic_fit
        + 0.10 * temporal_fit;

    RelevanceBreakdown {
        topic_alignment,
        question_similarity,
        strategic_importance,
        decision_fit,
        geographic_fit,
        temporal_fit,
        score: score.clamp(0.0, 1.0),
    }
}
