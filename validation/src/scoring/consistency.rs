//! Consistency dimension: internal coherence plus corroboration by related evidence.
//!
//! Two items are "topically related" when the Jaccard similarity of their
//! content tokens reaches `topic_overlap`. A related item asserting the
//! opposite direction is a direct contradiction and caps the dimension.

use serde::{Deserialize, Serialize};

use super::text::{self, Polarity};
use super::ScoringContext;
use crate::model::Evidence;

const SELF_CONTRADICTION_MARKERS: &[&str] = &[
    "contrary to", "inconsistent", "conflicting", "contradict", "on the other hand",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyBreakdown {
    pub coherence: f64,
    pub corroboration: f64,
    /// Related items on the same topic.
    pub related_on_topic: usize,
    /// Ids of related items asserting the opposite direction.
    pub contradicted_by: Vec<String>,
    pub score: f64,
}

impl ConsistencyBreakdown {
    pub fn contradiction_detected(&self) -> bool {
        !self.contradicted_by.is_empty()
    }
}

fn coherence(body: &str) -> f64 {
    let mut value = 1.0;
    if text::mixed_direction(body) {
        value -= 0.3;
    }
    value -= 0.15 * text::count_markers(body, SELF_CONTRADICTION_MARKERS) as f64;
    value.clamp(0.3, 1.0)
}

/// Score `evidence` against the related evidence in `ctx`.
///
/// `topic_overlap` is the Jaccard threshold for "same topic"; `contradiction_cap`
/// bounds the score when a contradiction is found.
pub fn score(
    evidence: &Evidence,
    ctx: &ScoringContext,
    topic_overlap: f64,
    contradiction_cap: f64,
) -> ConsistencyBreakdown {
    let coherence = coherence(&evidence.text);
    let own_tokens = text::tokens(&evidence.text);
    let own_polarity = text::polarity(&evidence.text);

    let mut on_topic = 0usize;
    let mut agreeing = 0usize;
    let mut contradicted_by = Vec::new();

    for other in ctx.related_excluding(&evidence.id) {
        if text::jaccard(&own_tokens, &text::tokens(&other.text)) < topic_overlap {
            continue;
        }
        on_topic += 1;
        let other_polarity = text::polarity(&other.text);
        if own_polarity.opposes(other_polarity) {
            contradicted_by.push(other.id.clone());
        } else if own_polarity == other_polarity || other_polarity == Polarity::Neutral {
            agreeing += 1;
        }
    }

    let corroboration = if on_topic == 0 {
        0.5
    } else {
        agreeing as f64 / on_topic as f64
    };

    let mut score = (0.5 * coherence + 0.5 * corroboration).clamp(0.0, 1.0);
    if !contradicted_by.is_empty() {
        score = score.min(contradiction_cap);
    }

    ConsistencyBreakdown {
        coherence,
        corroboration,
        related_on_topic: on_topic,
        contradicted_by,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvidenceDomain;
    use chrono::NaiveDate;

    fn ctx_with(related: Vec<Evidence>) -> ScoringContext {
        ScoringContext::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_related(related)
    }

    fn ev(id: &str, text: &str) -> Evidence {
        Evidence::new(id, text, EvidenceDomain::MarketResearch)
    }

    #[test]
    fn test_no_related_evidence_is_neutral() {
        let c = score(&ev("e1", "EV battery demand will increase"), &ctx_with(vec![]), 0.2, 0.4);
        assert_eq!(c.corroboration, 0.5);
        assert_eq!(c.coherence, 1.0);
        assert_eq!(c.score, 0.75);
    }

    #[test]
    fn test_corroborating_evidence_raises_score() {
        let ctx = ctx_with(vec![
            ev("e2", "EV battery demand continues to increase in Europe"),
            ev("e3", "Lithium mining permits in Chile"),
        ]);
        let c = score(&ev("e1", "EV battery demand will increase"), &ctx, 0.2, 0.4);
        assert_eq!(c.related_on_topic, 1);
        assert_eq!(c.corroboration, 1.0);
        assert_eq!(c.score, 1.0);
    }

    #[test]
    fn test_contradiction_caps_score() {
        let ctx = ctx_with(vec![ev("e2", "EV battery demand will decline")]);
        let c = score(&ev("e1", "EV battery demand will increase"), &ctx, 0.2, 0.4);
        assert!(c.contradiction_detected());
        assert_eq!(c.contradicted_by, vec!["e2".to_string()]);
        assert!(c.score <= 0.4);
    }

    #[test]
    fn test_self_is_excluded() {
        let same = ev("e1", "EV battery demand will decline");
        let ctx = ctx_with(vec![same.clone()]);
        let c = score(&same, &ctx, 0.2, 0.4);
        assert_eq!(c.related_on_topic, 0);
    }

    #[test]
    fn test_mixed_direction_lowers_coherence() {
        let c = score(
            &ev("e1", "Prices rise while volumes fall, conflicting with guidance"),
            &ctx_with(vec![]),
            0.2,
            0.4,
        );
        assert!((c.coherence - 0.55).abs() < 1e-12);
    }
}
