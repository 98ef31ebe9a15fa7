//! Recency dimension: half-life decay by domain.
//!
//! `score = decay_base ^ (age_days / half_life) + update_frequency_adjustment`,
//! with the half-life scaled by topic stability. The reference date comes from
//! the scoring context, never the wall clock.

use serde::{Deserialize, Serialize};

use super::ScoringContext;
use crate::model::Evidence;

/// How quickly knowledge on the topic goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStability {
    Stable,
    #[default]
    Moderate,
    Volatile,
}

impl TopicStability {
    pub fn half_life_multiplier(self) -> f64 {
        match self {
            Self::Stable => 1.5,
            Self::Moderate => 1.0,
            Self::Volatile => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyBreakdown {
    /// `None` when the evidence carries no date.
    pub age_days: Option<i64>,
    pub half_life_days: f64,
    pub score: f64,
}

/// Score `evidence` for recency.
///
/// `decay_base` is the fraction retained after one half-life (0.5 by default);
/// `undated` is the score for evidence with no date at all.
pub fn score(
    evidence: &Evidence,
    ctx: &ScoringContext,
    decay_base: f64,
    undated: f64,
) -> RecencyBreakdown {
    let half_life_days =
        evidence.domain.half_life_days() * ctx.topic_stability.half_life_multiplier();

    let Some(date) = evidence.effective_date() else {
        return RecencyBreakdown {
            age_days: None,
            half_life_days,
            score: undated.clamp(0.0, 1.0),
        };
    };

    // Dates after the reference date count as brand new.
    let age_days = (ctx.reference_date - date).num_days().max(0);
    let decayed = decay_base.powf(age_days as f64 / half_life_days);
    let adjustment = evidence
        .source_metadata
        .as_ref()
        .and_then(|m| m.update_frequency)
        .map(|f| f.recency_adjustment())
        .unwrap_or(0.0);

    RecencyBreakdown {
        age_days: Some(age_days),
        half_life_days,
        score: (decayed + adjustment).clamp(0.0, 1.0),
    }
}
