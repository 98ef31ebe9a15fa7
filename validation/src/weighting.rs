//! Context-adaptive dimension weighting.
//!
//! ```text
//! base WeightConfig ──┬─ decision type rule ── clamp ≥ 0 ── renormalize
//!                     ├─ risk tolerance rule ── clamp ≥ 0 ── renormalize
//!                     └─ time pressure rule ─── clamp ≥ 0 ── renormalize ──▶ adapted
//! ```
//!
//! [`adapt_weights`] is pure: it copies the base config and never mutates it.

use serde::{Deserialize, Serialize};

use crate::model::EvidenceDomain;
use crate::scoring::weights::{QualityDimension, WeightConfig};

/// Highest consensus threshold any context may demand.
pub const MAX_CONSENSUS_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Investment,
    MarketEntry,
    CompetitiveResponse,
    #[default]
    General,
}

impl DecisionType {
    pub const ALL: [DecisionType; 4] = [
        Self::Investment,
        Self::MarketEntry,
        Self::CompetitiveResponse,
        Self::General,
    ];

    /// Evidence domains that fit this kind of decision best.
    pub fn preferred_domains(self) -> &'static [EvidenceDomain] {
        match self {
            Self::Investment => &[
                EvidenceDomain::FinancialMarkets,
                EvidenceDomain::MarketResearch,
                EvidenceDomain::Regulatory,
            ],
            Self::MarketEntry => &[
                EvidenceDomain::MarketResearch,
                EvidenceDomain::Demographic,
                EvidenceDomain::Regulatory,
                EvidenceDomain::CompetitiveIntelligence,
            ],
            Self::CompetitiveResponse => &[
                EvidenceDomain::CompetitiveIntelligence,
                EvidenceDomain::Technology,
                EvidenceDomain::MarketResearch,
            ],
            Self::General => &[],
        }
    }
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Investment => write!(f, "investment"),
            Self::MarketEntry => write!(f, "market_entry"),
            Self::CompetitiveResponse => write!(f, "competitive_response"),
            Self::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    pub const ALL: [RiskTolerance; 3] = [Self::Low, Self::Medium, Self::High];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePressure {
    Low,
    #[default]
    Medium,
    High,
}

impl TimePressure {
    pub const ALL: [TimePressure; 3] = [Self::Low, Self::Medium, Self::High];
}

/// Caller-supplied description of the decision the claims feed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionContext {
    pub decision_type: DecisionType,
    pub risk_tolerance: RiskTolerance,
    pub time_pressure: TimePressure,
    pub domain_hint: Option<EvidenceDomain>,
}

impl DecisionContext {
    /// Consensus threshold for this context.
    ///
    /// Low risk tolerance raises the base to `high_risk_threshold`. The result
    /// never exceeds [`MAX_CONSENSUS_THRESHOLD`].
    pub fn consensus_threshold(&self, base: f64, high_risk_threshold: f64) -> f64 {
        let threshold = match self.risk_tolerance {
            RiskTolerance::Low => base.max(high_risk_threshold),
            _ => base,
        };
        threshold.clamp(0.0, MAX_CONSENSUS_THRESHOLD)
    }
}

fn apply(weights: &mut WeightConfig, deltas: &[(QualityDimension, f64)]) {
    for (dimension, delta) in deltas {
        weights.adjust(*dimension, *delta);
    }
    *weights = weights.normalized();
}

/// Adjust `base` for `context`. Each rule renormalizes before the next runs.
pub fn adapt_weights(base: &WeightConfig, context: &DecisionContext) -> WeightConfig {
    use QualityDimension::*;

    let mut weights = base.normalized();

    match context.decision_type {
        DecisionType::Investment => apply(
            &mut weights,
            &[(Credibility, 0.10), (Completeness, 0.05), (Recency, -0.05)],
        ),
        DecisionType::MarketEntry => apply(
            &mut weights,
            &[(Recency, 0.10), (Relevance, 0.05), (Credibility, -0.10)],
        ),
        DecisionType::CompetitiveResponse => apply(
            &mut weights,
            &[(Recency, 0.15), (Consistency, 0.10), (Credibility, 0.05)],
        ),
        DecisionType::General => {}
    }

    if context.risk_tolerance == RiskTolerance::Low {
        apply(&mut weights, &[(Credibility, 0.10), (Consistency, 0.05)]);
    }

    if context.time_pressure == TimePressure::High {
        weights.scale(Completeness, 0.7);
        apply(&mut weights, &[(Recency, 0.05)]);
    }

    weights
}
