//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! [aggregation]
//! consensus_threshold = 0.8
//!
//! [debate]
//! max_parallel_claims = 4
//! agent_timeout_ms = 60000
//!
//! [scoring.weights]
//! credibility = 0.35
//! relevance = 0.25
//! recency = 0.20
//! completeness = 0.15
//! consistency = 0.05
//! ```

use serde::{Deserialize, Serialize};

use crate::consensus::RoleWeights;
use crate::debate::DebateConfig;
use crate::error::ConfigError;
use crate::hypotheses::HypothesesConfig;
use crate::scoring::ScoringConfiguration;
use crate::stress::StressConfig;
use crate::verification::VerificationConfig;
use crate::weighting::{DecisionContext, MAX_CONSENSUS_THRESHOLD};

/// How round confidence is aggregated and judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub role_weights: RoleWeights,
    /// Consensus threshold for medium- and high-risk-tolerance contexts.
    pub consensus_threshold: f64,
    /// Threshold used when risk tolerance is low.
    pub high_risk_consensus_threshold: f64,
    /// Minimum evidence composite for a claim to enter the debate.
    pub evidence_floor: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            role_weights: RoleWeights::default(),
            consensus_threshold: 0.8,
            high_risk_consensus_threshold: 0.9,
            evidence_floor: 0.6,
        }
    }
}

impl AggregationConfig {
    /// Threshold for `context`, never above 0.9.
    pub fn threshold_for(&self, context: &DecisionContext) -> f64 {
        context.consensus_threshold(self.consensus_threshold, self.high_risk_consensus_threshold)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("aggregation.consensus_threshold", self.consensus_threshold),
            (
                "aggregation.high_risk_consensus_threshold",
                self.high_risk_consensus_threshold,
            ),
        ] {
            if !(0.0..=MAX_CONSENSUS_THRESHOLD).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.evidence_floor) {
            return Err(ConfigError::OutOfRange {
                field: "aggregation.evidence_floor",
                value: self.evidence_floor,
            });
        }
        let w = &self.role_weights;
        for (field, value) in [
            ("aggregation.role_weights.strategist", w.strategist),
            ("aggregation.role_weights.critic", w.critic),
            ("aggregation.role_weights.adversary", w.adversary),
            ("aggregation.role_weights.moderator", w.moderator),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if w.sum() <= 0.0 {
            return Err(ConfigError::Zero("aggregation.role_weights"));
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfiguration,
    pub debate: DebateConfig,
    pub aggregation: AggregationConfig,
    pub stress: StressConfig,
    pub verification: VerificationConfig,
    pub hypotheses: HypothesesConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.debate.validate()?;
        self.aggregation.validate()?;
        self.stress.validate()?;
        self.verification.validate()?;
        self.hypotheses.validate()?;
        Ok(())
    }
}
