//! Confidence aggregation over one round's messages.

use serde::{Deserialize, Serialize};

use crate::debate::{AgentRole, DebateMessage};

/// Per-role weights for the aggregate confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleWeights {
    pub strategist: f64,
    pub critic: f64,
    pub adversary: f64,
    pub moderator: f64,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            strategist: 0.3,
            critic: 0.4,
            adversary: 0.2,
            moderator: 0.1,
        }
    }
}

impl RoleWeights {
    pub fn weight(&self, role: AgentRole) -> f64 {
        match role {
            AgentRole::Strategist => self.strategist,
            AgentRole::Critic => self.critic,
            AgentRole::Adversary => self.adversary,
            AgentRole::Moderator => self.moderator,
        }
    }

    pub fn sum(&self) -> f64 {
        AgentRole::ORDER.iter().map(|r| self.weight(*r)).sum()
    }
}

/// Weighted role average, capped at the highest individual confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceAggregator {
    weights: RoleWeights,
}

impl ConfidenceAggregator {
    pub fn new(weights: RoleWeights) -> Self {
        Self { weights }
    }

    /// Aggregate confidence of `messages`.
    ///
    /// Weights are renormalized over the roles present. The result never
    /// exceeds the maximum message confidence. Empty input yields 0.0.
    pub fn aggregate(&self, messages: &[DebateMessage]) -> f64 {
        let valid: Vec<&DebateMessage> = messages
            .iter()
            .filter(|m| m.confidence.is_finite())
            .collect();
        let Some(max) = valid
            .iter()
            .map(|m| m.confidence.clamp(0.0, 1.0))
            .reduce(f64::max)
        else {
            return 0.0;
        };

        let (weighted, total) = valid.iter().fold((0.0, 0.0), |(acc, total), m| {
            let w = self.weights.weight(m.agent_role).max(0.0);
            (acc + w * m.confidence.clamp(0.0, 1.0), total + w)
        });
        let mean = if total > 0.0 {
            weighted / total
        } else {
            valid.iter().map(|m| m.confidence.clamp(0.0, 1.0)).sum::<f64>() / valid.len() as f64
        };
        mean.min(max)
    }
}

/// Aggregate with the default role weights.
pub fn aggregate(messages: &[DebateMessage]) -> f64 {
    ConfidenceAggregator::default().aggregate(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(confidences: [f64; 4]) -> Vec<DebateMessage> {
        AgentRole::ORDER
            .iter()
            .zip(confidences)
            .map(|(r, c)| DebateMessage::new(*r, 1, "x", c))
            .collect()
    }

    #[test]
    fn test_weighted_average() {
        let value = aggregate(&msgs([0.8, 0.6, 0.5, 0.9]));
        let expected = 0.3 * 0.8 + 0.4 * 0.6 + 0.2 * 0.5 + 0.1 * 0.9;
        assert!((value - expected).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(aggregate(&[]), 0.0);
    }

    #[test]
    fn test_cap_at_max_individual() {
        for a in [0.0, 0.3, 0.7, 1.0] {
            for b in [0.0, 0.5, 0.9] {
                let m = msgs([a, b, a, b]);
                let max = m.iter().map(|x| x.confidence).fold(0.0, f64::max);
                assert!(aggregate(&m) <= max + 1e-12);
            }
        }
    }

    #[test]
    fn test_renormalizes_over_present_roles() {
        let only_critic = vec![DebateMessage::new(AgentRole::Critic, 1, "x", 0.6)];
        assert!((aggregate(&only_critic) - 0.6).abs() < 1e-12);

        let pair = vec![
            DebateMessage::new(AgentRole::Strategist, 1, "x", 1.0),
            DebateMessage::new(AgentRole::Moderator, 1, "x", 0.0),
        ];
        assert!((aggregate(&pair) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weights_fall_back_to_mean() {
        let agg = ConfidenceAggregator::new(RoleWeights {
            strategist: 0.0,
            critic: 0.0,
            adversary: 0.0,
            moderator: 0.0,
        });
        assert!((agg.aggregate(&msgs([0.2, 0.4, 0.6, 0.8])) - 0.5).abs() < 1e-12);
    }
}
