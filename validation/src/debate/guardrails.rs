//! Round-limit and termination guardrails.

use serde::{Deserialize, Serialize};

/// Whether a debate stops after a closed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminationCheck {
    /// Continue debate; no guardrail triggered.
    Continue,
    /// Moderator confidence reached the consensus threshold.
    ThresholdMet { moderator_confidence: f64 },
    /// The round limit was reached.
    MaxRoundsReached { rounds: u32 },
}

impl TerminationCheck {
    /// Evaluate after round `round_number` closes. Threshold takes precedence
    /// when both conditions hold.
    pub fn evaluate(
        round_number: u32,
        max_rounds: u32,
        moderator_confidence: f64,
        consensus_threshold: f64,
    ) -> Self {
        if moderator_confidence >= consensus_threshold {
            Self::ThresholdMet {
                moderator_confidence,
            }
        } else if round_number >= max_rounds {
            Self::MaxRoundsReached {
                rounds: round_number,
            }
        } else {
            Self::Continue
        }
    }

    /// Whether the debate should stop.
    pub fn should_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

impl std::fmt::Display for TerminationCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::ThresholdMet {
                moderator_confidence,
            } => write!(f, "threshold_met ({:.2})", moderator_confidence),
            Self::MaxRoundsReached { rounds } => write!(f, "max_rounds_reached ({})", rounds),
        }
    }
}

/// Round budget for a claim set of `claims` claims: grows with the set,
/// bounded below by `base` and above by `ceiling`.
pub fn max_rounds_for(claims: usize, base: u32, ceiling: u32) -> u32 {
    let ceiling = ceiling.max(1);
    let wanted = u32::try_from(claims).unwrap_or(u32::MAX).max(base);
    wanted.min(ceiling).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_below_threshold() {
        let check = TerminationCheck::evaluate(1, 3, 0.7, 0.8);
        assert_eq!(check, TerminationCheck::Continue);
        assert!(!check.should_stop());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let check = TerminationCheck::evaluate(1, 3, 0.8, 0.8);
        assert!(matches!(check, TerminationCheck::ThresholdMet { .. }));
        assert!(check.should_stop());
    }

    #[test]
    fn test_max_rounds_reached() {
        let check = TerminationCheck::evaluate(3, 3, 0.65, 0.8);
        assert_eq!(check, TerminationCheck::MaxRoundsReached { rounds: 3 });
        assert_eq!(check.to_string(), "max_rounds_reached (3)");
    }

    #[test]
    fn test_max_rounds_for_claim_set_size() {
        assert_eq!(max_rounds_for(1, 3, 5), 3);
        assert_eq!(max_rounds_for(4, 3, 5), 4);
        assert_eq!(max_rounds_for(12, 3, 5), 5);
        assert_eq!(max_rounds_for(0, 0, 0), 1);
    }
}
