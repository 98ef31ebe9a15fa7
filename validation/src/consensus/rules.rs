//! The four validation rules and the per-round decision.
//!
//! | # | Rule                     | On failure |
//! |---|--------------------------|------------|
//! | 1 | evidence quality         | reject before debate |
//! | 2 | consensus threshold      | modification / another round |
//! | 3 | constitutional flags     | reject |
//! | 4 | uncertainty acknowledged | modification / another round |
//!
//! All threshold comparisons are inclusive.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::aggregate::ConfidenceAggregator;
use crate::debate::guardrails::TerminationCheck;
use crate::debate::DebateRound;
use crate::model::Claim;
use crate::scoring::QualityAssessment;

/// Matches an explicit confidence bound, range, or stated limitation.
static UNCERTAINTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(\.\d+)?\s?%|±|\+/-|\bconfidence\b|\blimitation|\buncertain|\bcaveat|\brange\b|\bestimate|\bapproximately\b|\blikely\b|\bmay\b|\bbetween\s+\d|\bat least\b|\bat most\b|\bup to\b)",
    )
    .expect("UNCERTAINTY_RE regex should compile")
});

/// Whether `text` states a confidence bound or limitation.
pub fn acknowledges_uncertainty(text: &str) -> bool {
    UNCERTAINTY_RE.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    EvidenceQuality,
    Consensus,
    Constitutional,
    UncertaintyAcknowledgment,
}

impl ValidationRule {
    /// Whether failing this rule rejects the claim with no further rounds.
    pub fn rejects_outright(self) -> bool {
        matches!(self, Self::EvidenceQuality | Self::Constitutional)
    }
}

impl std::fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EvidenceQuality => write!(f, "evidence_quality"),
            Self::Consensus => write!(f, "consensus"),
            Self::Constitutional => write!(f, "constitutional"),
            Self::UncertaintyAcknowledgment => write!(f, "uncertainty_acknowledgment"),
        }
    }
}

/// A claim failing one rule. Data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub claim_id: String,
    pub rule: ValidationRule,
    /// Round the failure was observed in; `None` before the debate.
    pub round_number: Option<u32>,
    pub reason: String,
}

/// A change the claim needs before it can be approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRequest {
    pub claim_id: String,
    pub modification: String,
    pub reason: String,
    #[serde(default)]
    pub failed_rules: Vec<ValidationRule>,
}

impl ModificationRequest {
    /// Build from the rule failures of the final round.
    pub fn from_failures(claim_id: &str, failures: &[ValidationFailure]) -> Self {
        let mut modifications = Vec::new();
        for f in failures {
            match f.rule {
                ValidationRule::Consensus => modifications.push(
                    "narrow the claim or add corroborating evidence until reviewers reach the consensus threshold",
                ),
                ValidationRule::UncertaintyAcknowledgment => modifications
                    .push("state an explicit confidence bound or limitation in the claim"),
                ValidationRule::EvidenceQuality => {
                    modifications.push("cite evidence with a composite quality score of at least 0.6")
                }
                ValidationRule::Constitutional => {
                    modifications.push("address the constitutional concerns raised by the moderator")
                }
            }
        }
        if modifications.is_empty() {
            modifications.push("revise the claim and resubmit");
        }
        Self {
            claim_id: claim_id.to_string(),
            modification: modifications.join("; "),
            reason: failures
                .iter()
                .map(|f| f.reason.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            failed_rules: failures.iter().map(|f| f.rule).collect(),
        }
    }

    /// Modification for a claim whose round could not be completed.
    pub fn from_round_failure(claim_id: &str, reason: &str) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            modification: "re-run validation once the agent provider is responsive".to_string(),
            reason: reason.to_string(),
            failed_rules: Vec::new(),
        }
    }
}

/// What happens to a claim after a closed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RoundDecision {
    Approve,
    Reject { failure: ValidationFailure },
    AnotherRound { failures: Vec<ValidationFailure> },
    Exhaust { failures: Vec<ValidationFailure> },
}

/// Outcome of evaluating one claim against one closed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEvaluation {
    pub claim_id: String,
    pub round_number: u32,
    pub aggregate_confidence: f64,
    pub moderator_confidence: f64,
    pub termination: TerminationCheck,
    pub decision: RoundDecision,
}

/// Applies the validation rules for one context.
#[derive(Debug, Clone, Copy)]
pub struct ConsensusValidator {
    pub consensus_threshold: f64,
    pub evidence_floor: f64,
    pub aggregator: ConfidenceAggregator,
}

impl ConsensusValidator {
    pub fn new(consensus_threshold: f64, evidence_floor: f64) -> Self {
        Self {
            consensus_threshold,
            evidence_floor,
            aggregator: ConfidenceAggregator::default(),
        }
    }

    pub fn with_aggregator(mut self, aggregator: ConfidenceAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Rule 1: at least one evidence item at or above the composite floor.
    pub fn check_evidence_quality<'a>(
        &self,
        claim: &Claim,
        assessment_of: impl Fn(&str) -> Option<&'a QualityAssessment>,
    ) -> Result<(), ValidationFailure> {
        let best = claim
            .evidence_ids()
            .filter_map(|id| assessment_of(id))
            .map(|a| a.composite_score)
            .reduce(f64::max);
        match best {
            Some(score) if score >= self.evidence_floor => Ok(()),
            Some(score) => Err(ValidationFailure {
                claim_id: claim.id.clone(),
                rule: ValidationRule::EvidenceQuality,
                round_number: None,
                reason: format!(
                    "best evidence composite {:.3} below {:.2}",
                    score, self.evidence_floor
                ),
            }),
            None => Err(ValidationFailure {
                claim_id: claim.id.clone(),
                rule: ValidationRule::EvidenceQuality,
                round_number: None,
                reason: "no evidence carries a quality assessment".to_string(),
            }),
        }
    }

    /// Rules 2–4 plus termination for `claim` after `round`.
    pub fn evaluate_round(
        &self,
        claim: &Claim,
        round: &DebateRound,
        max_rounds: u32,
    ) -> RoundEvaluation {
        let round_number = round.round_number;
        let aggregate_confidence = self.aggregator.aggregate(&round.messages);
        let moderator_confidence = round.moderator_confidence();
        let termination = TerminationCheck::evaluate(
            round_number,
            max_rounds,
            moderator_confidence,
            self.consensus_threshold,
        );
        let evaluation = |decision| RoundEvaluation {
            claim_id: claim.id.clone(),
            round_number,
            aggregate_confidence,
            moderator_confidence,
            termination: termination.clone(),
            decision,
        };

        // Rule 3
        if let Some(flag) = round
            .flags()
            .find(|f| f.claim_id == claim.id && f.category.is_blocking())
        {
            return evaluation(RoundDecision::Reject {
                failure: ValidationFailure {
                    claim_id: claim.id.clone(),
                    rule: ValidationRule::Constitutional,
                    round_number: Some(round_number),
                    reason: format!("{} flag: {}", flag.category, flag.reason),
                },
            });
        }

        let mut failures = Vec::new();
        // Rule 2
        if aggregate_confidence < self.consensus_threshold {
            failures.push(ValidationFailure {
                claim_id: claim.id.clone(),
                rule: ValidationRule::Consensus,
                round_number: Some(round_number),
                reason: format!(
                    "aggregate confidence {:.3} below threshold {:.2}",
                    aggregate_confidence, self.consensus_threshold
                ),
            });
        }
        // Rule 4
        if !acknowledges_uncertainty(claim.current_text()) && !acknowledges_uncertainty(&round.synthesis)
        {
            failures.push(ValidationFailure {
                claim_id: claim.id.clone(),
                rule: ValidationRule::UncertaintyAcknowledgment,
                round_number: Some(round_number),
                reason: "neither the claim nor the synthesis states a confidence bound or limitation"
                    .to_string(),
            });
        }

        let rounds_remain = round_number < max_rounds;
        let decision = if termination.should_stop() && failures.is_empty() {
            RoundDecision::Approve
        } else if rounds_remain {
            RoundDecision::AnotherRound { failures }
        } else {
            RoundDecision::Exhaust { failures }
        };
        evaluation(decision)
    }
}
