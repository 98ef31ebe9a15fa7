//! The sealed verdict for a claim set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rules::ModificationRequest;
use crate::debate::{ClaimDebate, DebatePhase, FlagCategory};
use crate::scoring::{QualityAssessment, QualityGrade};
use crate::stress::ResilienceReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTag {
    /// No safety concern was raised against any claim.
    SafetyReviewed,
    /// Verification passed and every approved claim cites grade B or better.
    AccuracyVerified,
    /// Every round carried a challenge and no bias concern was raised.
    BiasMitigated,
}

impl std::fmt::Display for ComplianceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SafetyReviewed => write!(f, "safety_reviewed"),
            Self::AccuracyVerified => write!(f, "accuracy_verified"),
            Self::BiasMitigated => write!(f, "bias_mitigated"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstitutionalCompliance {
    pub tags: BTreeSet<ComplianceTag>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ConstitutionalCompliance {
    pub fn has(&self, tag: ComplianceTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Compliance over the finished debates of one claim set.
    pub fn assess(
        debates: &[ClaimDebate],
        assessments: &HashMap<String, QualityAssessment>,
        verification_passed: bool,
    ) -> Self {
        let mut compliance = Self::default();
        let flags: Vec<_> = debates.iter().flat_map(|d| d.flags.iter()).collect();
        for flag in &flags {
            compliance.warnings.push(format!(
                "{} concern on claim {}: {}",
                flag.category, flag.claim_id, flag.reason
            ));
        }

        if !flags.iter().any(|f| f.category == FlagCategory::Safety) {
            compliance.tags.insert(ComplianceTag::SafetyReviewed);
        }

        let mut accuracy = verification_passed;
        if !verification_passed {
            compliance
                .warnings
                .push("chain-of-verification did not pass".to_string());
        }
        for debate in debates.iter().filter(|d| d.is_approved()) {
            let strong = debate
                .claim
                .evidence_ids()
                .filter_map(|id| assessments.get(id))
                .any(|a| a.quality_grade.at_least(QualityGrade::B));
            if !strong {
                accuracy = false;
                compliance.warnings.push(format!(
                    "approved claim {} has no evidence graded B or better",
                    debate.claim.id
                ));
            }
        }
        if accuracy {
            compliance.tags.insert(ComplianceTag::AccuracyVerified);
        }

        let rounds: Vec<_> = debates.iter().flat_map(|d| d.rounds().iter()).collect();
        let unchallenged = rounds.iter().filter(|r| r.challenges().next().is_none()).count();
        if unchallenged > 0 {
            compliance
                .warnings
                .push(format!("{unchallenged} round(s) closed without a challenge"));
        }
        let biased = flags.iter().any(|f| f.category == FlagCategory::Bias);
        if !rounds.is_empty() && unchallenged == 0 && !biased {
            compliance.tags.insert(ComplianceTag::BiasMitigated);
        }

        compliance
    }
}

/// Terminal result for a claim set. Built once by [`VerdictBuilder::seal`]
/// and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub consensus_reached: bool,
    pub aggregate_confidence: f64,
    pub approved_claim_ids: Vec<String>,
    pub rejected_claim_ids: Vec<String>,
    pub modifications_required: BTreeMap<String, ModificationRequest>,
    pub constitutional_compliance: ConstitutionalCompliance,
    /// Advisory stress-test metadata for approved claims.
    #[serde(default)]
    pub resilience: Option<ResilienceReport>,
}

impl Verdict {
    pub fn is_approved(&self, claim_id: &str) -> bool {
        self.approved_claim_ids.iter().any(|id| id == claim_id)
    }

    pub fn is_rejected(&self, claim_id: &str) -> bool {
        self.rejected_claim_ids.iter().any(|id| id == claim_id)
    }

    pub fn resilience_score(&self) -> Option<f64> {
        self.resilience.as_ref().and_then(|r| r.resilience_score)
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] confidence={:.3} | {} approved, {} rejected, {} need modification",
            if self.consensus_reached {
                "CONSENSUS"
            } else {
                "PARTIAL"
            },
            self.aggregate_confidence,
            self.approved_claim_ids.len(),
            self.rejected_claim_ids.len(),
            self.modifications_required.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerdictError {
    #[error("claim {0} is both approved and rejected")]
    ApprovedAndRejected(String),

    #[error("claim {0} is approved but still requires modification")]
    ApprovedWithModification(String),
}

/// Collects per-claim outcomes, then seals them into a [`Verdict`].
#[derive(Debug, Clone, Default)]
pub struct VerdictBuilder {
    approved: BTreeSet<String>,
    rejected: BTreeSet<String>,
    modifications: BTreeMap<String, ModificationRequest>,
    aggregates: Vec<f64>,
    unresolved: usize,
    compliance: ConstitutionalCompliance,
    resilience: Option<ResilienceReport>,
}

impl VerdictBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve(&mut self, claim_id: &str) -> &mut Self {
        self.approved.insert(claim_id.to_string());
        self
    }

    pub fn reject(&mut self, claim_id: &str) -> &mut Self {
        self.rejected.insert(claim_id.to_string());
        self
    }

    pub fn require_modification(&mut self, request: ModificationRequest) -> &mut Self {
        self.modifications.insert(request.claim_id.clone(), request);
        self
    }

    /// Record a finished debate by its terminal phase.
    pub fn record(&mut self, debate: &ClaimDebate) -> &mut Self {
        match debate.phase() {
            DebatePhase::Consensus => {
                self.approve(&debate.claim.id);
            }
            DebatePhase::Rejected => {
                self.reject(&debate.claim.id);
            }
            _ => {
                if let Some(m) = &debate.modification {
                    self.require_modification(m.clone());
                }
            }
        }
        if debate.was_debated() {
            self.aggregates.push(debate.final_aggregate);
            if matches!(debate.phase(), DebatePhase::Exhausted | DebatePhase::Aborted) {
                self.unresolved += 1;
            }
        }
        self
    }

    pub fn compliance(&mut self, compliance: ConstitutionalCompliance) -> &mut Self {
        self.compliance = compliance;
        self
    }

    pub fn resilience(&mut self, report: ResilienceReport) -> &mut Self {
        self.resilience = Some(report);
        self
    }

    /// Seal the verdict. Fails if a claim is both approved and rejected, or
    /// approved while still requiring modification.
    pub fn seal(self) -> Result<Verdict, VerdictError> {
        if let Some(id) = self.approved.intersection(&self.rejected).next() {
            return Err(VerdictError::ApprovedAndRejected(id.clone()));
        }
        if let Some(id) = self
            .approved
            .iter()
            .find(|id| self.modifications.contains_key(*id))
        {
            return Err(VerdictError::ApprovedWithModification(id.clone()));
        }

        let debated = self.aggregates.len();
        let aggregate_confidence = if debated == 0 {
            0.0
        } else {
            self.aggregates.iter().sum::<f64>() / debated as f64
        };

        Ok(Verdict {
            consensus_reached: debated > 0 && self.unresolved == 0,
            aggregate_confidence,
            approved_claim_ids: self.approved.into_iter().collect(),
            rejected_claim_ids: self.rejected.into_iter().collect(),
            modifications_required: self.modifications,
            constitutional_compliance: self.compliance,
            resilience: self.resilience,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modification(id: &str) -> ModificationRequest {
        ModificationRequest {
            claim_id: id.into(),
            modification: "narrow the claim".into(),
            reason: "below threshold".into(),
            failed_rules: vec![],
        }
    }

    #[test]
    fn test_seal_rejects_conflict() {
        let mut b = VerdictBuilder::new();
        b.approve("c1").reject("c1");
        assert_eq!(
            b.seal().unwrap_err(),
            VerdictError::ApprovedAndRejected("c1".into())
        );
    }

    #[test]
    fn test_seal_rejects_approved_with_modification() {
        let mut b = VerdictBuilder::new();
        b.approve("c1").require_modification(modification("c1"));
        assert!(matches!(
            b.seal(),
            Err(VerdictError::ApprovedWithModification(_))
        ));
    }

    #[test]
    fn test_empty_verdict() {
        let v = VerdictBuilder::new().seal().unwrap();
        assert!(!v.consensus_reached);
        assert_eq!(v.aggregate_confidence, 0.0);
        assert!(v.resilience_score().is_none());
    }

    #[test]
    fn test_modification_only_claim_is_in_neither_list() {
        let mut b = VerdictBuilder::new();
        b.approve("c1").reject("c2").require_modification(modification("c3"));
        let v = b.seal().unwrap();
        assert!(v.is_approved("c1"));
        assert!(v.is_rejected("c2"));
        assert!(!v.is_approved("c3") && !v.is_rejected("c3"));
        assert!(v.modifications_required.contains_key("c3"));
        assert!(v.summary_line().contains("1 need modification"));
    }

    #[test]
    fn test_compliance_tag_serde() {
        let json = serde_json::to_string(&ComplianceTag::AccuracyVerified).unwrap();
        assert_eq!(json, "\"accuracy_verified\"");
    }
}
