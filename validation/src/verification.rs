//! Chain-of-Verification (CoVe): independent pre-debate checks per claim.
//!
//! ```text
//! claim ──▶ factual?  (best evidence composite ≥ floor)
//!       ──▶ source?   (only when evidence is cited: credible and attributable)
//!       ──▶ logical?  (no cited evidence contradicted)
//!   all pass → verified     any fails → flagged + amendment
//! ```
//!
//! Amendments feed the Strategist's prompt; the overall status feeds the
//! `accuracy_verified` compliance tag.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::model::Claim;
use crate::scoring::QualityAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Factual,
    Source,
    Logical,
}

impl std::fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factual => write!(f, "factual"),
            Self::Source => write!(f, "source"),
            Self::Logical => write!(f, "logical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationQuestion {
    pub id: String,
    pub claim_id: String,
    pub kind: VerificationKind,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationAnswer {
    pub question_id: String,
    pub claim_id: String,
    pub kind: VerificationKind,
    pub passed: bool,
    pub confidence: f64,
    pub supporting_evidence: Vec<String>,
    pub conflicts_detected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Flagged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Fraction of claims that must verify for the set to pass, in (0, 1].
    pub minimum_pass_ratio: f64,
    /// Composite an evidence item needs to answer the factual question.
    pub evidence_floor: f64,
    /// Credibility an evidence item needs to answer the source question.
    pub credibility_floor: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            minimum_pass_ratio: 0.8,
            evidence_floor: 0.6,
            credibility_floor: 0.6,
        }
    }
}

impl VerificationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.minimum_pass_ratio > 0.0 && self.minimum_pass_ratio <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "verification.minimum_pass_ratio",
                value: self.minimum_pass_ratio,
            });
        }
        for (field, value) in [
            ("verification.evidence_floor", self.evidence_floor),
            ("verification.credibility_floor", self.credibility_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub verified_ratio: f64,
    pub verified_claims: Vec<String>,
    pub flagged_claims: Vec<String>,
    /// Suggested amendments per flagged claim.
    pub amendments: BTreeMap<String, Vec<String>>,
    pub questions: Vec<VerificationQuestion>,
    pub answers: Vec<VerificationAnswer>,
    /// Mean answer confidence.
    pub overall_confidence: f64,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Amendments to show the debate for `claim_id`.
    pub fn notes_for(&self, claim_id: &str) -> Vec<String> {
        self.amendments.get(claim_id).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChainOfVerification {
    config: VerificationConfig,
}

impl ChainOfVerification {
    pub fn new(config: VerificationConfig) -> Self {
        Self { config }
    }

    /// Questions for `claim`: factual and logical always, source only when
    /// the claim cites evidence.
    pub fn questions(&self, claim: &Claim) -> Vec<VerificationQuestion> {
        let text = claim.current_text();
        let mut questions = vec![VerificationQuestion {
            id: format!("factual-{}", claim.id),
            claim_id: claim.id.clone(),
            kind: VerificationKind::Factual,
            question: format!("Can this claim be factually verified: '{text}'?"),
        }];
        if !claim.evidence.is_empty() {
            questions.push(VerificationQuestion {
                id: format!("source-{}", claim.id),
                claim_id: claim.id.clone(),
                kind: VerificationKind::Source,
                question: format!("Do the cited sources support this claim: '{text}'?"),
            });
        }
        questions.push(VerificationQuestion {
            id: format!("logical-{}", claim.id),
            claim_id: claim.id.clone(),
            kind: VerificationKind::Logical,
            question: format!("Is this claim consistent with the other findings: '{text}'?"),
        });
        questions
    }

    /// Answer `question` from the assessments of the claim's evidence.
    pub fn answer(
        &self,
        question: &VerificationQuestion,
        claim: &Claim,
        assessments: &HashMap<String, QualityAssessment>,
    ) -> VerificationAnswer {
        let cited: Vec<(&str, &QualityAssessment)> = claim
            .evidence_ids()
            .filter_map(|id| assessments.get(id).map(|a| (id, a)))
            .collect();
        let conflicts_detected = cited.iter().any(|(_, a)| a.contradiction_detected);

        let (passed, supporting): (bool, Vec<String>) = match question.kind {
            VerificationKind::Factual => {
                let support: Vec<String> = cited
                    .iter()
                    .filter(|(_, a)| a.composite_score >= self.config.evidence_floor)
                    .map(|(id, _)| id.to_string())
                    .collect();
                (!support.is_empty(), support)
            }
            VerificationKind::Source => {
                let support: Vec<String> = claim
                    .evidence
                    .iter()
                    .filter(|e| !e.source_url.trim().is_empty())
                    .filter(|e| {
                        assessments
                            .get(&e.id)
                            .is_some_and(|a| a.credibility >= self.config.credibility_floor)
                    })
                    .map(|e| e.id.clone())
                    .collect();
                (!support.is_empty(), support)
            }
            VerificationKind::Logical => (
                !conflicts_detected,
                cited
                    .iter()
                    .filter(|(_, a)| !a.contradiction_detected)
                    .map(|(id, _)| id.to_string())
                    .collect(),
            ),
        };

        let confidence = if cited.is_empty() {
            0.0
        } else {
            let ratio = supporting.len() as f64 / cited.len() as f64;
            if passed {
                0.5 + 0.5 * ratio
            } else {
                0.5 * ratio
            }
        };

        VerificationAnswer {
            question_id: question.id.clone(),
            claim_id: claim.id.clone(),
            kind: question.kind,
            passed,
            confidence,
            supporting_evidence: supporting,
            conflicts_detected,
        }
    }

    /// Verify every claim. A claim verifies when all its answers pass.
    pub fn verify(
        &self,
        claims: &[Claim],
        assessments: &HashMap<String, QualityAssessment>,
    ) -> VerificationResult {
        let mut questions = Vec::new();
        let mut answers = Vec::new();
        let mut verified_claims = Vec::new();
        let mut flagged_claims = Vec::new();
        let mut amendments: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for claim in claims {
            let claim_questions = self.questions(claim);
            let claim_answers: Vec<VerificationAnswer> = claim_questions
                .iter()
                .map(|q| self.answer(q, claim, assessments))
                .collect();

            let mut notes = Vec::new();
            for a in claim_answers.iter().filter(|a| !a.passed) {
                notes.push(match a.kind {
                    VerificationKind::Factual => format!(
                        "Strengthen evidence for claim {}: no cited evidence reaches composite {:.2}",
                        claim.id, self.config.evidence_floor
                    ),
                    VerificationKind::Source => format!(
                        "Cite an attributable source with credibility of at least {:.2} for claim {}",
                        self.config.credibility_floor, claim.id
                    ),
                    VerificationKind::Logical => format!(
                        "Resolve conflicting evidence before asserting claim {}",
                        claim.id
                    ),
                });
            }
            if notes.is_empty() {
                verified_claims.push(claim.id.clone());
            } else {
                flagged_claims.push(claim.id.clone());
                amendments.insert(claim.id.clone(), notes);
            }
            questions.extend(claim_questions);
            answers.extend(claim_answers);
        }

        let verified_ratio = if claims.is_empty() {
            0.0
        } else {
            verified_claims.len() as f64 / claims.len() as f64
        };
        let overall_confidence = if answers.is_empty() {
            0.0
        } else {
            answers.iter().map(|a| a.confidence).sum::<f64>() / answers.len() as f64
        };
        let status = if !claims.is_empty() && verified_ratio >= self.config.minimum_pass_ratio {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Flagged
        };
        info!(
            claims = claims.len(),
            verified = verified_claims.len(),
            ratio = verified_ratio,
            status = ?status,
            "chain-of-verification complete"
        );

        VerificationResult {
            status,
            verified_ratio,
            verified_claims,
            flagged_claims,
            amendments,
            questions,
            answers,
            overall_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Evidence, EvidenceDomain};
    use crate::scoring::{CredibilityTier, QualityGrade};

    fn assessment(id: &str, composite: f64, credibility: f64, contradiction: bool) -> QualityAssessment {
        QualityAssessment {
            evidence_id: id.into(),
            version: 1,
            credibility,
            relevance: 0.8,
            recency: 0.8,
            completeness: 0.8,
            consistency: 0.8,
            raw_composite: composite,
            composite_score: composite,
            quality_grade: QualityGrade::from_score(composite),
            credibility_tier: CredibilityTier::from_score(credibility),
            confidence: 0.9,
            explanation: String::new(),
            penalties: vec![],
            contradiction_detected: contradiction,
            insufficient_data: false,
        }
    }

    fn claim(id: &str, url: &str) -> Claim {
        Claim::new(id, "Adoption grows", 0.7).with_evidence(
            Evidence::new(&format!("{id}-e"), "report", EvidenceDomain::Technology)
                .with_source_url(url),
        )
    }

    #[test]
    fn test_questions_per_claim() {
        let cove = ChainOfVerification::default();
        let kinds: Vec<_> = cove
            .questions(&claim("c1", "https://x"))
            .iter()
            .map(|q| q.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                VerificationKind::Factual,
                VerificationKind::Source,
                VerificationKind::Logical
            ]
        );
        assert_eq!(cove.questions(&Claim::new("c2", "x", 0.5)).len(), 2);
    }

    #[test]
    fn test_all_verified() {
        let cove = ChainOfVerification::default();
        let mut a = HashMap::new();
        a.insert("c1-e".to_string(), assessment("c1-e", 0.85, 0.8, false));
        let result = cove.verify(&[claim("c1", "https://x")], &a);
        assert!(result.passed());
        assert_eq!(result.verified_ratio, 1.0);
        assert!(result.notes_for("c1").is_empty());
    }

    #[test]
    fn test_contradiction_flags_claim() {
        let cove = ChainOfVerification::default();
        let mut a = HashMap::new();
        a.insert("c1-e".to_string(), assessment("c1-e", 0.85, 0.8, true));
        let result = cove.verify(&[claim("c1", "https://x")], &a);
        assert_eq!(result.flagged_claims, vec!["c1".to_string()]);
        assert!(result.notes_for("c1")[0].starts_with("Resolve conflicting evidence"));
        assert!(!result.passed());
    }

    #[test]
    fn test_pass_ratio_threshold() {
        let cove = ChainOfVerification::default();
        let mut a = HashMap::new();
        let mut claims = Vec::new();
        for i in 0..5 {
            let id = format!("c{i}");
            // c0 has no source URL and fails the source question.
            let url = if i == 0 { "" } else { "https://x" };
            a.insert(format!("{id}-e"), assessment(&format!("{id}-e"), 0.85, 0.8, false));
            claims.push(claim(&id, url));
        }
        let result = cove.verify(&claims, &a);
        assert!((result.verified_ratio - 0.8).abs() < 1e-12);
        assert!(result.passed());
        assert!(result.notes_for("c0")[0].contains("attributable source"));
    }

    #[test]
    fn test_empty_claim_set_is_flagged() {
        let result = ChainOfVerification::default().verify(&[], &HashMap::new());
        assert_eq!(result.status, VerificationStatus::Flagged);
    }

    #[test]
    fn test_config_validation() {
        let bad = VerificationConfig {
            minimum_pass_ratio: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(VerificationConfig::default().validate().is_ok());
    }
}
