//! Advisory anomaly checks over a sealed verdict and its assessments.
//!
//! Checks never mutate their inputs and never block a verdict.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consensus::Verdict;
use crate::scoring::{QualityAssessment, QualityGrade};

/// Credibility above which negative language in the explanation is suspicious.
const HIGH_CREDIBILITY: f64 = 0.9;
/// Credibility below which a strong overall score is suspicious.
const LOW_CREDIBILITY: f64 = 0.3;
/// Pre-penalty composite considered strong.
const STRONG_OVERALL: f64 = 0.7;

/// Language that contradicts a high credibility score.
static NEGATIVE_CREDIBILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(unreliable|questionable|dubious|discredited|retracted|biased|unverified|untrustworthy|low[ -]credibility|conflict of interest|predatory)\b",
    )
    .expect("NEGATIVE_CREDIBILITY_RE regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// High credibility with negative-credibility language in the explanation.
    ScoreExplanationMismatch,
    /// Very low credibility alongside a strong overall score.
    ExtremeCombination,
    /// Grade does not match the composite score's range.
    GradeMismatch,
    /// Verdict confidence is not a finite value in [0, 1].
    InvalidVerdictConfidence,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScoreExplanationMismatch => write!(f, "score_explanation_mismatch"),
            Self::ExtremeCombination => write!(f, "extreme_combination"),
            Self::GradeMismatch => write!(f, "grade_mismatch"),
            Self::InvalidVerdictConfidence => write!(f, "invalid_verdict_confidence"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringAnomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Evidence the anomaly concerns; `None` for verdict-level anomalies.
    pub evidence_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyChecker;

impl AnomalyChecker {
    pub fn new() -> Self {
        Self
    }

    /// Run every check. Output order: verdict-level first, then per
    /// assessment in input order.
    pub fn validate(
        &self,
        verdict: &Verdict,
        assessments: &[QualityAssessment],
    ) -> Vec<ScoringAnomaly> {
        let mut anomalies = Vec::new();

        let confidence = verdict.aggregate_confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            anomalies.push(ScoringAnomaly {
                kind: AnomalyKind::InvalidVerdictConfidence,
                severity: Severity::Critical,
                evidence_id: None,
                message: format!("aggregate confidence {confidence} outside [0, 1]"),
            });
        }

        for a in assessments {
            anomalies.extend(check_assessment(a));
        }

        for anomaly in &anomalies {
            warn!(kind = %anomaly.kind, evidence = ?anomaly.evidence_id, "{}", anomaly.message);
        }
        anomalies
    }
}

/// Per-assessment checks.
pub fn check_assessment(a: &QualityAssessment) -> Vec<ScoringAnomaly> {
    let mut out = Vec::new();

    if a.credibility > HIGH_CREDIBILITY {
        if let Some(m) = NEGATIVE_CREDIBILITY_RE.find(&a.explanation) {
            out.push(ScoringAnomaly {
                kind: AnomalyKind::ScoreExplanationMismatch,
                severity: Severity::Warning,
                evidence_id: Some(a.evidence_id.clone()),
                message: format!(
                    "credibility {:.2} but explanation says \"{}\"",
                    a.credibility,
                    m.as_str()
                ),
            });
        }
    }

    if a.credibility < LOW_CREDIBILITY && a.raw_composite > STRONG_OVERALL {
        out.push(ScoringAnomaly {
            kind: AnomalyKind::ExtremeCombination,
            severity: Severity::Critical,
            evidence_id: Some(a.evidence_id.clone()),
            message: format!(
                "credibility {:.2} with overall score {:.2}",
                a.credibility, a.raw_composite
            ),
        });
    }

    let expected = QualityGrade::from_score(a.composite_score);
    if a.quality_grade != expected {
        out.push(ScoringAnomaly {
            kind: AnomalyKind::GradeMismatch,
            severity: Severity::Critical,
            evidence_id: Some(a.evidence_id.clone()),
            message: format!(
                "grade {} but composite {:.3} maps to {}",
                a.quality_grade, a.composite_score, expected
            ),
        });
    }

    out
}
