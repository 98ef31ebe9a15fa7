//! Analysis of competing hypotheses.
//!
//! After debate, every debated claim is laid out against the explanations
//! that compete with it: the claim itself, its null, and the alternatives
//! the Critic and Adversary raised. Each cited evidence item is marked
//! consistent, inconsistent, or silent for each hypothesis. The hypothesis
//! with the least weighted inconsistency leads.
//!
//! ```text
//!                H1 (claim)   H0 (null)   A1 ...
//! e1  w=0.82     supports     contradicts unknown
//! e2  w=0.40     contradicts  supports    supports
//! ──────────────────────────────────────────────────
//! inconsistency  0.40         0.82        0.00      → A1 leads
//! ```
//!
//! Results are advisory. An approved claim that an alternative outscores
//! keeps its approval and gains a compliance warning.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::debate::ClaimDebate;
use crate::error::ConfigError;
use crate::scoring::text::{coverage, polarity, tokens};
use crate::scoring::QualityAssessment;

/// Row weight when the evidence has no assessment.
const UNSCORED_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesesConfig {
    /// Share of a hypothesis' content tokens an evidence text must mention
    /// before it counts as bearing on that hypothesis.
    pub relevance_floor: f64,
    /// Agent alternatives kept per claim, in the order they were raised.
    pub max_alternatives: usize,
}

impl Default for HypothesesConfig {
    fn default() -> Self {
        Self {
            relevance_floor: 0.2,
            max_alternatives: 4,
        }
    }
}

impl HypothesesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.relevance_floor) {
            return Err(ConfigError::OutOfRange {
                field: "hypotheses.relevance_floor",
                value: self.relevance_floor,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisOrigin {
    /// The claim as it stood when debate ended.
    Claim,
    /// The claim does not hold.
    Null,
    /// Raised by a challenger during debate.
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub statement: String,
    pub origin: HypothesisOrigin,
}

/// How one evidence item bears on one hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Supports,
    Contradicts,
    Unknown,
}

impl Consistency {
    fn mirrored(self) -> Self {
        match self {
            Self::Supports => Self::Contradicts,
            Self::Contradicts => Self::Supports,
            Self::Unknown => Self::Unknown,
        }
    }
}

/// One evidence item across every hypothesis, in hypothesis order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub evidence_id: String,
    pub weight: f64,
    pub cells: Vec<Consistency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisScore {
    pub hypothesis_id: String,
    /// Summed weight of supporting evidence.
    pub support: f64,
    /// Summed weight of contradicting evidence. Lower is better.
    pub inconsistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisMatrix {
    pub claim_id: String,
    /// Claim first, null second, then agent alternatives.
    pub hypotheses: Vec<Hypothesis>,
    pub rows: Vec<EvidenceRow>,
    pub scores: Vec<HypothesisScore>,
    /// Least-inconsistent hypothesis; the claim wins ties.
    pub leading: String,
    /// Support share of the claim's weighted evidence; `None` when no
    /// evidence bears on it.
    pub claim_confidence: Option<f64>,
    /// Evidence that gives the same reading for the claim and every
    /// alternative, so it cannot tell them apart.
    pub non_diagnostic: Vec<String>,
    pub warnings: Vec<String>,
}

impl HypothesisMatrix {
    pub fn hypothesis(&self, id: &str) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|h| h.id == id)
    }

    pub fn score(&self, id: &str) -> Option<&HypothesisScore> {
        self.scores.iter().find(|s| s.hypothesis_id == id)
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &Hypothesis> {
        self.hypotheses
            .iter()
            .filter(|h| h.origin == HypothesisOrigin::Agent)
    }

    /// Whether something other than the claim explains the evidence best.
    pub fn claim_outscored(&self) -> bool {
        self.hypothesis(&self.leading)
            .is_some_and(|h| h.origin != HypothesisOrigin::Claim)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompetingHypotheses {
    config: HypothesesConfig,
}

impl CompetingHypotheses {
    pub fn new(config: HypothesesConfig) -> Self {
        Self { config }
    }

    /// One matrix per debated claim, in debate order.
    pub fn run(
        &self,
        debates: &[ClaimDebate],
        assessments: &HashMap<String, QualityAssessment>,
    ) -> Vec<HypothesisMatrix> {
        debates
            .iter()
            .filter(|d| d.was_debated())
            .map(|d| self.analyze(d, assessments))
            .collect()
    }

    pub fn analyze(
        &self,
        debate: &ClaimDebate,
        assessments: &HashMap<String, QualityAssessment>,
    ) -> HypothesisMatrix {
        let claim = &debate.claim;
        let hypotheses = self.hypotheses_for(debate);

        let rows: Vec<EvidenceRow> = claim
            .evidence
            .iter()
            .map(|e| {
                let cells = self.row_cells(&hypotheses, &e.text);
                EvidenceRow {
                    evidence_id: e.id.clone(),
                    weight: assessments
                        .get(&e.id)
                        .map_or(UNSCORED_WEIGHT, |a| a.composite_score),
                    cells,
                }
            })
            .collect();

        let scores: Vec<HypothesisScore> = hypotheses
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let weight_of = |c: Consistency| -> f64 {
                    rows.iter()
                        .filter(|r| r.cells[i] == c)
                        .map(|r| r.weight)
                        .sum()
                };
                HypothesisScore {
                    hypothesis_id: h.id.clone(),
                    support: weight_of(Consistency::Supports),
                    inconsistency: weight_of(Consistency::Contradicts),
                }
            })
            .collect();

        // Strict comparison keeps the earliest hypothesis on ties.
        let leading = scores
            .iter()
            .skip(1)
            .fold(&scores[0], |best, s| {
                if s.inconsistency < best.inconsistency {
                    s
                } else {
                    best
                }
            })
            .hypothesis_id
            .clone();

        let primary = &scores[0];
        let weighed = primary.support + primary.inconsistency;
        let claim_confidence = (weighed > 0.0).then(|| primary.support / weighed);

        let comparable: Vec<usize> = hypotheses
            .iter()
            .enumerate()
            .filter(|(_, h)| h.origin != HypothesisOrigin::Null)
            .map(|(i, _)| i)
            .collect();
        let non_diagnostic = if comparable.len() > 1 {
            rows.iter()
                .filter(|r| comparable.iter().all(|&i| r.cells[i] == r.cells[0]))
                .map(|r| r.evidence_id.clone())
                .collect()
        } else {
            Vec::new()
        };

        let mut matrix = HypothesisMatrix {
            claim_id: claim.id.clone(),
            hypotheses,
            rows,
            scores,
            leading,
            claim_confidence,
            non_diagnostic,
            warnings: Vec::new(),
        };
        matrix.warnings = consistency_warnings(&matrix);
        debug!(
            claim = %matrix.claim_id,
            hypotheses = matrix.hypotheses.len(),
            leading = %matrix.leading,
            "competing hypotheses assessed"
        );
        matrix
    }

    fn hypotheses_for(&self, debate: &ClaimDebate) -> Vec<Hypothesis> {
        let claim = &debate.claim;
        let text = claim.current_text();
        let mut seen: HashSet<String> = HashSet::from([normalize(text)]);
        let mut hypotheses = vec![
            Hypothesis {
                id: "H1".to_string(),
                statement: text.to_string(),
                origin: HypothesisOrigin::Claim,
            },
            Hypothesis {
                id: "H0".to_string(),
                statement: format!("The claim does not hold: {text}"),
                origin: HypothesisOrigin::Null,
            },
        ];
        let raised = debate
            .rounds()
            .iter()
            .flat_map(|r| r.alternatives())
            .filter(|a| a.claim_id == claim.id)
            .map(|a| a.statement.trim())
            .filter(|s| !s.is_empty() && seen.insert(normalize(s)))
            .take(self.config.max_alternatives);
        for (i, statement) in raised.enumerate() {
            hypotheses.push(Hypothesis {
                id: format!("A{}", i + 1),
                statement: statement.to_string(),
                origin: HypothesisOrigin::Agent,
            });
        }
        hypotheses
    }

    fn row_cells(&self, hypotheses: &[Hypothesis], evidence_text: &str) -> Vec<Consistency> {
        let evidence_tokens = tokens(evidence_text);
        let evidence_polarity = polarity(evidence_text);
        let read = |statement: &str| -> Consistency {
            let relevant = coverage(&tokens(statement), &evidence_tokens)
                .is_some_and(|c| c >= self.config.relevance_floor);
            if !relevant {
                Consistency::Unknown
            } else if polarity(statement).opposes(evidence_polarity) {
                Consistency::Contradicts
            } else {
                Consistency::Supports
            }
        };
        let primary = read(&hypotheses[0].statement);
        hypotheses
            .iter()
            .map(|h| match h.origin {
                HypothesisOrigin::Claim => primary,
                HypothesisOrigin::Null => primary.mirrored(),
                HypothesisOrigin::Agent => read(&h.statement),
            })
            .collect()
    }
}

fn normalize(statement: &str) -> String {
    statement.trim().to_lowercase()
}

fn consistency_warnings(matrix: &HypothesisMatrix) -> Vec<String> {
    let claim_id = &matrix.claim_id;
    let mut warnings = Vec::new();
    if matrix.alternatives().next().is_none() {
        warnings.push(format!("no competing hypothesis was raised for claim {claim_id}"));
    }
    for (i, h) in matrix.hypotheses.iter().enumerate() {
        if h.origin == HypothesisOrigin::Null {
            continue;
        }
        if matrix.rows.iter().all(|r| r.cells[i] == Consistency::Unknown) {
            warnings.push(format!(
                "hypothesis {} for claim {claim_id} is not addressed by any evidence",
                h.id
            ));
        }
    }
    for row in &matrix.rows {
        if row.cells.iter().all(|c| *c == Consistency::Unknown) {
            warnings.push(format!(
                "evidence {} does not bear on any hypothesis for claim {claim_id}",
                row.evidence_id
            ));
        }
    }
    if let Some(h) = matrix
        .hypothesis(&matrix.leading)
        .filter(|h| h.origin != HypothesisOrigin::Claim)
    {
        warnings.push(format!(
            "{} ({}) fits the evidence for claim {claim_id} better than the claim",
            h.id, h.statement
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::debate::{AgentRole, DebateMessage, DebateRound, DebateSession};
    use crate::model::{Claim, Evidence, EvidenceDomain};
    use crate::scoring::{CredibilityTier, QualityGrade};

    fn debate(claim: Claim, alternatives: &[&str]) -> ClaimDebate {
        let critic = alternatives.iter().fold(
            DebateMessage::new(AgentRole::Critic, 1, "Methodology review.", 0.7),
            |m, a| m.with_alternative(&claim.id, a),
        );
        let mut session = DebateSession::new("set-1", &claim.id, 3);
        session.rounds.push(DebateRound {
            round_number: 1,
            claim_ids: vec![claim.id.clone()],
            messages: vec![critic],
            synthesis: String::new(),
            attempts: 1,
            started_at: Utc::now(),
            duration_ms: 0,
        });
        undebated(claim, session)
    }

    fn undebated(claim: Claim, session: DebateSession) -> ClaimDebate {
        ClaimDebate {
            claim,
            session,
            final_aggregate: 0.0,
            modification: None,
            failures: Vec::new(),
            flags: Vec::new(),
            round_error: None,
        }
    }

    fn assessment(id: &str, composite: f64) -> QualityAssessment {
        QualityAssessment {
            evidence_id: id.into(),
            version: 1,
            credibility: 0.8,
            relevance: 0.8,
            recency: 0.8,
            completeness: 0.8,
            consistency: 0.8,
            raw_composite: composite,
            composite_score: composite,
            quality_grade: QualityGrade::from_score(composite),
            credibility_tier: CredibilityTier::Strong,
            confidence: 0.9,
            explanation: String::new(),
            penalties: vec![],
            contradiction_detected: false,
            insufficient_data: false,
        }
    }

    fn claim() -> Claim {
        Claim::new("c1", "Cloud revenue growth continues next year", 0.8)
            .with_evidence(Evidence::new(
                "e1",
                "Analysts report cloud revenue growth continues to rise",
                EvidenceDomain::FinancialMarkets,
            ))
            .with_evidence(Evidence::new(
                "e2",
                "Cloud revenue is falling and growth will decline",
                EvidenceDomain::MarketResearch,
            ))
    }

    fn scores(e1: f64, e2: f64) -> HashMap<String, QualityAssessment> {
        [("e1", e1), ("e2", e2)]
            .into_iter()
            .map(|(id, score)| (id.to_string(), assessment(id, score)))
            .collect()
    }

    #[test]
    fn test_claim_and_null_mirror_each_other() {
        let m = CompetingHypotheses::default().analyze(&debate(claim(), &[]), &scores(0.8, 0.4));
        assert_eq!(m.hypotheses.len(), 2);
        assert_eq!(m.rows[0].cells, vec![Consistency::Supports, Consistency::Contradicts]);
        assert_eq!(m.rows[1].cells, vec![Consistency::Contradicts, Consistency::Supports]);
        assert_eq!(m.leading, "H1");
        let c = m.claim_confidence.unwrap();
        assert!((c - 0.8 / 1.2).abs() < 1e-9);
        assert!(m.non_diagnostic.is_empty());
        assert!(m.warnings.iter().any(|w| w.contains("no competing hypothesis")));
    }

    #[test]
    fn test_alternative_outscores_weakly_supported_claim() {
        let m = CompetingHypotheses::default().analyze(
            &debate(claim(), &["Cloud revenue growth will decline as spending falls"]),
            &scores(0.3, 0.9),
        );
        let alt = m.hypothesis("A1").unwrap();
        assert_eq!(alt.origin, HypothesisOrigin::Agent);
        assert_eq!(m.rows[0].cells[2], Consistency::Contradicts);
        assert_eq!(m.rows[1].cells[2], Consistency::Supports);
        // H0 and A1 tie at 0.3; the earlier one leads.
        assert_eq!(m.leading, "H0");
        assert!(m.claim_outscored());
        assert!(m.warnings.iter().any(|w| w.contains("better than the claim")));
        assert!(m.non_diagnostic.is_empty());
    }

    #[test]
    fn test_alternatives_deduplicated_and_capped() {
        let config = HypothesesConfig {
            max_alternatives: 2,
            ..Default::default()
        };
        let m = CompetingHypotheses::new(config).analyze(
            &debate(
                claim(),
                &[
                    "Demand is seasonal",
                    "  demand is SEASONAL ",
                    "Cloud revenue growth continues next year",
                    "",
                    "A competitor exits the market",
                    "Prices rise",
                ],
            ),
            &scores(0.5, 0.5),
        );
        let statements: Vec<_> = m.alternatives().map(|h| h.statement.as_str()).collect();
        assert_eq!(statements, vec!["Demand is seasonal", "A competitor exits the market"]);
    }

    #[test]
    fn test_evidence_silent_on_every_hypothesis_is_flagged() {
        let c = Claim::new("c1", "Cloud revenue growth continues", 0.8).with_evidence(
            Evidence::new("e1", "Headcount stayed flat in Lisbon", EvidenceDomain::Other),
        );
        let m = CompetingHypotheses::default()
            .analyze(&debate(c, &["Demand is seasonal"]), &HashMap::new());
        assert_eq!(m.rows[0].weight, UNSCORED_WEIGHT);
        assert_eq!(m.claim_confidence, None);
        assert_eq!(m.leading, "H1");
        assert_eq!(m.non_diagnostic, vec!["e1"]);
        assert!(m.warnings.iter().any(|w| w.contains("evidence e1 does not bear")));
        assert!(m.warnings.iter().any(|w| w.contains("hypothesis A1")));
    }

    #[test]
    fn test_undebated_claims_skipped() {
        let skipped = undebated(claim(), DebateSession::new("set-1", "c1", 3));
        let matrices = CompetingHypotheses::default().run(&[skipped], &HashMap::new());
        assert!(matrices.is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(HypothesesConfig::default().validate().is_ok());
        let bad = HypothesesConfig {
            relevance_floor: -0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
