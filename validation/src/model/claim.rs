//! Claims and their revision lineage.

use serde::{Deserialize, Serialize};

use super::evidence::Evidence;
use crate::error::MalformedClaimError;

/// One revision of a claim's text and confidence, produced by a debate round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRevision {
    /// Round that produced the revision (1-indexed).
    pub round_number: u32,
    pub text: String,
    pub confidence: f64,
    /// Why the moderator revised the claim.
    pub rationale: String,
}

/// A strategic assertion with the evidence it cites.
///
/// `text` and `initial_confidence` are the proposal and never change.
/// Revisions are appended to `lineage`; the latest one is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    pub initial_confidence: f64,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub lineage: Vec<ClaimRevision>,
}

impl Claim {
    /// Create a claim. Confidence is clamped to [0, 1].
    pub fn new(id: &str, text: &str, initial_confidence: f64) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            initial_confidence: initial_confidence.clamp(0.0, 1.0),
            evidence: Vec::new(),
            lineage: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Text of the latest revision, or the proposal.
    pub fn current_text(&self) -> &str {
        self.lineage
            .last()
            .map(|r| r.text.as_str())
            .unwrap_or(&self.text)
    }

    /// Confidence of the latest revision, or the initial confidence.
    pub fn current_confidence(&self) -> f64 {
        self.lineage
            .last()
            .map(|r| r.confidence)
            .unwrap_or(self.initial_confidence)
    }

    /// Append a revision. Earlier revisions are never touched.
    pub fn revise(&mut self, round_number: u32, text: &str, confidence: f64, rationale: &str) {
        self.lineage.push(ClaimRevision {
            round_number,
            text: text.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.to_string(),
        });
    }

    pub fn evidence_ids(&self) -> impl Iterator<Item = &str> {
        self.evidence.iter().map(|e| e.id.as_str())
    }

    /// Structural checks a claim must pass before scoring and debate.
    pub fn check_well_formed(&self) -> Result<(), MalformedClaimError> {
        if self.id.trim().is_empty() {
            return Err(MalformedClaimError::MissingId);
        }
        if self.text.trim().is_empty() {
            return Err(MalformedClaimError::EmptyText {
                claim_id: self.id.clone(),
            });
        }
        if !(0.0..=1.0).contains(&self.initial_confidence) {
            return Err(MalformedClaimError::ConfidenceOutOfRange {
                claim_id: self.id.clone(),
                value: self.initial_confidence,
            });
        }
        if self.evidence.is_empty() {
            return Err(MalformedClaimError::NoEvidence {
                claim_id: self.id.clone(),
            });
        }
        Ok(())
    }
}
