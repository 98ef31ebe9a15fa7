//! Error taxonomy.
//!
//! | Error                    | Scope        | Fatal? |
//! |--------------------------|--------------|--------|
//! | `InsufficientDataError`  | one evidence | no: recovered with a degraded assessment |
//! | `MalformedClaimError`    | one claim    | for that claim only: rejected before debate |
//! | `DebateError`            | one claim    | `AgentTimeout` exhausts the claim; others bubble up |
//! | `ConfigError`            | process      | yes, at startup |
//! | `EngineError`            | claim set    | yes, carries partial results |
//!
//! Validation-rule failures and scoring anomalies are plain data, not errors.

use thiserror::Error;

use crate::engine::PartialResults;
use crate::scoring::QualityAssessment;

/// Evidence lacks the minimum source metadata for a full assessment.
///
/// The degraded assessment (recency and relevance only, confidence capped)
/// travels with the error so callers can recover without rescoring.
#[derive(Debug, Clone, Error)]
#[error("insufficient source metadata for evidence {evidence_id}")]
pub struct InsufficientDataError {
    pub evidence_id: String,
    pub assessment: Box<QualityAssessment>,
}

/// A claim that cannot enter the debate at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedClaimError {
    #[error("claim has no id")]
    MissingId,

    #[error("claim {claim_id} has empty text")]
    EmptyText { claim_id: String },

    #[error("claim {claim_id} has initial confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { claim_id: String, value: f64 },

    #[error("claim {claim_id} references zero evidence")]
    NoEvidence { claim_id: String },

    /// Every claim sharing the id is rejected; none of them can be told apart.
    #[error("claim id {claim_id} appears more than once in the claim set")]
    DuplicateId { claim_id: String },

    #[error("claim {claim_id} cites evidence {evidence_id} already ingested for claim {owner}")]
    EvidenceCollision {
        claim_id: String,
        evidence_id: String,
        owner: String,
    },
}

impl MalformedClaimError {
    pub fn claim_id(&self) -> Option<&str> {
        match self {
            Self::MissingId => None,
            Self::EmptyText { claim_id }
            | Self::ConfidenceOutOfRange { claim_id, .. }
            | Self::NoEvidence { claim_id }
            | Self::DuplicateId { claim_id }
            | Self::EvidenceCollision { claim_id, .. } => Some(claim_id),
        }
    }
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("scoring weights sum to {sum}, expected 1.0")]
    WeightsNotNormalized { sum: f64 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Process-level failure of a validation run.
///
/// Per-claim failures never surface here; they are recorded in the report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("lost connectivity to the agent provider: {reason}")]
    AgentConnectivityLost {
        reason: String,
        partial: Box<PartialResults>,
    },

    #[error("validation of claim set {claim_set_id} was cancelled")]
    Cancelled {
        claim_set_id: String,
        partial: Box<PartialResults>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Partial results for errors that abort mid-run.
    pub fn partial(&self) -> Option<&PartialResults> {
        match self {
            Self::AgentConnectivityLost { partial, .. } | Self::Cancelled { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_claim_messages() {
        let err = MalformedClaimError::NoEvidence {
            claim_id: "c3".into(),
        };
        assert_eq!(err.to_string(), "claim c3 references zero evidence");
        assert_eq!(err.claim_id(), Some("c3"));
        assert_eq!(MalformedClaimError::MissingId.claim_id(), None);

        let err = MalformedClaimError::EvidenceCollision {
            claim_id: "c2".into(),
            evidence_id: "e1".into(),
            owner: "c1".into(),
        };
        assert_eq!(err.claim_id(), Some("c2"));
        assert!(err.to_string().contains("already ingested for claim c1"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: EngineError = ConfigError::Zero("debate.max_parallel_claims").into();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.partial().is_none());
        assert_eq!(
            err.to_string(),
            "debate.max_parallel_claims must be greater than zero"
        );
    }
}
