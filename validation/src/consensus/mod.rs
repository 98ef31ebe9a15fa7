//! Confidence aggregation, the four validation rules, and the verdict.

pub mod aggregate;
pub mod rules;
pub mod verdict;

pub use aggregate::{aggregate, ConfidenceAggregator, RoleWeights};
pub use rules::{
    acknowledges_uncertainty, ConsensusValidator, ModificationRequest, RoundDecision,
    RoundEvaluation, ValidationFailure, ValidationRule,
};
pub use verdict::{
    ComplianceTag, ConstitutionalCompliance, Verdict, VerdictBuilder, VerdictError,
};
