//! Claim Validation Library
//!
//! Validates strategic claims before they reach a recommendation:
//! - Evidence quality scoring across five dimensions with penalties and grades
//! - Context-adaptive weighting driven by the decision being made
//! - A Strategist → Critic → Adversary → Moderator debate per claim
//! - Confidence aggregation and a four-rule consensus check
//! - Competing-hypotheses analysis of each debated claim
//! - Chain-of-verification, stress tests, and advisory anomaly checks
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use claim_validation::{EngineConfig, ScriptedAgent, ValidationEngine, ValidationRequest};
//!
//! # async fn run() -> Result<(), claim_validation::EngineError> {
//! let engine = ValidationEngine::new(EngineConfig::default(), Arc::new(ScriptedAgent::new()))?;
//! let report = engine.validate(ValidationRequest::new("set-1", vec![])).await?;
//! println!("{}", report.summary_line());
//! # Ok(())
//! # }
//! ```

pub mod anomaly;
pub mod config;
pub mod consensus;
pub mod debate;
pub mod engine;
pub mod error;
pub mod events;
pub mod hypotheses;
pub mod model;
pub mod scoring;
pub mod stress;
pub mod verification;
pub mod weighting;

pub use anomaly::{AnomalyChecker, AnomalyKind, ScoringAnomaly, Severity};
pub use config::{AggregationConfig, EngineConfig};
pub use consensus::{ComplianceTag, ConsensusValidator, ModificationRequest, Verdict};
pub use debate::{
    AgentError, AgentRole, ClaimDebate, DebateAgent, DebateConfig, DebateError, DebatePhase,
    ScriptedAgent, SharedAgent,
};
pub use engine::{
    MalformedClaim, PartialResults, ValidationEngine, ValidationReport, ValidationRequest,
};
pub use error::{ConfigError, EngineError, EngineResult, InsufficientDataError, MalformedClaimError};
pub use events::{EngineEvent, EventBus, SharedEventBus};
pub use hypotheses::{
    CompetingHypotheses, Consistency, HypothesesConfig, Hypothesis, HypothesisMatrix,
    HypothesisOrigin,
};
pub use model::{Claim, Evidence, EvidenceDomain, SourceMetadata};
pub use scoring::{
    EvidenceScorer, QualityAssessment, QualityGrade, ScoringConfiguration, ScoringContext,
    WeightConfig,
};
pub use stress::{ResilienceReport, StressScenario, StressTester};
pub use verification::{ChainOfVerification, VerificationResult, VerificationStatus};
pub use weighting::{adapt_weights, DecisionContext};
