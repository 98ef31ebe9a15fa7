//! Debate orchestrator: drives Strategist → Critic → Adversary → Moderator
//! rounds for one claim until a terminal phase.
//!
//! Ties together the agent invoker, the session state machine, the
//! termination guardrails, and the consensus rules.
//!
//! ```text
//!             rule 1 fails
//! Proposed ─────────────────────────────────────────▶ Rejected
//!    │ run_round (retried once on AgentTimeout)
//!    ├── round still failing ───────────────────────▶ Exhausted
//!    ▼
//! Challenged → StressTested → Synthesized ── evaluate_round
//!                                  │ Approve ───────▶ Consensus
//!                                  │ Reject ────────▶ Rejected
//!                                  │ Exhaust ───────▶ Exhausted (+ modification)
//!                                  ▼ AnotherRound
//!                        AdditionalRoundNeeded → Proposed (round + 1)
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::agent::{AgentInvoker, ClaimBrief, PromptContext, RoundDigest};
use super::message::{AgentRole, ConstitutionalFlag, DebateMessage, DebateRound};
use super::prompts::PROMPT_VERSION;
use super::state::{DebatePhase, DebateSession, TransitionError};
use crate::consensus::rules::{
    ConsensusValidator, ModificationRequest, RoundDecision, ValidationFailure,
};
use crate::error::ConfigError;
use crate::events::{EngineEvent, SharedEventBus};
use crate::model::Claim;
use crate::scoring::QualityAssessment;

/// Configuration for debate execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Minimum round budget per claim.
    pub base_rounds: u32,
    /// Hard ceiling on rounds per claim.
    pub max_rounds_ceiling: u32,
    /// Timeout for a single agent call, in milliseconds.
    pub agent_timeout_ms: u64,
    /// Retries per agent call on timeout or transient error.
    pub max_call_retries: u32,
    /// Retries of a whole round after an agent call gives up.
    pub max_round_retries: u32,
    /// Claims debated concurrently.
    pub max_parallel_claims: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            base_rounds: 3,
            max_rounds_ceiling: 5,
            agent_timeout_ms: 60_000,
            max_call_retries: 1,
            max_round_retries: 1,
            max_parallel_claims: 4,
        }
    }
}

impl DebateConfig {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_rounds == 0 {
            return Err(ConfigError::Zero("debate.base_rounds"));
        }
        if self.max_rounds_ceiling < self.base_rounds {
            return Err(ConfigError::OutOfRange {
                field: "debate.max_rounds_ceiling",
                value: f64::from(self.max_rounds_ceiling),
            });
        }
        if self.agent_timeout_ms == 0 {
            return Err(ConfigError::Zero("debate.agent_timeout_ms"));
        }
        if self.max_parallel_claims == 0 {
            return Err(ConfigError::Zero("debate.max_parallel_claims"));
        }
        Ok(())
    }
}

/// Error from debate execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DebateError {
    /// An agent call failed after its retries.
    #[error("{role} gave no usable response after {attempts} attempts: {reason}")]
    AgentTimeout {
        role: AgentRole,
        attempts: u32,
        reason: String,
    },

    /// The provider is unreachable; the whole run must stop.
    #[error("agent provider unavailable: {0}")]
    AgentUnavailable(String),

    #[error("debate cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("malformed round: {0}")]
    MalformedRound(String),
}

impl DebateError {
    /// Whether re-running the round with the same inputs may succeed.
    pub fn is_round_retriable(&self) -> bool {
        matches!(self, Self::AgentTimeout { .. } | Self::MalformedRound(_))
    }
}

/// Finished debate for one claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDebate {
    /// The claim with every revision appended to its lineage.
    pub claim: Claim,
    pub session: DebateSession,
    /// Aggregate confidence of the last closed round (0.0 when none closed).
    pub final_aggregate: f64,
    pub modification: Option<ModificationRequest>,
    /// Rule failures behind the terminal phase.
    pub failures: Vec<ValidationFailure>,
    /// Flags raised against this claim in any round.
    pub flags: Vec<ConstitutionalFlag>,
    /// Round-level failure that exhausted the claim, if any.
    pub round_error: Option<String>,
}

impl ClaimDebate {
    pub fn phase(&self) -> DebatePhase {
        self.session.phase
    }

    pub fn is_approved(&self) -> bool {
        self.session.phase == DebatePhase::Consensus
    }

    pub fn is_rejected(&self) -> bool {
        self.session.phase == DebatePhase::Rejected
    }

    /// Whether at least one round closed.
    pub fn was_debated(&self) -> bool {
        !self.session.rounds.is_empty() || self.session.phase == DebatePhase::Exhausted
    }

    pub fn rounds(&self) -> &[DebateRound] {
        &self.session.rounds
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} rounds | aggregate={:.3} | claim={}",
            self.session.phase,
            self.session.rounds.len(),
            self.final_aggregate,
            self.claim.id
        )
    }
}

/// Runs debates for the claims of one claim set.
#[derive(Clone)]
pub struct DebateOrchestrator {
    claim_set_id: String,
    invoker: AgentInvoker,
    validator: ConsensusValidator,
    max_rounds: u32,
    max_round_retries: u32,
    events: Option<SharedEventBus>,
}

impl DebateOrchestrator {
    pub fn new(
        claim_set_id: &str,
        invoker: AgentInvoker,
        validator: ConsensusValidator,
        max_rounds: u32,
        config: &DebateConfig,
    ) -> Self {
        Self {
            claim_set_id: claim_set_id.to_string(),
            invoker,
            validator,
            max_rounds: max_rounds.max(1),
            max_round_retries: config.max_round_retries,
            events: None,
        }
    }

    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn consensus_threshold(&self) -> f64 {
        self.validator.consensus_threshold
    }

    fn publish(&self, event: EngineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    /// Execute one round over `claims`: each role speaks once, in order,
    /// seeing the messages already produced this round.
    ///
    /// The moderator message is given references to every earlier message
    /// of the round when it carries none for this round.
    pub async fn run_round(
        &self,
        claims: &[Claim],
        assessments: &HashMap<String, QualityAssessment>,
        history: &[DebateRound],
        round_number: u32,
        verification_notes: &[String],
    ) -> Result<DebateRound, DebateError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut ctx = PromptContext {
            claim_set_id: self.claim_set_id.clone(),
            role: AgentRole::Strategist,
            round_number,
            max_rounds: self.max_rounds,
            consensus_threshold: self.validator.consensus_threshold,
            prompt_version: PROMPT_VERSION.to_string(),
            claims: claims
                .iter()
                .map(|c| ClaimBrief::from_claim(c, |id| assessments.get(id)))
                .collect(),
            round_messages: Vec::with_capacity(AgentRole::ORDER.len()),
            previous_rounds: history.iter().map(RoundDigest::from).collect(),
            verification_notes: verification_notes.to_vec(),
        };
        let known_evidence: Vec<&str> = claims.iter().flat_map(|c| c.evidence_ids()).collect();

        for role in AgentRole::ORDER {
            ctx.role = role;
            let mut message = self.invoker.call(role, &ctx).await?;
            message
                .evidence_refs
                .retain(|id| known_evidence.contains(&id.as_str()));
            if role == AgentRole::Moderator {
                fill_references(&mut message, &ctx.round_messages);
            }
            ctx.round_messages.push(message);
        }

        let synthesis = ctx
            .round_messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let round = DebateRound {
            round_number,
            claim_ids: claims.iter().map(|c| c.id.clone()).collect(),
            messages: ctx.round_messages,
            synthesis,
            attempts: 1,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        round.check_well_formed().map_err(DebateError::MalformedRound)?;
        Ok(round)
    }

    /// [`Self::run_round`], re-running the whole round with the same inputs
    /// up to `max_round_retries` times after a retriable failure.
    pub async fn run_round_with_retry(
        &self,
        claims: &[Claim],
        assessments: &HashMap<String, QualityAssessment>,
        history: &[DebateRound],
        round_number: u32,
        verification_notes: &[String],
    ) -> Result<DebateRound, DebateError> {
        let attempts = self.max_round_retries + 1;
        let mut attempt = 1;
        loop {
            match self
                .run_round(claims, assessments, history, round_number, verification_notes)
                .await
            {
                Ok(mut round) => {
                    round.attempts = attempt;
                    return Ok(round);
                }
                Err(e) if e.is_round_retriable() && attempt < attempts => {
                    warn!(claim_set = %self.claim_set_id, round = round_number, attempt, error = %e, "round failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Debate one claim to a terminal phase.
    ///
    /// Returns `Err` only for process-level failures (`AgentUnavailable`,
    /// `Cancelled`) and state-machine violations. A round that keeps failing
    /// exhausts the claim instead.
    pub async fn debate_claim(
        &self,
        mut claim: Claim,
        assessments: &HashMap<String, QualityAssessment>,
        verification_notes: &[String],
    ) -> Result<ClaimDebate, DebateError> {
        let mut session = DebateSession::new(&self.claim_set_id, &claim.id, self.max_rounds);
        let mut failures = Vec::new();
        let mut flags = Vec::new();
        let mut modification = None;
        let mut round_error = None;
        let mut final_aggregate = 0.0;

        if let Err(failure) = self
            .validator
            .check_evidence_quality(&claim, |id| assessments.get(id))
        {
            info!(claim_set = %self.claim_set_id, claim = %claim.id, reason = %failure.reason, "claim rejected before debate");
            session.transition(DebatePhase::Rejected, &failure.reason)?;
            self.publish(EngineEvent::ClaimRejected {
                claim_set_id: self.claim_set_id.clone(),
                claim_id: claim.id.clone(),
                reason: failure.reason.clone(),
                timestamp: Utc::now(),
            });
            failures.push(failure);
        }

        while !session.is_complete() {
            let round_number = session.current_round;
            let round = match self
                .run_round_with_retry(
                    std::slice::from_ref(&claim),
                    assessments,
                    &session.rounds,
                    round_number,
                    verification_notes,
                )
                .await
            {
                Ok(round) => round,
                Err(e) if e.is_round_retriable() => {
                    warn!(claim_set = %self.claim_set_id, claim = %claim.id, round = round_number, error = %e, "round failed after retry, exhausting claim");
                    let reason = e.to_string();
                    session.transition(DebatePhase::Exhausted, &reason)?;
                    modification = Some(ModificationRequest::from_round_failure(&claim.id, &reason));
                    round_error = Some(reason);
                    break;
                }
                Err(e) => {
                    if session.phase.valid_transitions().contains(&DebatePhase::Aborted) {
                        session.transition(DebatePhase::Aborted, &e.to_string())?;
                    }
                    return Err(e);
                }
            };

            if let Some(revision) = round
                .moderator()
                .and_then(|m| m.revisions.iter().rev().find(|r| r.claim_id == claim.id))
            {
                debug!(claim = %claim.id, round = round_number, confidence = revision.confidence, "claim revised");
                claim.revise(
                    round_number,
                    &revision.text,
                    revision.confidence,
                    "moderator synthesis",
                );
            }
            flags.extend(round.flags().filter(|f| f.claim_id == claim.id).cloned());

            let evaluation = self.validator.evaluate_round(&claim, &round, self.max_rounds);
            final_aggregate = evaluation.aggregate_confidence;
            session.apply_round(round)?;
            self.publish(EngineEvent::RoundClosed {
                claim_set_id: self.claim_set_id.clone(),
                claim_id: claim.id.clone(),
                round_number,
                moderator_confidence: evaluation.moderator_confidence,
                aggregate_confidence: evaluation.aggregate_confidence,
                timestamp: Utc::now(),
            });
            debug!(
                claim = %claim.id,
                round = round_number,
                aggregate = evaluation.aggregate_confidence,
                termination = %evaluation.termination,
                "round evaluated"
            );

            match evaluation.decision {
                RoundDecision::Approve => {
                    session.transition(DebatePhase::Consensus, "consensus rules passed")?;
                    failures.clear();
                }
                RoundDecision::Reject { failure } => {
                    session.transition(DebatePhase::Rejected, &failure.reason)?;
                    self.publish(EngineEvent::ClaimRejected {
                        claim_set_id: self.claim_set_id.clone(),
                        claim_id: claim.id.clone(),
                        reason: failure.reason.clone(),
                        timestamp: Utc::now(),
                    });
                    failures = vec![failure];
                }
                RoundDecision::AnotherRound { failures: round_failures } => {
                    session.transition(
                        DebatePhase::AdditionalRoundNeeded,
                        &describe(&round_failures, "moderator below threshold"),
                    )?;
                    session.transition(DebatePhase::Proposed, "next round")?;
                    failures = round_failures;
                }
                RoundDecision::Exhaust { failures: round_failures } => {
                    session.transition(
                        DebatePhase::Exhausted,
                        &describe(&round_failures, "round limit reached"),
                    )?;
                    modification = Some(ModificationRequest::from_failures(&claim.id, &round_failures));
                    failures = round_failures;
                }
            }
        }

        info!(
            claim_set = %self.claim_set_id,
            claim = %claim.id,
            phase = %session.phase,
            rounds = session.rounds.len(),
            aggregate = final_aggregate,
            "claim debate concluded"
        );
        self.publish(EngineEvent::ClaimConcluded {
            claim_set_id: self.claim_set_id.clone(),
            claim_id: claim.id.clone(),
            phase: session.phase,
            rounds: session.rounds.len() as u32,
            timestamp: Utc::now(),
        });

        Ok(ClaimDebate {
            claim,
            session,
            final_aggregate,
            modification,
            failures,
            flags,
            round_error,
        })
    }
}

/// Reference every earlier message of the round unless the moderator
/// already references one.
fn fill_references(moderator: &mut DebateMessage, earlier: &[DebateMessage]) {
    let round = moderator.round_number;
    moderator
        .references
        .retain(|r| r.round_number <= round && r.role != AgentRole::Moderator);
    let has_same_round = moderator.references.iter().any(|r| r.round_number == round);
    if !has_same_round {
        for m in earlier {
            moderator.references.push(super::message::MessageRef {
                round_number: round,
                role: m.agent_role,
            });
        }
    }
}

fn describe(failures: &[ValidationFailure], fallback: &str) -> String {
    if failures.is_empty() {
        fallback.to_string()
    } else {
        failures
            .iter()
            .map(|f| format!("{}: {}", f.rule, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::rules::ValidationRule;
    use crate::debate::agent::AgentError;
    use crate::debate::message::FlagCategory;
    use crate::debate::scripted::ScriptedAgent;
    use crate::model::{Evidence, EvidenceDomain};
    use crate::scoring::{CredibilityTier, QualityGrade};
    use std::sync::Arc;

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

    fn claim(id: &str) -> (Claim, HashMap<String, QualityAssessment>) {
        let ev = format!("{id}-e1");
        let claim = Claim::new(id, "Segment revenue grows roughly 10% next year", 0.7)
            .with_evidence(Evidence::new(&ev, "industry report", EvidenceDomain::FinancialMarkets));
        let mut map = HashMap::new();
        map.insert(ev.clone(), assessment(&ev, 0.82));
        (claim, map)
    }

    fn orchestrator(agent: ScriptedAgent, max_rounds: u32) -> DebateOrchestrator {
        let config = DebateConfig::default();
        let invoker = AgentInvoker::new(Arc::new(agent), Duration::from_secs(60), 1);
        DebateOrchestrator::new(
            "set-1",
            invoker,
            ConsensusValidator::new(0.8, 0.6),
            max_rounds,
            &config,
        )
    }

    #[tokio::test]
    async fn test_consensus_in_first_round() {
        let (c, a) = claim("c1");
        let debate = orchestrator(ScriptedAgent::new(), 3)
            .debate_claim(c, &a, &[])
            .await
            .unwrap();
        assert!(debate.is_approved());
        assert_eq!(debate.rounds().len(), 1);
        assert!(debate.modification.is_none());
        assert!((debate.final_aggregate - 0.85).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_moderator_references_are_filled() {
        let (c, a) = claim("c1");
        let debate = orchestrator(ScriptedAgent::new(), 3)
            .debate_claim(c, &a, &[])
            .await
            .unwrap();
        let moderator = debate.rounds()[0].moderator().unwrap();
        assert_eq!(moderator.references.len(), 3);
        assert!(moderator.references.iter().all(|r| r.round_number == 1));
    }

    #[tokio::test]
    async fn test_second_round_reaches_consensus() {
        let (c, a) = claim("c1");
        let agent = ScriptedAgent::new()
            .with_script("c1", vec![[0.7, 0.6, 0.6, 0.72], [0.85, 0.82, 0.8, 0.82]])
            .with_revision("c1", "Segment revenue grows 8-12% next year", 0.78);
        let debate = orchestrator(agent, 3).debate_claim(c, &a, &[]).await.unwrap();
        assert!(debate.is_approved());
        assert_eq!(debate.rounds().len(), 2);
        assert_eq!(debate.claim.lineage.len(), 2);
        assert_eq!(debate.claim.current_text(), "Segment revenue grows 8-12% next year");
        let phases: Vec<_> = debate.session.transitions.iter().map(|t| t.to).collect();
        assert!(phases.contains(&DebatePhase::AdditionalRoundNeeded));
    }

    #[tokio::test]
    async fn test_plateau_exhausts_with_modification() {
        let (c, a) = claim("c1");
        let agent = ScriptedAgent::new().with_script("c1", vec![[0.65; 4]]);
        let debate = orchestrator(agent, 3).debate_claim(c, &a, &[]).await.unwrap();
        assert_eq!(debate.phase(), DebatePhase::Exhausted);
        assert_eq!(debate.rounds().len(), 3);
        let m = debate.modification.unwrap();
        assert_eq!(m.failed_rules, vec![ValidationRule::Consensus]);
    }

    #[tokio::test]
    async fn test_weak_evidence_rejected_before_debate() {
        let (c, mut a) = claim("c1");
        a.insert("c1-e1".into(), assessment("c1-e1", 0.4));
        let agent = Arc::new(ScriptedAgent::new());
        let invoker = AgentInvoker::new(agent.clone(), Duration::from_secs(60), 1);
        let orch = DebateOrchestrator::new(
            "set-1",
            invoker,
            ConsensusValidator::new(0.8, 0.6),
            3,
            &DebateConfig::default(),
        );
        let debate = orch.debate_claim(c, &a, &[]).await.unwrap();
        assert!(debate.is_rejected());
        assert_eq!(debate.failures[0].rule, ValidationRule::EvidenceQuality);
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn test_safety_flag_rejects() {
        let (c, a) = claim("c1");
        let agent = ScriptedAgent::new().with_flag("c1", FlagCategory::Safety, "unsafe advice");
        let debate = orchestrator(agent, 3).debate_claim(c, &a, &[]).await.unwrap();
        assert!(debate.is_rejected());
        assert_eq!(debate.flags.len(), 1);
        assert_eq!(debate.failures[0].rule, ValidationRule::Constitutional);
    }

    #[tokio::test]
    async fn test_round_retry_recovers() {
        let (c, a) = claim("c1");
        // Two failures exhaust the call retry; the round retry then succeeds.
        let agent = ScriptedAgent::new().failing(
            AgentRole::Critic,
            1,
            2,
            AgentError::Transient("reset".into()),
        );
        let debate = orchestrator(agent, 3).debate_claim(c, &a, &[]).await.unwrap();
        assert!(debate.is_approved());
        assert_eq!(debate.rounds()[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_exhausts_claim() {
        let (c, a) = claim("c1");
        let agent = ScriptedAgent::new().failing(
            AgentRole::Adversary,
            1,
            10,
            AgentError::Transient("overloaded".into()),
        );
        let debate = orchestrator(agent, 3).debate_claim(c, &a, &[]).await.unwrap();
        assert_eq!(debate.phase(), DebatePhase::Exhausted);
        assert!(debate.rounds().is_empty());
        assert!(debate.round_error.unwrap().contains("adversary"));
        assert!(debate.modification.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_bubbles_up() {
        let (c, a) = claim("c1");
        let agent = ScriptedAgent::new().failing(
            AgentRole::Strategist,
            1,
            1,
            AgentError::Unavailable("connection refused".into()),
        );
        let err = orchestrator(agent, 3)
            .debate_claim(c, &a, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::AgentUnavailable(_)));
    }

    #[test]
    fn test_config_validation() {
        assert!(DebateConfig::default().validate().is_ok());
        let bad = DebateConfig {
            max_parallel_claims: 0,
            ..Default::default()
        };
        assert_eq!(
            bad.validate().unwrap_err(),
            ConfigError::Zero("debate.max_parallel_claims")
        );
    }
}
