//! Agent boundary: the `DebateAgent` trait, prompt context, and the
//! timeout/retry wrapper every call goes through.
//!
//! ```text
//! AgentInvoker::call(role, ctx)
//!   attempt 1 ── timeout(agent.invoke) ──▶ ok ──▶ stamp role/round ──▶ DebateMessage
//!      │ timeout / transient / malformed
//!   attempt 2 ── timeout(agent.invoke) ──▶ ok ──▶ …
//!      │ still failing
//!      ▼
//!   DebateError::AgentTimeout       (Unavailable short-circuits to AgentUnavailable)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::message::{AgentRole, DebateMessage, DebateRound};
use super::orchestrator::DebateError;
use super::prompts;
use crate::events::{EngineEvent, SharedEventBus};
use crate::model::{Claim, EvidenceDomain};
use crate::scoring::{QualityAssessment, QualityGrade};

/// Maximum characters of evidence text passed to an agent.
const EXCERPT_CHARS: usize = 280;

/// Failure of a single agent call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("agent call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transient agent failure: {0}")]
    Transient(String),

    #[error("malformed agent response: {0}")]
    Malformed(String),

    /// Provider unreachable. Treated as loss of connectivity, never retried.
    #[error("agent provider unavailable: {0}")]
    Unavailable(String),
}

impl AgentError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transient(_) | Self::Malformed(_)
        )
    }
}

/// A debate participant backed by some model provider.
///
/// Implementations decide routing and model choice; the engine only sees
/// `invoke`. The returned message's role and round are overwritten by the
/// invoker, so implementations need not set them reliably.
#[async_trait]
pub trait DebateAgent: Send + Sync {
    async fn invoke(
        &self,
        role: AgentRole,
        context: &PromptContext,
    ) -> Result<DebateMessage, AgentError>;

    /// Name for logs.
    fn name(&self) -> &str {
        "agent"
    }
}

/// Shared handle to an agent.
pub type SharedAgent = Arc<dyn DebateAgent>;

/// Evidence as an agent sees it: excerpt plus its assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBrief {
    pub evidence_id: String,
    pub excerpt: String,
    pub domain: EvidenceDomain,
    pub source_url: String,
    pub grade: Option<QualityGrade>,
    pub composite_score: Option<f64>,
    pub credibility: Option<f64>,
}

/// A claim as an agent sees it: current revision plus its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimBrief {
    pub claim_id: String,
    pub text: String,
    pub confidence: f64,
    pub evidence: Vec<EvidenceBrief>,
}

impl ClaimBrief {
    /// Brief for `claim`, looking assessments up by evidence id.
    pub fn from_claim<'a>(
        claim: &Claim,
        assessment_of: impl Fn(&str) -> Option<&'a QualityAssessment>,
    ) -> Self {
        let evidence = claim
            .evidence
            .iter()
            .map(|e| {
                let a = assessment_of(&e.id);
                EvidenceBrief {
                    evidence_id: e.id.clone(),
                    excerpt: e.text.chars().take(EXCERPT_CHARS).collect(),
                    domain: e.domain,
                    source_url: e.source_url.clone(),
                    grade: a.map(|a| a.quality_grade),
                    composite_score: a.map(|a| a.composite_score),
                    credibility: a.map(|a| a.credibility),
                }
            })
            .collect();
        Self {
            claim_id: claim.id.clone(),
            text: claim.current_text().to_string(),
            confidence: claim.current_confidence(),
            evidence,
        }
    }
}

/// Digest of an earlier closed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDigest {
    pub round_number: u32,
    pub synthesis: String,
    pub moderator_confidence: f64,
    pub challenges: Vec<String>,
}

impl From<&DebateRound> for RoundDigest {
    fn from(round: &DebateRound) -> Self {
        Self {
            round_number: round.round_number,
            synthesis: round.synthesis.clone(),
            moderator_confidence: round.moderator_confidence(),
            challenges: round.challenges().map(str::to_string).collect(),
        }
    }
}

/// Everything one role sees when it is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub claim_set_id: String,
    pub role: AgentRole,
    pub round_number: u32,
    pub max_rounds: u32,
    pub consensus_threshold: f64,
    pub prompt_version: String,
    pub claims: Vec<ClaimBrief>,
    /// Messages already produced in this round, in speaking order.
    pub round_messages: Vec<DebateMessage>,
    pub previous_rounds: Vec<RoundDigest>,
    /// Amendments from pre-debate verification.
    pub verification_notes: Vec<String>,
}

impl PromptContext {
    pub fn claim_ids(&self) -> impl Iterator<Item = &str> {
        self.claims.iter().map(|c| c.claim_id.as_str())
    }

    /// Latest message from `role` in this round.
    pub fn message_from(&self, role: AgentRole) -> Option<&DebateMessage> {
        self.round_messages.iter().rev().find(|m| m.agent_role == role)
    }

    /// User-prompt text for providers that take free text.
    pub fn render(&self) -> String {
        let mut out = format!(
            "## Round {}/{} (consensus threshold {:.2})\n\n## Claims\n",
            self.round_number, self.max_rounds, self.consensus_threshold
        );
        for claim in &self.claims {
            out.push_str(&format!(
                "- [{}] {} (confidence {:.2})\n",
                claim.claim_id, claim.text, claim.confidence
            ));
            for e in &claim.evidence {
                let grade = e
                    .grade
                    .map(|g| g.to_string())
                    .unwrap_or_else(|| "ungraded".into());
                out.push_str(&format!(
                    "  - evidence {} [{}, {}]: {}\n",
                    e.evidence_id, grade, e.domain, e.excerpt
                ));
            }
        }
        if !self.verification_notes.is_empty() {
            out.push_str("\n## Verification notes\n");
            for note in &self.verification_notes {
                out.push_str(&format!("- {note}\n"));
            }
        }
        if !self.previous_rounds.is_empty() {
            out.push_str("\n## Previous rounds\n");
            for r in &self.previous_rounds {
                out.push_str(&format!(
                    "- round {} (moderator {:.2}): {}\n",
                    r.round_number, r.moderator_confidence, r.synthesis
                ));
            }
        }
        if !self.round_messages.is_empty() {
            out.push_str("\n## This round so far\n");
            for m in &self.round_messages {
                out.push_str(&format!(
                    "- {} (confidence {:.2}): {}\n",
                    m.agent_role, m.confidence, m.content
                ));
                for c in &m.challenges_raised {
                    out.push_str(&format!("  - challenge: {c}\n"));
                }
            }
        }
        out.push_str("\n## Response format\n");
        out.push_str(prompts::RESPONSE_FORMAT);
        out
    }
}

/// Wraps an agent with per-call timeout, bounded retry, and cancellation.
#[derive(Clone)]
pub struct AgentInvoker {
    agent: SharedAgent,
    timeout: Duration,
    max_call_retries: u32,
    cancel: CancellationToken,
    events: Option<SharedEventBus>,
}

impl AgentInvoker {
    pub fn new(agent: SharedAgent, timeout: Duration, max_call_retries: u32) -> Self {
        Self {
            agent,
            timeout,
            max_call_retries,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Invoke `role`, retrying retriable failures up to `max_call_retries` times.
    pub async fn call(
        &self,
        role: AgentRole,
        ctx: &PromptContext,
    ) -> Result<DebateMessage, DebateError> {
        let attempts = self.max_call_retries + 1;
        let mut last_error = AgentError::Transient("not attempted".into());

        for attempt in 1..=attempts {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DebateError::Cancelled),
                res = tokio::time::timeout(self.timeout, self.agent.invoke(role, ctx)) => res,
            };

            let error = match outcome {
                Ok(Ok(mut message)) => {
                    message.agent_role = role;
                    message.round_number = ctx.round_number;
                    message.message_type = role.message_type();
                    if message.has_valid_confidence() {
                        debug!(agent = self.agent.name(), %role, round = ctx.round_number, attempt, confidence = message.confidence, "agent responded");
                        return Ok(message);
                    }
                    AgentError::Malformed(format!("confidence {} outside [0, 1]", message.confidence))
                }
                Ok(Err(AgentError::Unavailable(reason))) => {
                    return Err(DebateError::AgentUnavailable(reason));
                }
                Ok(Err(e)) => e,
                Err(_) => AgentError::Timeout(self.timeout),
            };

            if !error.is_retriable() {
                return Err(DebateError::AgentTimeout {
                    role,
                    attempts: attempt,
                    reason: error.to_string(),
                });
            }
            if attempt < attempts {
                warn!(agent = self.agent.name(), %role, round = ctx.round_number, attempt, error = %error, "agent call failed, retrying");
                if let Some(bus) = &self.events {
                    bus.publish(EngineEvent::agent_retry(
                        &ctx.claim_set_id,
                        ctx.claim_ids().next().unwrap_or_default(),
                        role,
                        ctx.round_number,
                        &error.to_string(),
                    ));
                }
            }
            last_error = error;
        }

        Err(DebateError::AgentTimeout {
            role,
            attempts,
            reason: last_error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyAgent {
        failures: AtomicU32,
        error: AgentError,
        calls: AtomicU32,
    }

    impl FlakyAgent {
        fn new(failures: u32, error: AgentError) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                error,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DebateAgent for FlakyAgent {
        async fn invoke(
            &self,
            role: AgentRole,
            _context: &PromptContext,
        ) -> Result<DebateMessage, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(self.error.clone());
            }
            // Deliberately wrong round; the invoker stamps the real one.
            Ok(DebateMessage::new(role, 99, "ok", 0.7))
        }
    }

    struct SlowAgent;

    #[async_trait]
    impl DebateAgent for SlowAgent {
        async fn invoke(
            &self,
            role: AgentRole,
            _context: &PromptContext,
        ) -> Result<DebateMessage, AgentError> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(DebateMessage::new(role, 1, "late", 0.9))
        }
    }

    fn ctx() -> PromptContext {
        PromptContext {
            claim_set_id: "set".into(),
            role: AgentRole::Critic,
            round_number: 2,
            max_rounds: 3,
            consensus_threshold: 0.8,
            prompt_version: prompts::PROMPT_VERSION.into(),
            claims: vec![ClaimBrief {
                claim_id: "c1".into(),
                text: "claim".into(),
                confidence: 0.6,
                evidence: vec![],
            }],
            round_messages: vec![],
            previous_rounds: vec![],
            verification_notes: vec![],
        }
    }

    #[tokio::test]
    async fn test_success_stamps_role_and_round() {
        let agent = Arc::new(FlakyAgent::new(0, AgentError::Transient("x".into())));
        let invoker = AgentInvoker::new(agent, Duration::from_secs(1), 1);
        let msg = invoker.call(AgentRole::Critic, &ctx()).await.unwrap();
        assert_eq!(msg.round_number, 2);
        assert_eq!(msg.agent_role, AgentRole::Critic);
    }

    #[tokio::test]
    async fn test_one_transient_failure_is_retried() {
        let agent = Arc::new(FlakyAgent::new(1, AgentError::Transient("reset".into())));
        let invoker = AgentInvoker::new(agent.clone(), Duration::from_secs(1), 1);
        assert!(invoker.call(AgentRole::Critic, &ctx()).await.is_ok());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_failure_escalates() {
        let agent = Arc::new(FlakyAgent::new(2, AgentError::Transient("reset".into())));
        let invoker = AgentInvoker::new(agent.clone(), Duration::from_secs(1), 1);
        let err = invoker.call(AgentRole::Adversary, &ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            DebateError::AgentTimeout {
                role: AgentRole::Adversary,
                attempts: 2,
                ..
            }
        ));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unavailable_is_not_retried() {
        let agent = Arc::new(FlakyAgent::new(5, AgentError::Unavailable("dns".into())));
        let invoker = AgentInvoker::new(agent.clone(), Duration::from_secs(1), 1);
        let err = invoker.call(AgentRole::Critic, &ctx()).await.unwrap_err();
        assert!(matches!(err, DebateError::AgentUnavailable(_)));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced() {
        let invoker = AgentInvoker::new(Arc::new(SlowAgent), Duration::from_secs(60), 1);
        let err = invoker.call(AgentRole::Strategist, &ctx()).await.unwrap_err();
        match err {
            DebateError::AgentTimeout { attempts, reason, .. } => {
                assert_eq!(attempts, 2);
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let invoker = AgentInvoker::new(Arc::new(SlowAgent), Duration::from_secs(60), 1)
            .with_cancellation(cancel);
        let err = invoker.call(AgentRole::Strategist, &ctx()).await.unwrap_err();
        assert!(matches!(err, DebateError::Cancelled));
    }

    #[test]
    fn test_render_includes_claims_and_format() {
        let text = ctx().render();
        assert!(text.contains("Round 2/3"));
        assert!(text.contains("[c1] claim"));
        assert!(text.contains("Respond with a single JSON object"));
    }

    #[test]
    fn test_retriable_classification() {
        assert!(AgentError::Timeout(Duration::from_secs(1)).is_retriable());
        assert!(AgentError::Malformed("x".into()).is_retriable());
        assert!(!AgentError::Unavailable("x".into()).is_retriable());
    }
}
