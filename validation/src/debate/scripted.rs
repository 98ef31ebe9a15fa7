//! Deterministic agent driven by a per-claim script.
//!
//! Used by the engine's own tests and by callers that need reproducible
//! transcripts (fixtures, dry runs). Every response is a pure function of
//! the script, the role, the claim, and the round.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::agent::{AgentError, DebateAgent, PromptContext};
use super::message::{AgentRole, DebateMessage, FlagCategory};

/// Confidences for one round, in speaking order.
pub type RoundScript = [f64; 4];

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCall {
    pub role: AgentRole,
    pub round_number: u32,
    pub claim_ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    role: AgentRole,
    round_number: u32,
    remaining: u32,
    error: AgentError,
}

/// Agent that replays scripted confidences.
///
/// Claims without a script use the default round script. When a claim has
/// fewer scripted rounds than the debate runs, the last one repeats.
pub struct ScriptedAgent {
    default_round: RoundScript,
    scripts: HashMap<String, Vec<RoundScript>>,
    synthesis: HashMap<String, String>,
    revisions: HashMap<String, (String, f64)>,
    flags: HashMap<String, (FlagCategory, String)>,
    alternatives: HashMap<String, Vec<String>>,
    challenges: Vec<String>,
    delays: HashMap<AgentRole, Duration>,
    failures: Mutex<Vec<ScriptedFailure>>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self {
            default_round: [0.85; 4],
            scripts: HashMap::new(),
            synthesis: HashMap::new(),
            revisions: HashMap::new(),
            flags: HashMap::new(),
            alternatives: HashMap::new(),
            challenges: vec!["sample size and methodology should be confirmed".to_string()],
            delays: HashMap::new(),
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Confidences for every claim without its own script.
    pub fn with_default_round(mut self, round: RoundScript) -> Self {
        self.default_round = round;
        self
    }

    /// Confidences for `claim_id`, one entry per round.
    pub fn with_script(mut self, claim_id: &str, rounds: Vec<RoundScript>) -> Self {
        self.scripts.insert(claim_id.to_string(), rounds);
        self
    }

    /// Moderator synthesis text for `claim_id`.
    pub fn with_synthesis(mut self, claim_id: &str, text: &str) -> Self {
        self.synthesis.insert(claim_id.to_string(), text.to_string());
        self
    }

    /// Moderator revision proposed every round for `claim_id`.
    pub fn with_revision(mut self, claim_id: &str, text: &str, confidence: f64) -> Self {
        self.revisions
            .insert(claim_id.to_string(), (text.to_string(), confidence));
        self
    }

    /// Moderator flag raised every round for `claim_id`.
    pub fn with_flag(mut self, claim_id: &str, category: FlagCategory, reason: &str) -> Self {
        self.flags
            .insert(claim_id.to_string(), (category, reason.to_string()));
        self
    }

    /// Competing hypothesis the critic raises every round for `claim_id`.
    pub fn with_alternative(mut self, claim_id: &str, statement: &str) -> Self {
        self.alternatives
            .entry(claim_id.to_string())
            .or_default()
            .push(statement.to_string());
        self
    }

    /// Critic challenges; empty disables them.
    pub fn with_challenges(mut self, challenges: &[&str]) -> Self {
        self.challenges = challenges.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Sleep before every `role` response.
    pub fn with_delay(mut self, role: AgentRole, delay: Duration) -> Self {
        self.delays.insert(role, delay);
        self
    }

    /// Fail the next `times` calls to `role` in `round_number` with `error`.
    pub fn failing(self, role: AgentRole, round_number: u32, times: u32, error: AgentError) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ScriptedFailure {
                role,
                round_number,
                remaining: times,
                error,
            });
        self
    }

    /// Invocations so far, in call order.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn confidence(&self, claim_id: &str, role: AgentRole, round_number: u32) -> f64 {
        let round = self
            .scripts
            .get(claim_id)
            .and_then(|rounds| {
                let idx = (round_number.max(1) as usize - 1).min(rounds.len().saturating_sub(1));
                rounds.get(idx)
            })
            .unwrap_or(&self.default_round);
        let idx = AgentRole::ORDER
            .iter()
            .position(|r| *r == role)
            .unwrap_or(0);
        round[idx]
    }

    fn take_failure(&self, role: AgentRole, round_number: u32) -> Option<AgentError> {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let failure = failures
            .iter_mut()
            .find(|f| f.role == role && f.round_number == round_number && f.remaining > 0)?;
        failure.remaining -= 1;
        Some(failure.error.clone())
    }
}

#[async_trait]
impl DebateAgent for ScriptedAgent {
    async fn invoke(
        &self,
        role: AgentRole,
        context: &PromptContext,
    ) -> Result<DebateMessage, AgentError> {
        let round = context.round_number;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ScriptedCall {
                role,
                round_number: round,
                claim_ids: context.claim_ids().map(str::to_string).collect(),
            });

        if let Some(delay) = self.delays.get(&role) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.take_failure(role, round) {
            return Err(error);
        }

        let claim_id = context.claim_ids().next().unwrap_or_default().to_string();
        let confidence = self.confidence(&claim_id, role, round);
        let evidence_ids = context
            .claims
            .iter()
            .flat_map(|c| c.evidence.iter().map(|e| e.evidence_id.clone()));

        let message = match role {
            AgentRole::Strategist => DebateMessage::new(
                role,
                round,
                &format!("Claim {claim_id} is supported by the cited evidence."),
                confidence,
            )
            .with_evidence_refs(evidence_ids),
            AgentRole::Critic => {
                let m = self.challenges.iter().fold(
                    DebateMessage::new(role, round, "Methodology review.", confidence),
                    |m, c| m.with_challenge(c),
                );
                self.alternatives
                    .get(&claim_id)
                    .into_iter()
                    .flatten()
                    .fold(m, |m, a| m.with_alternative(&claim_id, a))
            }
            AgentRole::Adversary => DebateMessage::new(
                role,
                round,
                "Under an economic downturn the claim weakens but holds.",
                confidence,
            ),
            AgentRole::Moderator => {
                let text = self.synthesis.get(&claim_id).cloned().unwrap_or_else(|| {
                    format!(
                        "Claim {claim_id} holds within the estimated range; main limitation is sample size."
                    )
                });
                let mut m = DebateMessage::new(role, round, &text, confidence);
                if let Some((text, conf)) = self.revisions.get(&claim_id) {
                    m = m.with_revision(&claim_id, text, *conf);
                }
                if let Some((category, reason)) = self.flags.get(&claim_id) {
                    m = m.with_flag(&claim_id, *category, reason);
                }
                m
            }
        };
        Ok(message)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
