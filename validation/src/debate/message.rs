//! Debate messages, roles, and closed rounds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed debate role. Prompt templates are data keyed by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Produces or revises the claim set with cited evidence.
    Strategist,
    /// Challenges methodology, evidence quality, and assumptions.
    Critic,
    /// Explores worst cases and proposes stress-tested confidence.
    Adversary,
    /// Synthesizes the round and decides whether to continue.
    Moderator,
}

impl AgentRole {
    /// Roles in the order they speak within a round.
    pub const ORDER: [AgentRole; 4] = [
        Self::Strategist,
        Self::Critic,
        Self::Adversary,
        Self::Moderator,
    ];

    /// Message type this role produces.
    pub fn message_type(self) -> MessageType {
        match self {
            Self::Strategist => MessageType::Claim,
            Self::Critic => MessageType::Challenge,
            Self::Adversary => MessageType::Evidence,
            Self::Moderator => MessageType::Synthesis,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strategist => write!(f, "strategist"),
            Self::Critic => write!(f, "critic"),
            Self::Adversary => write!(f, "adversary"),
            Self::Moderator => write!(f, "moderator"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Claim,
    Challenge,
    Evidence,
    Synthesis,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Claim => write!(f, "claim"),
            Self::Challenge => write!(f, "challenge"),
            Self::Evidence => write!(f, "evidence"),
            Self::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Constitutional category a moderator flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagCategory {
    Safety,
    Bias,
    Accuracy,
}

impl FlagCategory {
    /// Whether this flag rejects the claim outright.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Safety | Self::Bias)
    }
}

impl std::fmt::Display for FlagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safety => write!(f, "safety"),
            Self::Bias => write!(f, "bias"),
            Self::Accuracy => write!(f, "accuracy"),
        }
    }
}

/// A constitutional concern raised against one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstitutionalFlag {
    pub claim_id: String,
    pub category: FlagCategory,
    pub reason: String,
}

/// A revised claim text and confidence proposed by the moderator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionProposal {
    pub claim_id: String,
    pub text: String,
    pub confidence: f64,
}

/// A competing explanation for the evidence behind one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeHypothesis {
    pub claim_id: String,
    pub statement: String,
}

/// Pointer to another message: roles speak once per round, so round + role is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageRef {
    pub round_number: u32,
    pub role: AgentRole,
}

/// One agent's contribution to one round. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateMessage {
    pub agent_role: AgentRole,
    pub round_number: u32,
    pub message_type: MessageType,
    pub content: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence_refs: BTreeSet<String>,
    #[serde(default)]
    pub challenges_raised: Vec<String>,
    /// Messages this one builds on (the moderator's synthesis inputs).
    #[serde(default)]
    pub references: Vec<MessageRef>,
    #[serde(default)]
    pub revisions: Vec<RevisionProposal>,
    #[serde(default)]
    pub flags: Vec<ConstitutionalFlag>,
    #[serde(default)]
    pub alternatives: Vec<AlternativeHypothesis>,
}

impl DebateMessage {
    pub fn new(role: AgentRole, round_number: u32, content: &str, confidence: f64) -> Self {
        Self {
            agent_role: role,
            round_number,
            message_type: role.message_type(),
            content: content.to_string(),
            confidence,
            evidence_refs: BTreeSet::new(),
            challenges_raised: Vec::new(),
            references: Vec::new(),
            revisions: Vec::new(),
            flags: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_evidence_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence_refs.extend(refs.into_iter().map(Into::into));
        self
    }

    pub fn with_challenge(mut self, challenge: &str) -> Self {
        self.challenges_raised.push(challenge.to_string());
        self
    }

    pub fn with_reference(mut self, round_number: u32, role: AgentRole) -> Self {
        self.references.push(MessageRef { round_number, role });
        self
    }

    pub fn with_revision(mut self, claim_id: &str, text: &str, confidence: f64) -> Self {
        self.revisions.push(RevisionProposal {
            claim_id: claim_id.to_string(),
            text: text.to_string(),
            confidence,
        });
        self
    }

    pub fn with_flag(mut self, claim_id: &str, category: FlagCategory, reason: &str) -> Self {
        self.flags.push(ConstitutionalFlag {
            claim_id: claim_id.to_string(),
            category,
            reason: reason.to_string(),
        });
        self
    }

    pub fn with_alternative(mut self, claim_id: &str, statement: &str) -> Self {
        self.alternatives.push(AlternativeHypothesis {
            claim_id: claim_id.to_string(),
            statement: statement.to_string(),
        });
        self
    }

    /// Whether `confidence` is a finite value in [0, 1].
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// One closed execution of all four roles. Append-only history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    /// Round number (1-indexed).
    pub round_number: u32,
    /// Claims debated in this round.
    pub claim_ids: Vec<String>,
    /// Messages in speaking order; the last one is the moderator's.
    pub messages: Vec<DebateMessage>,
    /// Moderator's synthesis text.
    pub synthesis: String,
    /// Attempts needed to close the round (1 unless retried).
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl DebateRound {
    pub fn message(&self, role: AgentRole) -> Option<&DebateMessage> {
        self.messages.iter().find(|m| m.agent_role == role)
    }

    pub fn moderator(&self) -> Option<&DebateMessage> {
        self.message(AgentRole::Moderator)
    }

    /// Moderator confidence, or 0.0 when the round has no moderator message.
    pub fn moderator_confidence(&self) -> f64 {
        self.moderator().map(|m| m.confidence).unwrap_or(0.0)
    }

    /// Every challenge raised in the round, in speaking order.
    pub fn challenges(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(|m| m.challenges_raised.iter().map(String::as_str))
    }

    pub fn flags(&self) -> impl Iterator<Item = &ConstitutionalFlag> {
        self.messages.iter().flat_map(|m| m.flags.iter())
    }

    /// Competing hypotheses raised in the round, in speaking order.
    pub fn alternatives(&self) -> impl Iterator<Item = &AlternativeHypothesis> {
        self.messages.iter().flat_map(|m| m.alternatives.iter())
    }

    /// Structural check: one message per role in order, all for this round,
    /// and a moderator synthesis that references the same round.
    pub fn check_well_formed(&self) -> Result<(), String> {
        let roles: Vec<AgentRole> = self.messages.iter().map(|m| m.agent_role).collect();
        if roles != AgentRole::ORDER {
            return Err(format!("expected roles {:?}, got {:?}", AgentRole::ORDER, roles));
        }
        if let Some(m) = self
            .messages
            .iter()
            .find(|m| m.round_number != self.round_number)
        {
            return Err(format!(
                "{} message carries round {} in round {}",
                m.agent_role, m.round_number, self.round_number
            ));
        }
        if let Some(m) = self.messages.iter().find(|m| !m.has_valid_confidence()) {
            return Err(format!(
                "{} confidence {} outside [0, 1]",
                m.agent_role, m.confidence
            ));
        }
        let references_round = self
            .moderator()
            .map(|m| {
                m.references
                    .iter()
                    .any(|r| r.round_number == self.round_number && r.role != AgentRole::Moderator)
            })
            .unwrap_or(false);
        if !references_round {
            return Err("moderator synthesis references no message from this round".into());
        }
        Ok(())
    }
}
