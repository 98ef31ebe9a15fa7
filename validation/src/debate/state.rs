//! Debate state machine: phases, transitions, and per-claim session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::DebateRound;

/// Phase of a claim's debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Claim and scored evidence ready; the strategist speaks next.
    Proposed,
    /// Critic has challenged the claim.
    Challenged,
    /// Adversary has run worst-case exploration.
    StressTested,
    /// Moderator has synthesized the round.
    Synthesized,
    /// Validation rules passed; claim approved.
    Consensus,
    /// Another round is needed and allowed.
    AdditionalRoundNeeded,
    /// Round limit reached, or the round failed, without consensus.
    Exhausted,
    /// Rejected by the evidence-quality or constitutional rule.
    Rejected,
    /// Cancelled by the caller or a process-level failure.
    Aborted,
}

impl DebatePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Consensus | Self::Exhausted | Self::Rejected | Self::Aborted
        )
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Proposed => &[
                Self::Challenged,
                Self::Rejected,
                Self::Exhausted,
                Self::Aborted,
            ],
            Self::Challenged => &[Self::StressTested, Self::Aborted],
            Self::StressTested => &[Self::Synthesized, Self::Aborted],
            Self::Synthesized => &[
                Self::Consensus,
                Self::AdditionalRoundNeeded,
                Self::Exhausted,
                Self::Rejected,
                Self::Aborted,
            ],
            Self::AdditionalRoundNeeded => &[Self::Proposed, Self::Aborted],
            Self::Consensus | Self::Exhausted | Self::Rejected | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposed => write!(f, "proposed"),
            Self::Challenged => write!(f, "challenged"),
            Self::StressTested => write!(f, "stress_tested"),
            Self::Synthesized => write!(f, "synthesized"),
            Self::Consensus => write!(f, "consensus"),
            Self::AdditionalRoundNeeded => write!(f, "additional_round_needed"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    /// Round in effect when the transition happened.
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} → {to}: {reason}")]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

/// Debate state and closed-round history for one claim.
///
/// Rounds are appended only through [`DebateSession::apply_round`], which
/// accepts a fully formed round and walks it through the in-round phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    /// Unique session identifier.
    pub id: String,
    pub claim_set_id: String,
    pub claim_id: String,
    pub phase: DebatePhase,
    /// Round currently open (1-indexed).
    pub current_round: u32,
    pub max_rounds: u32,
    pub rounds: Vec<DebateRound>,
    pub transitions: Vec<DebateTransition>,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    /// New session in `Proposed`, round 1 open.
    pub fn new(claim_set_id: &str, claim_id: &str, max_rounds: u32) -> Self {
        Self {
            id: format!("{claim_set_id}/{claim_id}"),
            claim_set_id: claim_set_id.to_string(),
            claim_id: claim_id.to_string(),
            phase: DebatePhase::Proposed,
            current_round: 1,
            max_rounds: max_rounds.max(1),
            rounds: Vec::new(),
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }
        if to == DebatePhase::Proposed && !self.has_rounds_remaining() {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!("round limit {} reached", self.max_rounds),
            });
        }

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            round: self.current_round,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        // Re-entering Proposed opens the next round.
        if to == DebatePhase::Proposed {
            self.current_round += 1;
        }

        Ok(())
    }

    /// Append a closed round and advance to `Synthesized`.
    ///
    /// The round must be well formed and numbered as the open round, and the
    /// session must be in `Proposed`. On error the session is unchanged.
    pub fn apply_round(&mut self, round: DebateRound) -> Result<(), TransitionError> {
        let reject = |session: &Self, reason: String| TransitionError {
            from: session.phase,
            to: DebatePhase::Challenged,
            reason,
        };
        if self.phase != DebatePhase::Proposed {
            return Err(reject(self, "round applied outside proposed phase".into()));
        }
        if round.round_number != self.current_round {
            return Err(reject(
                self,
                format!(
                    "round {} applied while round {} is open",
                    round.round_number, self.current_round
                ),
            ));
        }
        round
            .check_well_formed()
            .map_err(|reason| reject(self, reason))?;

        self.transition(DebatePhase::Challenged, "critic responded")?;
        self.transition(DebatePhase::StressTested, "adversary responded")?;
        self.transition(DebatePhase::Synthesized, "moderator synthesized")?;
        self.rounds.push(round);
        Ok(())
    }

    /// Whether the debate has ended.
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether another round may be opened after the current one.
    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.max_rounds
    }

    pub fn last_round(&self) -> Option<&DebateRound> {
        self.rounds.last()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} rounds recorded | claim={}",
            self.phase,
            self.current_round,
            self.max_rounds,
            self.rounds.len(),
            self.claim_id
        )
    }
}
