//! Round-based multi-agent debate.
//!
//! Each debate-eligible claim runs its own pipeline of rounds; pipelines of
//! one claim set run concurrently, bounded by `max_parallel_claims`.
//!
//! # Round Flow
//!
//! ```text
//! Strategist ─▶ Critic ─▶ Adversary ─▶ Moderator ─▶ [rules]
//!   (claim)    (challenge) (worst case)  (synthesis)     │
//!                                                        ├─ pass, confident → Consensus
//!                                                        ├─ fail, rounds left → next round
//!                                                        ├─ fail, no rounds  → Exhausted
//!                                                        └─ safety/bias flag → Rejected
//! ```

pub mod agent;
pub mod guardrails;
pub mod message;
pub mod orchestrator;
pub mod prompts;
pub mod scripted;
pub mod sequencing;
pub mod state;

pub use agent::{
    AgentError, AgentInvoker, ClaimBrief, DebateAgent, EvidenceBrief, PromptContext, RoundDigest,
    SharedAgent,
};
pub use guardrails::{max_rounds_for, TerminationCheck};
pub use message::{
    AgentRole, AlternativeHypothesis, ConstitutionalFlag, DebateMessage, DebateRound,
    FlagCategory, MessageRef, MessageType, RevisionProposal,
};
pub use orchestrator::{ClaimDebate, DebateConfig, DebateError, DebateOrchestrator};
pub use prompts::PROMPT_VERSION;
pub use scripted::{RoundScript, ScriptedAgent, ScriptedCall};
pub use sequencing::ClaimSetSequencer;
pub use state::{DebatePhase, DebateSession, DebateTransition, TransitionError};
