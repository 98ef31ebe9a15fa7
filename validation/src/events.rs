//! Engine event bus.
//!
//! Pub/sub over a Tokio broadcast channel. Publishing never fails: with no
//! subscribers the event is dropped. Slow subscribers may lag and miss events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::debate::{AgentRole, DebatePhase};
use crate::scoring::QualityGrade;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Error type for event subscribers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventBusError {
    #[error("subscriber lagged and skipped {0} events")]
    Lagged(u64),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Progress events emitted during a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ClaimSetStarted {
        claim_set_id: String,
        claims: usize,
        timestamp: DateTime<Utc>,
    },
    EvidenceScored {
        claim_set_id: String,
        claim_id: String,
        evidence_id: String,
        grade: QualityGrade,
        composite_score: f64,
        insufficient_data: bool,
        timestamp: DateTime<Utc>,
    },
    ClaimRejected {
        claim_set_id: String,
        claim_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RoundClosed {
        claim_set_id: String,
        claim_id: String,
        round_number: u32,
        moderator_confidence: f64,
        aggregate_confidence: f64,
        timestamp: DateTime<Utc>,
    },
    AgentRetry {
        claim_set_id: String,
        claim_id: String,
        role: AgentRole,
        round_number: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },
    ClaimConcluded {
        claim_set_id: String,
        claim_id: String,
        phase: DebatePhase,
        rounds: u32,
        timestamp: DateTime<Utc>,
    },
    ClaimSetCompleted {
        claim_set_id: String,
        consensus_reached: bool,
        approved: usize,
        rejected: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn agent_retry(
        claim_set_id: &str,
        claim_id: &str,
        role: AgentRole,
        round_number: u32,
        error: &str,
    ) -> Self {
        Self::AgentRetry {
            claim_set_id: claim_set_id.to_string(),
            claim_id: claim_id.to_string(),
            role,
            round_number,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Short event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ClaimSetStarted { .. } => "claim_set_started",
            Self::EvidenceScored { .. } => "evidence_scored",
            Self::ClaimRejected { .. } => "claim_rejected",
            Self::RoundClosed { .. } => "round_closed",
            Self::AgentRetry { .. } => "agent_retry",
            Self::ClaimConcluded { .. } => "claim_concluded",
            Self::ClaimSetCompleted { .. } => "claim_set_completed",
        }
    }

    pub fn claim_set_id(&self) -> &str {
        match self {
            Self::ClaimSetStarted { claim_set_id, .. }
            | Self::EvidenceScored { claim_set_id, .. }
            | Self::ClaimRejected { claim_set_id, .. }
            | Self::RoundClosed { claim_set_id, .. }
            | Self::AgentRetry { claim_set_id, .. }
            | Self::ClaimConcluded { claim_set_id, .. }
            | Self::ClaimSetCompleted { claim_set_id, .. } => claim_set_id,
        }
    }

    pub fn claim_id(&self) -> Option<&str> {
        match self {
            Self::EvidenceScored { claim_id, .. }
            | Self::ClaimRejected { claim_id, .. }
            | Self::RoundClosed { claim_id, .. }
            | Self::AgentRetry { claim_id, .. }
            | Self::ClaimConcluded { claim_id, .. } => Some(claim_id),
            Self::ClaimSetStarted { .. } | Self::ClaimSetCompleted { .. } => None,
        }
    }
}

/// Broadcast event bus
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish to all subscribers. Returns the number of receivers reached.
    pub fn publish(&self, event: EngineEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type, receivers = count, "event published");
                count
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events of one claim set only.
    pub fn subscribe_claim_set(&self, claim_set_id: &str) -> FilteredReceiver {
        FilteredReceiver {
            receiver: self.subscribe(),
            claim_set_id: claim_set_id.to_string(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver yielding only events of one claim set.
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<EngineEvent>,
    claim_set_id: String,
}

impl FilteredReceiver {
    /// Receive the next matching event
    pub async fn recv(&mut self) -> EventBusResult<EngineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.claim_set_id() == self.claim_set_id => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(EventBusError::Lagged(n))
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> EngineEvent {
        EngineEvent::ClaimSetStarted {
            claim_set_id: id.into(),
            claims: 2,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        assert_eq!(bus.publish(started("set-1")), 1);
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "claim_set_started");
        assert_eq!(event.claim_set_id(), "set-1");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(started("set-1")), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_filtered_receiver_skips_other_sets() {
        let bus = EventBus::new().shared();
        let mut filtered = bus.subscribe_claim_set("set-2");
        bus.publish(started("set-1"));
        bus.publish(EngineEvent::agent_retry(
            "set-2",
            "c1",
            AgentRole::Critic,
            1,
            "timeout",
        ));
        let event = filtered.recv().await.unwrap();
        assert_eq!(event.event_type(), "agent_retry");
        assert_eq!(event.claim_id(), Some("c1"));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let bus = EventBus::new();
        let mut filtered = bus.subscribe_claim_set("x");
        drop(bus);
        assert_eq!(filtered.recv().await.unwrap_err(), EventBusError::ChannelClosed);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(started("set-9")).unwrap();
        assert_eq!(json["type"], "claim_set_started");
        assert_eq!(json["claims"], 2);
    }
}
