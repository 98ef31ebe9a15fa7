//! Offline debate agent.
//!
//! Derives every role's message from the prompt context alone: evidence
//! grades drive the strategist, weak evidence drives the critic's
//! challenges and single-source alternatives, and the moderator averages
//! the round. Useful for dry runs
//! and for running the engine without a model provider.

use async_trait::async_trait;

use claim_validation::debate::{
    AgentError, AgentRole, ClaimBrief, DebateAgent, DebateMessage, FlagCategory, PromptContext,
};

/// Credibility below which the critic challenges an evidence item.
const WEAK_CREDIBILITY: f64 = 0.6;
/// Credibility below which the moderator raises an accuracy flag.
const UNRELIABLE_CREDIBILITY: f64 = 0.3;
/// Confidence the critic removes per challenge.
const CHALLENGE_COST: f64 = 0.04;
/// Confidence the adversary removes for the worst case.
const WORST_CASE_DISCOUNT: f64 = 0.05;
/// Confidence regained per extra round once challenges are on the record.
const ROUND_RECOVERY: f64 = 0.03;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAgent;

impl HeuristicAgent {
    pub fn new() -> Self {
        Self
    }
}

fn mean_composite(claim: &ClaimBrief) -> f64 {
    let scores: Vec<f64> = claim.evidence.iter().filter_map(|e| e.composite_score).collect();
    if scores.is_empty() {
        0.5
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn challenges_for(claim: &ClaimBrief) -> Vec<String> {
    let mut out: Vec<String> = claim
        .evidence
        .iter()
        .filter(|e| e.credibility.is_some_and(|c| c < WEAK_CREDIBILITY))
        .map(|e| format!("evidence {} has weak source credibility", e.evidence_id))
        .collect();
    if claim.evidence.len() < 2 {
        out.push(format!("claim {} rests on a single source", claim.claim_id));
    }
    out
}

fn prior(context: &PromptContext, role: AgentRole, fallback: f64) -> f64 {
    context
        .message_from(role)
        .map(|m| m.confidence)
        .unwrap_or(fallback)
}

#[async_trait]
impl DebateAgent for HeuristicAgent {
    async fn invoke(
        &self,
        role: AgentRole,
        context: &PromptContext,
    ) -> Result<DebateMessage, AgentError> {
        let claim = context
            .claims
            .first()
            .ok_or_else(|| AgentError::Malformed("prompt carries no claim".into()))?;
        let round = context.round_number;
        let base = (0.5 * claim.confidence + 0.5 * mean_composite(claim)).clamp(0.0, 1.0);

        let message = match role {
            AgentRole::Strategist => {
                let cited = claim.evidence.iter().map(|e| e.evidence_id.clone());
                DebateMessage::new(
                    role,
                    round,
                    &format!(
                        "{} Supported by {} evidence item(s).",
                        claim.text,
                        claim.evidence.len()
                    ),
                    base,
                )
                .with_evidence_refs(cited)
            }
            AgentRole::Critic => {
                let challenges = challenges_for(claim);
                let strategist = prior(context, AgentRole::Strategist, base);
                let confidence =
                    (strategist - CHALLENGE_COST * challenges.len() as f64).clamp(0.0, 1.0);
                let content = if challenges.is_empty() {
                    "Methodology and sources hold up.".to_string()
                } else {
                    format!("{} concern(s) with the evidence base.", challenges.len())
                };
                let m = challenges.iter().fold(
                    DebateMessage::new(role, round, &content, confidence),
                    |m, c| m.with_challenge(c),
                );
                if claim.evidence.len() < 2 {
                    m.with_alternative(
                        &claim.claim_id,
                        "The single source reflects conditions specific to its own sample.",
                    )
                } else {
                    m
                }
            }
            AgentRole::Adversary => {
                let critic = prior(context, AgentRole::Critic, base);
                DebateMessage::new(
                    role,
                    round,
                    "In a downturn or disruption scenario the claim weakens; the core direction survives.",
                    (critic - WORST_CASE_DISCOUNT).clamp(0.0, 1.0),
                )
            }
            AgentRole::Moderator => {
                let spoken: Vec<f64> = context.round_messages.iter().map(|m| m.confidence).collect();
                let mean = if spoken.is_empty() {
                    base
                } else {
                    spoken.iter().sum::<f64>() / spoken.len() as f64
                };
                let recovery = ROUND_RECOVERY * round.saturating_sub(1) as f64;
                let confidence = (mean + recovery).clamp(0.0, 1.0);
                let low = (confidence - 0.1).max(0.0);
                let text = format!(
                    "{} (estimated confidence {:.0}-{:.0}%; limitations noted by the critic)",
                    claim.text.trim_end_matches('.'),
                    low * 100.0,
                    confidence * 100.0
                );
                let mut m = DebateMessage::new(
                    role,
                    round,
                    &format!(
                        "Claim {} holds with confidence {:.2}; main limitation is evidence depth.",
                        claim.claim_id, confidence
                    ),
                    confidence,
                );
                if !claim.text.contains("estimated confidence") {
                    m = m.with_revision(&claim.claim_id, &text, confidence);
                }
                for e in claim
                    .evidence
                    .iter()
                    .filter(|e| e.credibility.is_some_and(|c| c < UNRELIABLE_CREDIBILITY))
                {
                    m = m.with_flag(
                        &claim.claim_id,
                        FlagCategory::Accuracy,
                        &format!("evidence {} comes from an unreliable source", e.evidence_id),
                    );
                }
                m
            }
        };
        Ok(message)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim_validation::debate::EvidenceBrief;
    use claim_validation::EvidenceDomain;

    fn brief(credibilities: &[f64]) -> ClaimBrief {
        ClaimBrief {
            claim_id: "c1".into(),
            text: "Demand doubles by 2028.".into(),
            confidence: 0.7,
            evidence: credibilities
                .iter()
                .enumerate()
                .map(|(i, c)| EvidenceBrief {
                    evidence_id: format!("e{i}"),
                    excerpt: String::new(),
                    domain: EvidenceDomain::MarketResearch,
                    source_url: String::new(),
                    grade: None,
                    composite_score: Some(0.8),
                    credibility: Some(*c),
                })
                .collect(),
        }
    }

    fn context(claim: ClaimBrief, round: u32) -> PromptContext {
        PromptContext {
            claim_set_id: "set-1".into(),
            role: AgentRole::Strategist,
            round_number: round,
            max_rounds: 3,
            consensus_threshold: 0.8,
            prompt_version: "test".into(),
            claims: vec![claim],
            round_messages: vec![],
            previous_rounds: vec![],
            verification_notes: vec![],
        }
    }

    async fn run_round(ctx: &mut PromptContext) -> Vec<DebateMessage> {
        let agent = HeuristicAgent::new();
        for role in AgentRole::ORDER {
            let m = agent.invoke(role, ctx).await.unwrap();
            ctx.round_messages.push(m);
        }
        std::mem::take(&mut ctx.round_messages)
    }

    #[tokio::test]
    async fn test_strong_evidence_round() {
        let mut ctx = context(brief(&[0.9, 0.85]), 1);
        let messages = run_round(&mut ctx).await;
        assert!((messages[0].confidence - 0.75).abs() < 1e-9);
        assert_eq!(messages[0].evidence_refs.len(), 2);
        assert!(messages[1].challenges_raised.is_empty());
        assert!(messages[1].alternatives.is_empty());
        let moderator = &messages[3];
        assert_eq!(moderator.revisions.len(), 1);
        assert!(moderator.flags.is_empty());
        assert!(moderator.content.contains("limitation"));
    }

    #[tokio::test]
    async fn test_weak_evidence_is_challenged_and_flagged() {
        let mut ctx = context(brief(&[0.2]), 1);
        let messages = run_round(&mut ctx).await;
        assert_eq!(messages[1].challenges_raised.len(), 2);
        assert_eq!(messages[1].alternatives.len(), 1);
        assert_eq!(messages[1].alternatives[0].claim_id, "c1");
        assert!(messages[1].confidence < messages[0].confidence);
        assert!(messages[2].confidence < messages[1].confidence);
        assert_eq!(messages[3].flags[0].category, FlagCategory::Accuracy);
    }

    #[tokio::test]
    async fn test_later_rounds_recover_confidence() {
        let mut first = context(brief(&[0.9, 0.85]), 1);
        let mut third = context(brief(&[0.9, 0.85]), 3);
        let a = run_round(&mut first).await;
        let b = run_round(&mut third).await;
        assert!(b[3].confidence > a[3].confidence);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_malformed() {
        let mut ctx = context(brief(&[]), 1);
        ctx.claims.clear();
        let err = HeuristicAgent::new()
            .invoke(AgentRole::Strategist, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Malformed(_)));
    }
}
