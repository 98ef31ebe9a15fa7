//! The validation engine: one claim set in, one report out.
//!
//! ```text
//! ValidationRequest
//!   ├─ structural checks ── malformed claims ─────────────▶ rejected
//!   ├─ score evidence (JoinSet, parallel)
//!   ├─ chain-of-verification ── amendments ──┐
//!   ├─ debate per claim (JoinSet + Semaphore) ◀┘
//!   │     AgentUnavailable ── cancel siblings ─▶ Err(AgentConnectivityLost + partial)
//!   │     caller cancel ────────────────────────▶ Err(Cancelled + partial)
//!   ├─ competing hypotheses per debated claim (advisory)
//!   ├─ stress-test approved claims
//!   ├─ seal verdict
//!   └─ anomaly checks (advisory)
//!                                                  ──▶ ValidationReport
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::anomaly::{AnomalyChecker, ScoringAnomaly};
use crate::config::EngineConfig;
use crate::consensus::{
    ConfidenceAggregator, ConsensusValidator, ConstitutionalCompliance, Verdict, VerdictBuilder,
};
use crate::debate::{
    max_rounds_for, AgentInvoker, ClaimDebate, ClaimSetSequencer, DebateError, DebateOrchestrator,
    DebatePhase, DebateRound, SharedAgent,
};
use crate::error::{EngineError, EngineResult, MalformedClaimError};
use crate::events::{EngineEvent, EventBus, SharedEventBus};
use crate::hypotheses::{CompetingHypotheses, HypothesisMatrix};
use crate::model::{Claim, Evidence};
use crate::scoring::{
    EvidenceScorer, QualityAssessment, ScoringContext, SharedReputation, TopicStability,
    WeightConfig,
};
use crate::stress::StressTester;
use crate::verification::{ChainOfVerification, VerificationResult};
use crate::weighting::{adapt_weights, DecisionContext};

/// A claim set and the context it is validated in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub claim_set_id: String,
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub context: DecisionContext,
    #[serde(default)]
    pub strategic_question: Option<String>,
    #[serde(default)]
    pub topic_keywords: Vec<String>,
    /// Evidence outside the claim set used only for corroboration.
    #[serde(default)]
    pub related_evidence: Vec<Evidence>,
    #[serde(default)]
    pub region: Option<String>,
    /// "Today" for recency; defaults to the current UTC date.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
    #[serde(default)]
    pub topic_stability: TopicStability,
}

impl ValidationRequest {
    pub fn new(claim_set_id: &str, claims: Vec<Claim>) -> Self {
        Self {
            claim_set_id: claim_set_id.to_string(),
            claims,
            context: DecisionContext::default(),
            strategic_question: None,
            topic_keywords: Vec::new(),
            related_evidence: Vec::new(),
            region: None,
            reference_date: None,
            topic_stability: TopicStability::default(),
        }
    }

    pub fn with_context(mut self, context: DecisionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_question(mut self, question: &str) -> Self {
        self.strategic_question = Some(question.to_string());
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.topic_keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_related(mut self, related: Vec<Evidence>) -> Self {
        self.related_evidence = related;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn check_claim_set_id(&self) -> EngineResult<()> {
        if self.claim_set_id.trim().is_empty() {
            return Err(EngineError::InvalidRequest("claim_set_id is empty".into()));
        }
        Ok(())
    }

    /// Split the claims into debate candidates and claims rejected up front.
    ///
    /// Assessments are keyed by evidence id, so an evidence id may belong to
    /// one claim only: the first claim (in request order) to cite it keeps it
    /// and later citers are rejected. Claims sharing an id are all rejected.
    fn screen_claims(&self) -> (Vec<Claim>, Vec<(Claim, MalformedClaimError)>) {
        let mut id_counts: HashMap<&str, usize> = HashMap::new();
        for claim in &self.claims {
            *id_counts.entry(claim.id.trim()).or_default() += 1;
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        for claim in &self.claims {
            if let Err(e) = claim.check_well_formed() {
                rejected.push((claim.clone(), e));
                continue;
            }
            if id_counts.get(claim.id.trim()).copied().unwrap_or(0) > 1 {
                rejected.push((
                    claim.clone(),
                    MalformedClaimError::DuplicateId {
                        claim_id: claim.id.clone(),
                    },
                ));
                continue;
            }
            let mut seen = HashSet::new();
            let collision = claim.evidence_ids().find_map(|id| {
                if !seen.insert(id) {
                    return Some((id.to_string(), claim.id.clone()));
                }
                owners
                    .get(id)
                    .map(|owner| (id.to_string(), owner.clone()))
            });
            if let Some((evidence_id, owner)) = collision {
                rejected.push((
                    claim.clone(),
                    MalformedClaimError::EvidenceCollision {
                        claim_id: claim.id.clone(),
                        evidence_id,
                        owner,
                    },
                ));
                continue;
            }
            for id in claim.evidence_ids() {
                owners.insert(id.to_string(), claim.id.clone());
            }
            accepted.push(claim.clone());
        }
        (accepted, rejected)
    }

    /// Scoring context for the evidence of `claim`: corroboration runs
    /// against its siblings plus the request-level related evidence.
    fn scoring_context(&self, claim: &Claim, reference_date: NaiveDate) -> ScoringContext {
        let keywords: Vec<&str> = self.topic_keywords.iter().map(String::as_str).collect();
        let mut related = self.related_evidence.clone();
        related.extend(claim.evidence.iter().cloned());
        let mut ctx = ScoringContext::new(reference_date)
            .with_keywords(&keywords)
            .with_decision(self.context)
            .with_related(related)
            .with_stability(self.topic_stability);
        if let Some(q) = &self.strategic_question {
            ctx = ctx.with_question(q);
        }
        if let Some(r) = &self.region {
            ctx = ctx.with_region(r);
        }
        ctx
    }
}

/// A claim rejected before scoring because it is structurally invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedClaim {
    pub claim_id: String,
    pub reason: String,
}

/// Results for claims that finished before a run was aborted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialResults {
    pub claim_set_id: String,
    pub assessments: Vec<QualityAssessment>,
    /// Debates that reached a terminal phase other than `Aborted`.
    pub completed: Vec<ClaimDebate>,
}

/// Output of a validation run, keyed by the claim-set id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub claim_set_id: String,
    pub verdict: Verdict,
    /// One debate per well-formed claim, in request order.
    pub debates: Vec<ClaimDebate>,
    /// Every assessment, in request order.
    pub assessments: Vec<QualityAssessment>,
    /// Evidence scored from recency and relevance only.
    pub insufficient_data: Vec<String>,
    pub malformed_claims: Vec<MalformedClaim>,
    pub verification: VerificationResult,
    /// One matrix per debated claim.
    #[serde(default)]
    pub hypotheses: Vec<HypothesisMatrix>,
    pub anomalies: Vec<ScoringAnomaly>,
    pub consensus_threshold: f64,
    /// Scoring weights after context adaptation.
    pub weights: WeightConfig,
    pub max_rounds: u32,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ValidationReport {
    pub fn debate(&self, claim_id: &str) -> Option<&ClaimDebate> {
        self.debates.iter().find(|d| d.claim.id == claim_id)
    }

    pub fn assessment(&self, evidence_id: &str) -> Option<&QualityAssessment> {
        self.assessments.iter().find(|a| a.evidence_id == evidence_id)
    }

    pub fn hypotheses_for(&self, claim_id: &str) -> Option<&HypothesisMatrix> {
        self.hypotheses.iter().find(|m| m.claim_id == claim_id)
    }

    /// Full round history across claims.
    pub fn rounds(&self) -> impl Iterator<Item = &DebateRound> {
        self.debates.iter().flat_map(|d| d.rounds().iter())
    }

    pub fn total_rounds(&self) -> usize {
        self.debates.iter().map(|d| d.rounds().len()).sum()
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "{} | set={} | {} claims, {} rounds, {} anomalies, {}ms",
            self.verdict.summary_line(),
            self.claim_set_id,
            self.debates.len() + self.malformed_claims.len(),
            self.total_rounds(),
            self.anomalies.len(),
            self.duration_ms
        )
    }
}

/// Validates claim sets against a debate agent.
///
/// Cheap to clone; runs for different claim sets may proceed concurrently.
/// A second run for a claim set already in progress waits for the first.
#[derive(Clone)]
pub struct ValidationEngine {
    config: Arc<EngineConfig>,
    agent: SharedAgent,
    scorer: EvidenceScorer,
    events: SharedEventBus,
    sequencer: Arc<ClaimSetSequencer>,
}

impl ValidationEngine {
    pub fn new(config: EngineConfig, agent: SharedAgent) -> EngineResult<Self> {
        config.validate()?;
        let scorer = EvidenceScorer::new(config.scoring.clone());
        Ok(Self {
            config: Arc::new(config),
            agent,
            scorer,
            events: EventBus::new().shared(),
            sequencer: Arc::new(ClaimSetSequencer::new()),
        })
    }

    /// Replace the source reputation lookup.
    pub fn with_reputation(mut self, reputation: SharedReputation) -> Self {
        self.scorer = EvidenceScorer::with_reputation(self.config.scoring.clone(), reputation);
        self
    }

    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> SharedEventBus {
        self.events.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn validate(&self, request: ValidationRequest) -> EngineResult<ValidationReport> {
        self.validate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Validate `request`, stopping early when `cancel` fires.
    pub async fn validate_with_cancel(
        &self,
        request: ValidationRequest,
        cancel: CancellationToken,
    ) -> EngineResult<ValidationReport> {
        request.check_claim_set_id()?;
        let claim_set_id = request.claim_set_id.clone();
        let _guard = self.sequencer.acquire(&claim_set_id).await;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let config = &self.config;
        info!(claim_set = %claim_set_id, %run_id, claims = request.claims.len(), "validation started");
        self.events.publish(EngineEvent::ClaimSetStarted {
            claim_set_id: claim_set_id.clone(),
            claims: request.claims.len(),
            timestamp: Utc::now(),
        });

        // Structural checks
        let (claims, rejected) = request.screen_claims();
        let mut malformed_claims = Vec::with_capacity(rejected.len());
        for (claim, e) in rejected {
            warn!(claim_set = %claim_set_id, claim = %claim.id, error = %e, "malformed claim rejected");
            self.events.publish(EngineEvent::ClaimRejected {
                claim_set_id: claim_set_id.clone(),
                claim_id: claim.id.clone(),
                reason: e.to_string(),
                timestamp: Utc::now(),
            });
            malformed_claims.push(MalformedClaim {
                claim_id: claim.id,
                reason: e.to_string(),
            });
        }

        // Scoring
        let weights = adapt_weights(&config.scoring.weights, &request.context);
        let scorer = self.scorer.with_weights(weights);
        let reference_date = request
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut items = Vec::new();
        let mut owner: HashMap<String, String> = HashMap::new();
        for claim in &claims {
            let ctx = Arc::new(request.scoring_context(claim, reference_date));
            for evidence in &claim.evidence {
                owner.insert(evidence.id.clone(), claim.id.clone());
                items.push((evidence.clone(), ctx.clone()));
            }
        }
        let mut assessment_list = Vec::with_capacity(items.len());
        let mut insufficient_data = Vec::new();
        for outcome in scorer.score_all(items).await {
            let assessment = match outcome {
                Ok(a) => a,
                Err(e) => {
                    warn!(claim_set = %claim_set_id, evidence = %e.evidence_id, "insufficient source metadata, degraded assessment");
                    insufficient_data.push(e.evidence_id.clone());
                    *e.assessment
                }
            };
            self.events.publish(EngineEvent::EvidenceScored {
                claim_set_id: claim_set_id.clone(),
                claim_id: owner.get(&assessment.evidence_id).cloned().unwrap_or_default(),
                evidence_id: assessment.evidence_id.clone(),
                grade: assessment.quality_grade,
                composite_score: assessment.composite_score,
                insufficient_data: assessment.insufficient_data,
                timestamp: Utc::now(),
            });
            assessment_list.push(assessment);
        }
        let assessments: Arc<HashMap<String, QualityAssessment>> = Arc::new(
            assessment_list
                .iter()
                .map(|a| (a.evidence_id.clone(), a.clone()))
                .collect(),
        );

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled {
                claim_set_id: claim_set_id.clone(),
                partial: Box::new(PartialResults {
                    claim_set_id,
                    assessments: assessment_list,
                    completed: Vec::new(),
                }),
            });
        }

        // Verification
        let verification = ChainOfVerification::new(config.verification.clone())
            .verify(&claims, &assessments);

        // Debate
        let threshold = config.aggregation.threshold_for(&request.context);
        let max_rounds = max_rounds_for(
            claims.len(),
            config.debate.base_rounds,
            config.debate.max_rounds_ceiling,
        );
        let run_cancel = cancel.child_token();
        let invoker = AgentInvoker::new(
            self.agent.clone(),
            config.debate.agent_timeout(),
            config.debate.max_call_retries,
        )
        .with_cancellation(run_cancel.clone())
        .with_events(self.events.clone());
        let validator = ConsensusValidator::new(threshold, config.aggregation.evidence_floor)
            .with_aggregator(ConfidenceAggregator::new(config.aggregation.role_weights));
        let orchestrator = Arc::new(
            DebateOrchestrator::new(&claim_set_id, invoker, validator, max_rounds, &config.debate)
                .with_events(self.events.clone()),
        );

        let sem = Arc::new(Semaphore::new(config.debate.max_parallel_claims));
        let mut join_set: JoinSet<(usize, String, Result<ClaimDebate, DebateError>)> =
            JoinSet::new();
        for (index, claim) in claims.iter().enumerate() {
            let sem = sem.clone();
            let orchestrator = orchestrator.clone();
            let assessments = assessments.clone();
            let notes = verification.notes_for(&claim.id);
            let claim = claim.clone();
            let run_cancel = run_cancel.clone();
            join_set.spawn(async move {
                let claim_id = claim.id.clone();
                let _permit = tokio::select! {
                    biased;
                    _ = run_cancel.cancelled() => return (index, claim_id, Err(DebateError::Cancelled)),
                    permit = sem.acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => return (index, claim_id, Err(DebateError::Cancelled)),
                    },
                };
                let result = orchestrator.debate_claim(claim, &assessments, &notes).await;
                (index, claim_id, result)
            });
        }

        let mut slots: Vec<Option<ClaimDebate>> = (0..claims.len()).map(|_| None).collect();
        let mut connectivity_lost: Option<String> = None;
        let mut invariant: Option<String> = None;
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((index, _, Ok(debate))) => slots[index] = Some(debate),
                Ok((_, claim_id, Err(DebateError::AgentUnavailable(reason)))) => {
                    if connectivity_lost.is_none() {
                        error!(claim_set = %claim_set_id, claim = %claim_id, reason = %reason, "agent connectivity lost, aborting run");
                        run_cancel.cancel();
                        connectivity_lost = Some(reason);
                    }
                }
                Ok((_, claim_id, Err(DebateError::Cancelled))) => {
                    info!(claim_set = %claim_set_id, claim = %claim_id, "claim debate aborted");
                }
                Ok((_, claim_id, Err(e))) => {
                    error!(claim_set = %claim_set_id, claim = %claim_id, error = %e, "debate failed");
                    invariant.get_or_insert_with(|| format!("claim {claim_id}: {e}"));
                }
                Err(e) => {
                    warn!(claim_set = %claim_set_id, error = %e, "debate task panicked");
                    invariant.get_or_insert_with(|| format!("debate task panicked: {e}"));
                }
            }
        }
        let debates: Vec<ClaimDebate> = slots.into_iter().flatten().collect();

        if let Some(reason) = connectivity_lost {
            return Err(EngineError::AgentConnectivityLost {
                reason,
                partial: Box::new(partial(&claim_set_id, assessment_list, debates)),
            });
        }
        if cancel.is_cancelled() {
            warn!(claim_set = %claim_set_id, completed = debates.len(), "validation cancelled");
            return Err(EngineError::Cancelled {
                claim_set_id: claim_set_id.clone(),
                partial: Box::new(partial(&claim_set_id, assessment_list, debates)),
            });
        }
        if let Some(reason) = invariant {
            return Err(EngineError::Invariant(reason));
        }

        // Verdict
        let resilience = StressTester::new(config.stress.clone()).run(&debates);
        let hypotheses =
            CompetingHypotheses::new(config.hypotheses.clone()).run(&debates, &assessments);
        let mut compliance =
            ConstitutionalCompliance::assess(&debates, &assessments, verification.passed());
        for matrix in hypotheses.iter().filter(|m| m.claim_outscored()) {
            if debates
                .iter()
                .any(|d| d.claim.id == matrix.claim_id && d.is_approved())
            {
                warn!(
                    claim = %matrix.claim_id,
                    leading = %matrix.leading,
                    "approved claim outscored by a competing hypothesis"
                );
                compliance.warnings.push(format!(
                    "approved claim {} is outscored by competing hypothesis {}",
                    matrix.claim_id, matrix.leading
                ));
            }
        }
        let mut builder = VerdictBuilder::new();
        for m in &malformed_claims {
            if !m.claim_id.trim().is_empty() {
                builder.reject(&m.claim_id);
            }
        }
        for debate in &debates {
            builder.record(debate);
        }
        builder.compliance(compliance).resilience(resilience);
        let verdict = builder
            .seal()
            .map_err(|e| EngineError::Invariant(e.to_string()))?;

        let anomalies = AnomalyChecker::new().validate(&verdict, &assessment_list);
        let duration_ms = start.elapsed().as_millis() as u64;

        self.events.publish(EngineEvent::ClaimSetCompleted {
            claim_set_id: claim_set_id.clone(),
            consensus_reached: verdict.consensus_reached,
            approved: verdict.approved_claim_ids.len(),
            rejected: verdict.rejected_claim_ids.len(),
            duration_ms,
            timestamp: Utc::now(),
        });

        let report = ValidationReport {
            run_id,
            claim_set_id,
            verdict,
            debates,
            assessments: assessment_list,
            insufficient_data,
            malformed_claims,
            verification,
            hypotheses,
            anomalies,
            consensus_threshold: threshold,
            weights,
            max_rounds,
            started_at,
            duration_ms,
        };
        info!(%run_id, "{}", report.summary_line());
        Ok(report)
    }
}

fn partial(
    claim_set_id: &str,
    assessments: Vec<QualityAssessment>,
    debates: Vec<ClaimDebate>,
) -> PartialResults {
    PartialResults {
        claim_set_id: claim_set_id.to_string(),
        assessments,
        completed: debates
            .into_iter()
            .filter(|d| d.phase().is_terminal() && d.phase() != DebatePhase::Aborted)
            .collect(),
    }
}
