//! Evidence quality scoring.
//!
//! ```text
//! Evidence ─┬─ credibility  (source metadata × reputation lookup)
//!           ├─ relevance    (question, keywords, decision context)
//!           ├─ recency      (domain half-life, stability, update frequency)
//!           ├─ completeness (depth markers, breadth, missing items)
//!           └─ consistency  (coherence, corroboration, contradictions)
//!                  │
//!                  ▼
//!     Σ(dimension × weight) ── penalties ── grade ──▶ QualityAssessment
//! ```
//!
//! Every dimension is a pure function of the evidence and an immutable
//! [`ScoringContext`]. The scorer holds no mutable state, so identical input
//! always yields an identical assessment.

pub mod assessment;
pub mod completeness;
pub mod consistency;
pub mod credibility;
pub mod grade;
pub mod recency;
pub mod relevance;
pub mod reputation;
pub mod text;
pub mod weights;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub use assessment::{AppliedPenalty, DimensionScores, PenaltyReason, QualityAssessment};
pub use grade::{CredibilityTier, QualityGrade};
pub use recency::TopicStability;
pub use reputation::{SharedReputation, SourceReputation, StaticReputationTable};
pub use weights::{QualityDimension, WeightConfig};

use crate::error::{ConfigError, InsufficientDataError};
use crate::model::Evidence;
use crate::weighting::DecisionContext;

/// Number of signals counted toward assessment confidence.
const CONFIDENCE_SIGNALS: f64 = 6.0;

/// Immutable scoring parameters. Passed by value; never global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfiguration {
    pub weights: WeightConfig,
    /// Credibility below this applies `low_credibility_penalty`.
    pub credibility_floor: f64,
    /// Relevance below this applies `low_relevance_penalty`.
    pub relevance_floor: f64,
    pub low_credibility_penalty: f64,
    pub low_relevance_penalty: f64,
    pub contradiction_penalty: f64,
    /// Upper bound on consistency once a contradiction is detected.
    pub contradiction_cap: f64,
    /// Jaccard similarity at which two items count as the same topic.
    pub topic_overlap: f64,
    pub missing_information_penalty: f64,
    pub missing_information_cap: f64,
    /// Fraction of recency retained after one half-life.
    pub recency_decay_base: f64,
    pub undated_recency: f64,
    pub insufficient_data_confidence_cap: f64,
    /// Extra reputation entries layered over the built-in table.
    pub reputation: StaticReputationTable,
}

impl Default for ScoringConfiguration {
    fn default() -> Self {
        Self {
            weights: WeightConfig::default(),
            credibility_floor: 0.6,
            relevance_floor: 0.7,
            low_credibility_penalty: 0.7,
            low_relevance_penalty: 0.8,
            contradiction_penalty: 0.8,
            contradiction_cap: 0.4,
            topic_overlap: 0.2,
            missing_information_penalty: 0.1,
            missing_information_cap: 0.5,
            recency_decay_base: 0.5,
            undated_recency: 0.5,
            insufficient_data_confidence_cap: 0.5,
            reputation: StaticReputationTable::default(),
        }
    }
}

fn unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field: name, value })
    }
}

impl ScoringConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.weights.is_normalized() {
            return Err(ConfigError::WeightsNotNormalized {
                sum: self.weights.sum(),
            });
        }
        unit("scoring.credibility_floor", self.credibility_floor)?;
        unit("scoring.relevance_floor", self.relevance_floor)?;
        unit("scoring.low_credibility_penalty", self.low_credibility_penalty)?;
        unit("scoring.low_relevance_penalty", self.low_relevance_penalty)?;
        unit("scoring.contradiction_penalty", self.contradiction_penalty)?;
        unit("scoring.contradiction_cap", self.contradiction_cap)?;
        unit("scoring.topic_overlap", self.topic_overlap)?;
        unit("scoring.missing_information_penalty", self.missing_information_penalty)?;
        unit("scoring.missing_information_cap", self.missing_information_cap)?;
        unit("scoring.undated_recency", self.undated_recency)?;
        unit(
            "scoring.insufficient_data_confidence_cap",
            self.insufficient_data_confidence_cap,
        )?;
        if !(self.recency_decay_base > 0.0 && self.recency_decay_base < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "scoring.recency_decay_base",
                value: self.recency_decay_base,
            });
        }
        Ok(())
    }
}

/// Everything a dimension may read besides the evidence itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    pub strategic_question: Option<String>,
    pub topic_keywords: Vec<String>,
    pub decision: DecisionContext,
    /// Evidence to corroborate against. May include the item being scored.
    pub related_evidence: Vec<Evidence>,
    /// "Today" for recency and temporal fit.
    pub reference_date: NaiveDate,
    pub region: Option<String>,
    pub topic_stability: TopicStability,
}

impl ScoringContext {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            strategic_question: None,
            topic_keywords: Vec::new(),
            decision: DecisionContext::default(),
            related_evidence: Vec::new(),
            reference_date,
            region: None,
            topic_stability: TopicStability::default(),
        }
    }

    pub fn with_question(mut self, question: &str) -> Self {
        self.strategic_question = Some(question.to_string());
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.topic_keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_decision(mut self, decision: DecisionContext) -> Self {
        self.decision = decision;
        self
    }

    pub fn with_related(mut self, related: Vec<Evidence>) -> Self {
        self.related_evidence = related;
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_stability(mut self, stability: TopicStability) -> Self {
        self.topic_stability = stability;
        self
    }

    pub fn question_tokens(&self) -> BTreeSet<String> {
        self.strategic_question
            .as_deref()
            .map(text::tokens)
            .unwrap_or_default()
    }

    pub fn keyword_tokens(&self) -> BTreeSet<String> {
        self.topic_keywords
            .iter()
            .flat_map(|k| text::tokens(k))
            .collect()
    }

    /// Related evidence other than `evidence_id`.
    pub fn related_excluding<'a>(
        &'a self,
        evidence_id: &'a str,
    ) -> impl Iterator<Item = &'a Evidence> + 'a {
        self.related_evidence
            .iter()
            .filter(move |e| e.id != evidence_id)
    }
}

/// Composite score after penalties, with the grade it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub raw: f64,
    pub score: f64,
    pub grade: QualityGrade,
    pub penalties: Vec<AppliedPenalty>,
}

/// Combine dimension scores into a graded composite.
///
/// Penalties multiply: low credibility, low relevance, and a detected
/// contradiction each apply their own factor before grade mapping.
pub fn compose(
    scores: &DimensionScores,
    weights: &WeightConfig,
    contradiction: bool,
    config: &ScoringConfiguration,
) -> Composite {
    let raw = scores.weighted_sum(weights).clamp(0.0, 1.0);
    penalize(raw, scores, contradiction, config)
}

fn penalize(
    raw: f64,
    scores: &DimensionScores,
    contradiction: bool,
    config: &ScoringConfiguration,
) -> Composite {
    let mut penalties = Vec::new();
    if scores.credibility < config.credibility_floor {
        penalties.push(AppliedPenalty {
            reason: PenaltyReason::LowCredibility,
            factor: config.low_credibility_penalty,
        });
    }
    if scores.relevance < config.relevance_floor {
        penalties.push(AppliedPenalty {
            reason: PenaltyReason::LowRelevance,
            factor: config.low_relevance_penalty,
        });
    }
    if contradiction {
        penalties.push(AppliedPenalty {
            reason: PenaltyReason::Contradiction,
            factor: config.contradiction_penalty,
        });
    }
    let score = penalties
        .iter()
        .fold(raw, |acc, p| acc * p.factor)
        .clamp(0.0, 1.0);
    Composite {
        raw,
        score,
        grade: QualityGrade::from_score(score),
        penalties,
    }
}

/// Stateless evidence scorer.
#[derive(Clone)]
pub struct EvidenceScorer {
    config: ScoringConfiguration,
    reputation: SharedReputation,
}

impl std::fmt::Debug for EvidenceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceScorer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EvidenceScorer {
    /// Scorer backed by the built-in reputation table plus `config.reputation`.
    pub fn new(config: ScoringConfiguration) -> Self {
        let table = StaticReputationTable::with_defaults().merged(&config.reputation);
        Self {
            config,
            reputation: Arc::new(table),
        }
    }

    pub fn with_reputation(config: ScoringConfiguration, reputation: SharedReputation) -> Self {
        Self { config, reputation }
    }

    /// Copy of this scorer using `weights` (e.g. context-adapted ones).
    pub fn with_weights(&self, weights: WeightConfig) -> Self {
        let mut config = self.config.clone();
        config.weights = weights;
        Self {
            config,
            reputation: self.reputation.clone(),
        }
    }

    pub fn config(&self) -> &ScoringConfiguration {
        &self.config
    }

    /// Score one evidence item.
    ///
    /// Fails with [`InsufficientDataError`] when the source has no author,
    /// institution, or publication. The error carries the degraded assessment
    /// built from recency and relevance only.
    pub fn try_score(
        &self,
        evidence: &Evidence,
        ctx: &ScoringContext,
    ) -> Result<QualityAssessment, InsufficientDataError> {
        let cfg = &self.config;
        let relevance = relevance::score(evidence, ctx);
        let recency = recency::score(evidence, ctx, cfg.recency_decay_base, cfg.undated_recency);

        let metadata = match evidence.source_metadata.as_ref() {
            Some(m) if m.has_identity() => m,
            _ => {
                return Err(InsufficientDataError {
                    evidence_id: evidence.id.clone(),
                    assessment: Box::new(self.degraded(evidence, ctx, relevance.score, recency)),
                });
            }
        };

        let credibility = credibility::score(metadata, self.reputation.as_ref());
        let completeness = completeness::score(
            evidence,
            ctx,
            cfg.missing_information_penalty,
            cfg.missing_information_cap,
        );
        let consistency =
            consistency::score(evidence, ctx, cfg.topic_overlap, cfg.contradiction_cap);

        let scores = DimensionScores {
            credibility: credibility.score,
            relevance: relevance.score,
            recency: recency.score,
            completeness: completeness.score,
            consistency: consistency.score,
        };
        let contradiction = consistency.contradiction_detected();
        let composite = compose(&scores, &cfg.weights, contradiction, cfg);

        let mut notes = vec![
            format!(
                "credibility {} ({:.2}; peer_reviewed={}, citations={:.2}, conflicts={})",
                CredibilityTier::from_score(credibility.score),
                credibility.score,
                metadata.peer_reviewed,
                credibility.citations,
                metadata.conflicts_of_interest.len()
            ),
            format!(
                "relevance {:.2} (topic={:.2}, question={:.2}, context={:.2})",
                relevance.score,
                relevance.topic_alignment,
                relevance.question_similarity,
                relevance.decision_fit
            ),
            recency_note(&recency),
            format!(
                "completeness {:.2} (depth={:.2}, breadth={:.2}, missing={})",
                completeness.score,
                completeness.depth,
                completeness.breadth,
                evidence.missing_information.len()
            ),
            format!(
                "consistency {:.2} ({} related on topic)",
                consistency.score, consistency.related_on_topic
            ),
        ];
        if contradiction {
            notes.push(format!(
                "contradicted by {}",
                consistency.contradicted_by.join(", ")
            ));
        }

        let confidence = self.signal_confidence(evidence, ctx);
        let assessment = build(evidence, &scores, composite, confidence, notes, contradiction, false);
        debug!(evidence = %evidence.id, grade = %assessment.quality_grade, composite = assessment.composite_score, "evidence scored");
        Ok(assessment)
    }

    /// Score one evidence item, recovering locally from missing metadata.
    pub fn score(&self, evidence: &Evidence, ctx: &ScoringContext) -> QualityAssessment {
        match self.try_score(evidence, ctx) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(evidence = %e.evidence_id, "insufficient source metadata, degraded assessment");
                *e.assessment
            }
        }
    }

    /// Produce a new version of `previous` for the same evidence.
    pub fn rescore(
        &self,
        previous: &QualityAssessment,
        evidence: &Evidence,
        ctx: &ScoringContext,
    ) -> QualityAssessment {
        let mut next = self.score(evidence, ctx);
        next.version = previous.version + 1;
        next
    }

    /// Score many items concurrently. Output order matches input order.
    ///
    /// Each item carries its own context so callers can scope corroboration
    /// to the citing claim. A panicked task is logged and its item omitted.
    pub async fn score_all(
        &self,
        items: Vec<(Evidence, Arc<ScoringContext>)>,
    ) -> Vec<Result<QualityAssessment, InsufficientDataError>> {
        let mut join_set = JoinSet::new();
        let total = items.len();

        for (index, (evidence, ctx)) in items.into_iter().enumerate() {
            let scorer = self.clone();
            join_set.spawn(async move { (index, scorer.try_score(&evidence, &ctx)) });
        }

        let mut slots: Vec<Option<Result<QualityAssessment, InsufficientDataError>>> =
            (0..total).map(|_| None).collect();
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(error = %e, "scoring task panicked"),
            }
        }
        slots.into_iter().flatten().collect()
    }

    fn degraded(
        &self,
        evidence: &Evidence,
        ctx: &ScoringContext,
        relevance: f64,
        recency: recency::RecencyBreakdown,
    ) -> QualityAssessment {
        let cfg = &self.config;
        let scores = DimensionScores {
            credibility: 0.0,
            relevance,
            recency: recency.score,
            completeness: 0.0,
            consistency: 0.0,
        };
        let partial_weight = cfg.weights.relevance + cfg.weights.recency;
        let raw = if partial_weight > 0.0 {
            (cfg.weights.relevance * relevance + cfg.weights.recency * recency.score)
                / partial_weight
        } else {
            (relevance + recency.score) / 2.0
        };
        let composite = penalize(raw.clamp(0.0, 1.0), &scores, false, cfg);
        let confidence = self
            .signal_confidence(evidence, ctx)
            .min(cfg.insufficient_data_confidence_cap);
        let notes = vec![
            "insufficient source metadata: scored on recency and relevance only".to_string(),
            format!("relevance {:.2}", relevance),
            recency_note(&recency),
        ];
        build(evidence, &scores, composite, confidence, notes, false, true)
    }

    /// `0.3 + 0.7 × (available signals / 6)`.
    fn signal_confidence(&self, evidence: &Evidence, ctx: &ScoringContext) -> f64 {
        let meta = evidence.source_metadata.as_ref();
        let present = |f: Option<&String>| f.is_some_and(|v| !v.trim().is_empty());
        let signals = [
            present(meta.and_then(|m| m.author.as_ref())),
            present(meta.and_then(|m| m.institution.as_ref())),
            present(meta.and_then(|m| m.publication.as_ref())),
            evidence.effective_date().is_some(),
            ctx.strategic_question.is_some(),
            ctx.related_excluding(&evidence.id).next().is_some(),
        ];
        let available = signals.iter().filter(|s| **s).count() as f64;
        0.3 + 0.7 * (available / CONFIDENCE_SIGNALS)
    }
}

fn recency_note(recency: &recency::RecencyBreakdown) -> String {
    match recency.age_days {
        Some(age) => format!(
            "recency {:.2} ({} days old, half-life {:.0} days)",
            recency.score, age, recency.half_life_days
        ),
        None => format!("recency {:.2} (undated)", recency.score),
    }
}

fn build(
    evidence: &Evidence,
    scores: &DimensionScores,
    composite: Composite,
    confidence: f64,
    mut notes: Vec<String>,
    contradiction: bool,
    insufficient_data: bool,
) -> QualityAssessment {
    for p in &composite.penalties {
        notes.push(format!("penalty {} ×{:.2}", p.reason, p.factor));
    }
    QualityAssessment {
        evidence_id: evidence.id.clone(),
        version: 1,
        credibility: scores.credibility,
        relevance: scores.relevance,
        recency: scores.recency,
        completeness: scores.completeness,
        consistency: scores.consistency,
        raw_composite: composite.raw,
        composite_score: composite.score,
        quality_grade: composite.grade,
        credibility_tier: CredibilityTier::from_score(scores.credibility),
        confidence: confidence.clamp(0.0, 1.0),
        explanation: notes.join("; "),
        penalties: composite.penalties,
        contradiction_detected: contradiction,
        insufficient_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EvidenceDomain, SourceMetadata};

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn strong_evidence() -> Evidence {
        Evidence::new(
            "e1",
            "Survey methodology: sample of 2,000 enterprises; cloud spending grew 21% in 2025 \
             with a 95% confidence interval of 18-24%. Limitation: excludes firms under 50 staff.",
            EvidenceDomain::MarketResearch,
        )
        .with_metadata(SourceMetadata {
            author: Some("A. Analyst".into()),
            institution: Some("Gartner".into()),
            publication: Some("Harvard Business Review".into()),
            peer_reviewed: true,
            citation_count: 80,
            funding_independent: true,
            conflicts_of_interest: vec![],
            update_frequency: None,
        })
        .published(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
    }

    fn ctx() -> ScoringContext {
        ScoringContext::new(reference())
            .with_question("How fast is enterprise cloud spending growing?")
            .with_keywords(&["cloud", "spending", "enterprises"])
    }

    #[test]
    fn test_compose_scenario_weights() {
        let scores = DimensionScores {
            credibility: 0.95,
            relevance: 0.9,
            recency: 0.9,
            completeness: 0.85,
            consistency: 0.9,
        };
        let c = compose(
            &scores,
            &WeightConfig::default(),
            false,
            &ScoringConfiguration::default(),
        );
        assert!((c.score - 0.9075).abs() < 1e-9);
        assert_eq!(c.grade, QualityGrade::A);
        assert!(c.penalties.is_empty());
    }

    #[test]
    fn test_penalties_stack_multiplicatively() {
        let scores = DimensionScores {
            credibility: 0.5,
            relevance: 0.6,
            recency: 1.0,
            completeness: 1.0,
            consistency: 1.0,
        };
        let c = compose(
            &scores,
            &WeightConfig::default(),
            true,
            &ScoringConfiguration::default(),
        );
        assert_eq!(c.penalties.len(), 3);
        assert!((c.score - c.raw * 0.7 * 0.8 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_try_score_is_deterministic() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let a = scorer.try_score(&strong_evidence(), &ctx()).unwrap();
        let b = scorer.try_score(&strong_evidence(), &ctx()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.version, 1);
        assert!(!a.insufficient_data);
    }

    #[test]
    fn test_strong_evidence_grades_well() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let a = scorer.score(&strong_evidence(), &ctx());
        assert!(a.credibility >= 0.75, "credibility {}", a.credibility);
        assert!(a.composite_score >= 0.6, "{}", a.summary_line());
        assert!(a.explanation.contains("credibility"));
    }

    #[test]
    fn test_missing_metadata_is_insufficient_data() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let mut ev = strong_evidence();
        ev.source_metadata = Some(SourceMetadata {
            peer_reviewed: true,
            ..Default::default()
        });
        let err = scorer.try_score(&ev, &ctx()).unwrap_err();
        assert_eq!(err.evidence_id, "e1");
        let a = *err.assessment;
        assert!(a.insufficient_data);
        assert!(a.confidence <= 0.5);
        assert_eq!(a.credibility, 0.0);
        assert_eq!(a.completeness, 0.0);
        assert!(a
            .penalties
            .iter()
            .any(|p| p.reason == PenaltyReason::LowCredibility));
    }

    #[test]
    fn test_score_recovers_from_insufficient_data() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let mut ev = strong_evidence();
        ev.source_metadata = None;
        let a = scorer.score(&ev, &ctx());
        assert!(a.insufficient_data);
        assert!(a.explanation.starts_with("insufficient source metadata"));
    }

    #[test]
    fn test_rescore_bumps_version() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let first = scorer.score(&strong_evidence(), &ctx());
        let second = scorer.rescore(&first, &strong_evidence(), &ctx());
        assert_eq!(second.version, 2);
        assert_eq!(first.version, 1);
        assert_eq!(second.composite_score, first.composite_score);
    }

    #[test]
    fn test_confidence_counts_signals() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let a = scorer.score(&strong_evidence(), &ctx());
        // author, institution, publication, date, question; no related evidence
        assert!((a.confidence - (0.3 + 0.7 * 5.0 / 6.0)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_score_all_preserves_order() {
        let scorer = EvidenceScorer::new(ScoringConfiguration::default());
        let ctx = Arc::new(ctx());
        let mut bare = strong_evidence();
        bare.id = "e2".into();
        bare.source_metadata = None;
        let items = vec![
            (strong_evidence(), ctx.clone()),
            (bare, ctx.clone()),
        ];
        let out = scorer.score_all(items).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().evidence_id, "e1");
        assert_eq!(out[1].as_ref().unwrap_err().evidence_id, "e2");
    }

    #[test]
    fn test_config_validation() {
        assert!(ScoringConfiguration::default().validate().is_ok());
        let mut bad = ScoringConfiguration::default();
        bad.weights.credibility = 0.9;
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::WeightsNotNormalized { .. })
        ));
        let mut bad = ScoringConfiguration::default();
        bad.recency_decay_base = 1.0;
        assert!(bad.validate().is_err());
    }
}
