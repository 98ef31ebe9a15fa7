//! Scoring property tests: sweeps over varied inputs checking the scoring
//! and weighting invariants.
//!
//! Tests verify:
//! - Composite scores stay in [0, 1] and grades match their ranges
//! - Penalties never raise a score
//! - Adapted weights are normalized and non-negative for every context
//! - Adaptation never mutates the base weights
//! - Scoring the same evidence twice gives identical assessments

use chrono::NaiveDate;

use claim_validation::scoring::{
    compose, DimensionScores, QualityGrade, ScoringConfiguration, ScoringContext, WeightConfig,
};
use claim_validation::weighting::{
    adapt_weights, DecisionContext, DecisionType, RiskTolerance, TimePressure,
};
use claim_validation::{Evidence, EvidenceDomain, EvidenceScorer, SourceMetadata};

/// Deterministic pseudo-random values in [0, 1].
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn scores(&mut self) -> DimensionScores {
        DimensionScores {
            credibility: self.next(),
            relevance: self.next(),
            recency: self.next(),
            completeness: self.next(),
            consistency: self.next(),
        }
    }
}

fn all_contexts() -> Vec<DecisionContext> {
    let mut out = Vec::new();
    for decision_type in DecisionType::ALL {
        for risk_tolerance in RiskTolerance::ALL {
            for time_pressure in TimePressure::ALL {
                for domain_hint in std::iter::once(None).chain(EvidenceDomain::ALL.map(Some)) {
                    out.push(DecisionContext {
                        decision_type,
                        risk_tolerance,
                        time_pressure,
                        domain_hint,
                    });
                }
            }
        }
    }
    out
}

// ── Scenario A / B ─────────────────────────────────────────────────

#[test]
fn test_strong_scores_grade_a() {
    let scores = DimensionScores {
        credibility: 0.95,
        relevance: 0.9,
        recency: 0.9,
        completeness: 0.85,
        consistency: 0.9,
    };
    let c = compose(&scores, &WeightConfig::default(), false, &ScoringConfiguration::default());
    assert!((c.score - 0.9075).abs() < 1e-9);
    assert_eq!(c.grade, QualityGrade::A);
}

#[test]
fn test_low_credibility_drops_a_grade() {
    let config = ScoringConfiguration::default();
    let scores = DimensionScores {
        credibility: 0.4,
        relevance: 0.95,
        recency: 0.95,
        completeness: 0.95,
        consistency: 0.95,
    };
    let c = compose(&scores, &WeightConfig::default(), false, &config);
    assert!((c.score - c.raw * 0.7).abs() < 1e-12);
    let unpenalized = QualityGrade::from_score(c.raw);
    assert!(unpenalized.at_least(c.grade) && unpenalized != c.grade);
}

// ── Invariants over random inputs ──────────────────────────────────

#[test]
fn test_composite_bounded_and_graded() {
    let config = ScoringConfiguration::default();
    let mut rng = Lcg(7);
    for ctx in all_contexts().iter().step_by(3) {
        let weights = adapt_weights(&WeightConfig::default(), ctx);
        for _ in 0..20 {
            let scores = rng.scores();
            let contradiction = rng.next() > 0.5;
            let c = compose(&scores, &weights, contradiction, &config);
            assert!((0.0..=1.0).contains(&c.score), "{c:?}");
            assert!(c.score <= c.raw + 1e-12, "penalty raised score: {c:?}");
            assert_eq!(c.grade, QualityGrade::from_score(c.score));
            if c.penalties.is_empty() {
                assert!((c.score - c.raw).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn test_adapted_weights_normalized_for_every_context() {
    let bases = [
        WeightConfig::default(),
        WeightConfig::uniform(),
        WeightConfig {
            credibility: 0.9,
            relevance: 0.1,
            recency: 0.0,
            completeness: 0.0,
            consistency: 0.0,
        },
    ];
    for base in bases {
        let before = base;
        for ctx in all_contexts() {
            let w = adapt_weights(&base, &ctx);
            assert!(w.is_normalized(), "{ctx:?} -> {w:?} (sum {})", w.sum());
            for v in [w.credibility, w.relevance, w.recency, w.completeness, w.consistency] {
                assert!(v >= 0.0, "{ctx:?} -> negative weight {w:?}");
            }
        }
        assert_eq!(base, before);
    }
}

#[test]
fn test_scoring_is_deterministic_across_contexts() {
    let evidence = Evidence::new(
        "e1",
        "Regulator filing: 14 of 20 surveyed banks adopted the standard in 2025; \
         methodology and sample described, margin of error 5%.",
        EvidenceDomain::Regulatory,
    )
    .with_source_url("https://www.sec.gov/filing")
    .with_metadata(SourceMetadata {
        institution: Some("SEC".into()),
        publication: Some("Federal Register".into()),
        ..Default::default()
    })
    .published(NaiveDate::from_ymd_opt(2025, 11, 2).unwrap());
    let reference = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

    for ctx in all_contexts().iter().step_by(5) {
        let weights = adapt_weights(&WeightConfig::default(), ctx);
        let scorer = EvidenceScorer::new(ScoringConfiguration::default()).with_weights(weights);
        let scoring_ctx = ScoringContext::new(reference)
            .with_question("Will banks adopt the standard?")
            .with_decision(*ctx);
        let a = scorer.score(&evidence, &scoring_ctx);
        let b = scorer.score(&evidence, &scoring_ctx);
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a.composite_score));
        assert!((0.0..=1.0).contains(&a.confidence));
    }
}
