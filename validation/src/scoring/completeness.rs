//! Completeness dimension: information depth and coverage breadth.

use serde::{Deserialize, Serialize};

use super::text;
use super::ScoringContext;
use crate::model::Evidence;

const METHODOLOGY_MARKERS: &[&str] = &[
    "methodology", "method", "sample", "survey", "dataset", "study", "interview",
    "experiment", "randomized", "panel", "respondents", "data from",
];

const SOPHISTICATION_MARKERS: &[&str] = &[
    "regression", "correlation", "statistically", "significant", "confidence interval",
    "variance", "forecast", "scenario", "sensitivity", "cohort", "segment", "causal",
    "control group", "year-over-year", "cagr",
];

const LIMITATION_MARKERS: &[&str] = &[
    "limitation", "caveat", "however", "uncertain", "margin of error", "may not",
    "bias", "assumption", "preliminary", "small sample",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletenessBreakdown {
    pub methodology: f64,
    pub granularity: f64,
    pub sophistication: f64,
    pub limitations: f64,
    pub depth: f64,
    pub breadth: f64,
    pub missing_penalty: f64,
    pub score: f64,
}

fn saturating(count: usize, saturation: usize) -> f64 {
    (count as f64 / saturation as f64).min(1.0)
}

/// Score `evidence` for completeness.
///
/// Each missing-information item subtracts `penalty_per_item`, up to `penalty_cap`.
pub fn score(
    evidence: &Evidence,
    ctx: &ScoringContext,
    penalty_per_item: f64,
    penalty_cap: f64,
) -> CompletenessBreakdown {
    let body = &evidence.text;
    let methodology = saturating(text::count_markers(body, METHODOLOGY_MARKERS), 3);
    let granularity = saturating(text::numeric_tokens(body), 4);
    let sophistication = saturating(text::count_markers(body, SOPHISTICATION_MARKERS), 2);
    let limitations = saturating(text::count_markers(body, LIMITATION_MARKERS), 2);
    let depth = (methodology + granularity + sophistication + limitations) / 4.0;

    let mut targets = ctx.question_tokens();
    targets.extend(ctx.keyword_tokens());
    let breadth = text::coverage(&targets, &text::tokens(body)).unwrap_or(0.5);

    let missing_penalty =
        (penalty_per_item * evidence.missing_information.len() as f64).min(penalty_cap);
    let score = ((depth + breadth) / 2.0 - missing_penalty).clamp(0.0, 1.0);

    CompletenessBreakdown {
        methodology,
        granularity,
        sophistication,
        limitations,
        depth,
        breadth,
        missing_penalty,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvidenceDomain;
    use chrono::NaiveDate;

    fn ctx() -> ScoringContext {
        ScoringContext::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_question("How fast is cloud adoption growing?")
    }

    #[test]
    fn test_rich_report_scores_high() {
        let ev = Evidence::new(
            "e1",
            "Survey methodology: a randomized sample of 1,200 respondents across 14 countries. \
             Cloud adoption growing 22% year-over-year; regression shows a statistically \
             significant effect. Limitation: small sample in APAC, however results hold in 2024 and 2025.",
            EvidenceDomain::MarketResearch,
        );
        let c = score(&ev, &ctx(), 0.1, 0.5);
        assert_eq!(c.methodology, 1.0);
        assert_eq!(c.granularity, 1.0);
        assert_eq!(c.sophistication, 1.0);
        assert_eq!(c.limitations, 1.0);
        assert!(c.score > 0.8, "score was {}", c.score);
    }

    #[test]
    fn test_thin_text_scores_low() {
        let ev = Evidence::new("e2", "Things look good.", EvidenceDomain::Other);
        let c = score(&ev, &ctx(), 0.1, 0.5);
        assert_eq!(c.depth, 0.0);
        assert!(c.score < 0.1);
    }

    #[test]
    fn test_missing_information_penalty_is_capped() {
        let mut ev = Evidence::new(
            "e3",
            "Survey methodology with sample of 500 shows cloud adoption growing 10%",
            EvidenceDomain::Technology,
        );
        let base = score(&ev, &ctx(), 0.1, 0.5).score;
        ev = ev.with_missing("no sample frame");
        let one = score(&ev, &ctx(), 0.1, 0.5);
        assert!((one.missing_penalty - 0.1).abs() < 1e-12);
        assert!((base - one.score - 0.1).abs() < 1e-9);

        for i in 0..8 {
            ev = ev.with_missing(&format!("gap {i}"));
        }
        assert_eq!(score(&ev, &ctx(), 0.1, 0.5).missing_penalty, 0.5);
    }

    #[test]
    fn test_no_question_uses_neutral_breadth() {
        let plain = ScoringContext::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let ev = Evidence::new("e4", "anything", EvidenceDomain::Other);
        assert_eq!(score(&ev, &plain, 0.1, 0.5).breadth, 0.5);
    }
}
