//! Stress testing of approved claims.
//!
//! Each approved claim is run through a fixed battery of environmental
//! scenarios. Results are advisory: they never change approval status.
//!
//! ```text
//! baseline (final aggregate)
//!   └─ per scenario: delta = −severity × exposure + mitigation   (delta ≤ 0)
//!        stressed = clamp(baseline + delta)    passed = stressed ≥ pass_floor
//! resilience = mean(clamp(stressed / baseline))
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consensus::rules::acknowledges_uncertainty;
use crate::debate::ClaimDebate;
use crate::error::ConfigError;
use crate::model::{Claim, EvidenceDomain};

/// Exposure every claim carries regardless of wording or evidence.
const BASE_EXPOSURE: f64 = 0.5;
/// Added when the claim text names a scenario driver.
const KEYWORD_EXPOSURE: f64 = 0.25;
/// Added when cited evidence sits in a scenario-sensitive domain.
const DOMAIN_EXPOSURE: f64 = 0.25;

static ECONOMIC_DRIVERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(revenues?|growth|grow(s|ing|n)?|spend(s|ing)?|demand|sales|margins?|prices?|pricing|invest\w*)\b")
        .expect("ECONOMIC_DRIVERS_RE regex should compile")
});

static REGULATORY_DRIVERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(regulat\w*|complian\w*|polic(y|ies)|laws?|legislat\w*|licen[cs](e|es|ed|ing)|privacy|tariffs?)\b")
        .expect("REGULATORY_DRIVERS_RE regex should compile")
});

static TECHNOLOGY_DRIVERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(technolog\w*|platforms?|software|cloud|adoption|automat\w*|ai)\b")
        .expect("TECHNOLOGY_DRIVERS_RE regex should compile")
});

static SUPPLY_CHAIN_DRIVERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(supply|suppliers?|manufactur\w*|inventor(y|ies)|logistics?|components?)\b")
        .expect("SUPPLY_CHAIN_DRIVERS_RE regex should compile")
});

static COMPETITIVE_DRIVERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(market\s+share|competit\w*|leaders?|entrants?|pricing|customers?)\b")
        .expect("COMPETITIVE_DRIVERS_RE regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressScenario {
    EconomicDownturn,
    RegulatoryChange,
    TechnologyDisruption,
    SupplyChainDisruption,
    CompetitiveDisruption,
}

impl StressScenario {
    pub const ALL: [StressScenario; 5] = [
        Self::EconomicDownturn,
        Self::RegulatoryChange,
        Self::TechnologyDisruption,
        Self::SupplyChainDisruption,
        Self::CompetitiveDisruption,
    ];

    /// Confidence lost at full exposure.
    pub fn severity(self) -> f64 {
        match self {
            Self::EconomicDownturn => 0.25,
            Self::RegulatoryChange => 0.20,
            Self::TechnologyDisruption => 0.20,
            Self::SupplyChainDisruption => 0.15,
            Self::CompetitiveDisruption => 0.20,
        }
    }

    /// Whole-word pattern for the drivers this scenario hits.
    fn drivers(self) -> &'static Regex {
        match self {
            Self::EconomicDownturn => &ECONOMIC_DRIVERS_RE,
            Self::RegulatoryChange => &REGULATORY_DRIVERS_RE,
            Self::TechnologyDisruption => &TECHNOLOGY_DRIVERS_RE,
            Self::SupplyChainDisruption => &SUPPLY_CHAIN_DRIVERS_RE,
            Self::CompetitiveDisruption => &COMPETITIVE_DRIVERS_RE,
        }
    }

    fn sensitive_domains(self) -> &'static [EvidenceDomain] {
        match self {
            Self::EconomicDownturn => &[
                EvidenceDomain::FinancialMarkets,
                EvidenceDomain::MarketResearch,
            ],
            Self::RegulatoryChange => &[EvidenceDomain::Regulatory],
            Self::TechnologyDisruption => &[EvidenceDomain::Technology],
            Self::SupplyChainDisruption => &[EvidenceDomain::MarketResearch],
            Self::CompetitiveDisruption => &[
                EvidenceDomain::CompetitiveIntelligence,
                EvidenceDomain::MarketResearch,
            ],
        }
    }

    /// Exposure of `claim` to this scenario, in [0.5, 1].
    pub fn exposure(self, claim: &Claim) -> f64 {
        let mut exposure = BASE_EXPOSURE;
        if self.drivers().is_match(claim.current_text()) {
            exposure += KEYWORD_EXPOSURE;
        }
        if claim
            .evidence
            .iter()
            .any(|e| self.sensitive_domains().contains(&e.domain))
        {
            exposure += DOMAIN_EXPOSURE;
        }
        exposure.min(1.0)
    }
}

impl std::fmt::Display for StressScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EconomicDownturn => write!(f, "economic_downturn"),
            Self::RegulatoryChange => write!(f, "regulatory_change"),
            Self::TechnologyDisruption => write!(f, "technology_disruption"),
            Self::SupplyChainDisruption => write!(f, "supply_chain_disruption"),
            Self::CompetitiveDisruption => write!(f, "competitive_disruption"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Stressed confidence a scenario needs to pass.
    pub pass_floor: f64,
    /// Mitigation when the claim states a limitation or bound.
    pub limitation_mitigation: f64,
    /// Mitigation per distinct evidence domain beyond the first.
    pub diversity_mitigation: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            pass_floor: 0.5,
            limitation_mitigation: 0.05,
            diversity_mitigation: 0.02,
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("stress.pass_floor", self.pass_floor),
            ("stress.limitation_mitigation", self.limitation_mitigation),
            ("stress.diversity_mitigation", self.diversity_mitigation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: StressScenario,
    pub exposure: f64,
    /// Change in confidence; never positive.
    pub delta: f64,
    pub stressed_confidence: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimStressResult {
    pub claim_id: String,
    pub baseline_confidence: f64,
    pub scenarios: Vec<ScenarioResult>,
    pub resilience_score: f64,
}

impl ClaimStressResult {
    pub fn passed_all(&self) -> bool {
        self.scenarios.iter().all(|s| s.passed)
    }

    pub fn failed_scenarios(&self) -> impl Iterator<Item = StressScenario> + '_ {
        self.scenarios.iter().filter(|s| !s.passed).map(|s| s.scenario)
    }
}

/// Advisory resilience metadata attached to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceReport {
    pub claims: Vec<ClaimStressResult>,
    /// Mean claim resilience; `None` when no claim was tested.
    pub resilience_score: Option<f64>,
}

impl ResilienceReport {
    pub fn claim(&self, claim_id: &str) -> Option<&ClaimStressResult> {
        self.claims.iter().find(|c| c.claim_id == claim_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StressTester {
    config: StressConfig,
}

impl StressTester {
    pub fn new(config: StressConfig) -> Self {
        Self { config }
    }

    /// Run every scenario against `claim` starting from `baseline`.
    pub fn test_claim(&self, claim: &Claim, baseline: f64) -> ClaimStressResult {
        let baseline = baseline.clamp(0.0, 1.0);
        let domains: BTreeSet<EvidenceDomain> = claim.evidence.iter().map(|e| e.domain).collect();
        let mut mitigation =
            self.config.diversity_mitigation * domains.len().saturating_sub(1) as f64;
        if acknowledges_uncertainty(claim.current_text()) {
            mitigation += self.config.limitation_mitigation;
        }

        let scenarios: Vec<ScenarioResult> = StressScenario::ALL
            .iter()
            .map(|&scenario| {
                let exposure = scenario.exposure(claim);
                let delta = (-(scenario.severity() * exposure) + mitigation).min(0.0);
                let stressed_confidence = (baseline + delta).clamp(0.0, 1.0);
                ScenarioResult {
                    scenario,
                    exposure,
                    delta,
                    stressed_confidence,
                    passed: stressed_confidence >= self.config.pass_floor,
                }
            })
            .collect();

        let resilience_score = if baseline > 0.0 {
            scenarios
                .iter()
                .map(|s| (s.stressed_confidence / baseline).clamp(0.0, 1.0))
                .sum::<f64>()
                / scenarios.len() as f64
        } else {
            0.0
        };
        debug!(claim = %claim.id, baseline, resilience = resilience_score, "claim stress-tested");

        ClaimStressResult {
            claim_id: claim.id.clone(),
            baseline_confidence: baseline,
            scenarios,
            resilience_score,
        }
    }

    /// Stress-test every approved claim among `debates`.
    pub fn run(&self, debates: &[ClaimDebate]) -> ResilienceReport {
        let claims: Vec<ClaimStressResult> = debates
            .iter()
            .filter(|d| d.is_approved())
            .map(|d| self.test_claim(&d.claim, d.final_aggregate))
            .collect();
        let resilience_score = (!claims.is_empty()).then(|| {
            claims.iter().map(|c| c.resilience_score).sum::<f64>() / claims.len() as f64
        });
        ResilienceReport {
            claims,
            resilience_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evidence;

    fn claim(text: &str, domains: &[EvidenceDomain]) -> Claim {
        domains
            .iter()
            .enumerate()
            .fold(Claim::new("c1", text, 0.8), |c, (i, d)| {
                c.with_evidence(Evidence::new(&format!("e{i}"), "x", *d))
            })
    }

    #[test]
    fn test_exposure_bounds() {
        let plain = claim("Headcount stays flat", &[EvidenceDomain::Other]);
        let exposed = claim("Cloud revenue growth continues", &[EvidenceDomain::FinancialMarkets]);
        for s in StressScenario::ALL {
            assert_eq!(s.exposure(&plain), 0.5);
        }
        assert_eq!(StressScenario::EconomicDownturn.exposure(&exposed), 1.0);
    }

    #[test]
    fn test_drivers_match_whole_words_only() {
        let lawn = claim("Air quality sensors aim at lawn care buyers.", &[]);
        assert_eq!(StressScenario::RegulatoryChange.exposure(&lawn), BASE_EXPOSURE);
        assert_eq!(StressScenario::TechnologyDisruption.exposure(&lawn), BASE_EXPOSURE);

        let hit = claim("New AI law restricts data use.", &[]);
        let expected = BASE_EXPOSURE + KEYWORD_EXPOSURE;
        assert_eq!(StressScenario::RegulatoryChange.exposure(&hit), expected);
        assert_eq!(StressScenario::TechnologyDisruption.exposure(&hit), expected);
    }

    #[test]
    fn test_stress_is_never_positive() {
        let tester = StressTester::default();
        let c = claim(
            "Revenue likely grows 8-12%",
            &[
                EvidenceDomain::FinancialMarkets,
                EvidenceDomain::MarketResearch,
                EvidenceDomain::Technology,
                EvidenceDomain::Regulatory,
            ],
        );
        let result = tester.test_claim(&c, 0.85);
        assert_eq!(result.scenarios.len(), 5);
        for s in &result.scenarios {
            assert!(s.delta <= 0.0);
            assert!(s.stressed_confidence <= 0.85);
        }
        assert!(result.resilience_score > 0.0 && result.resilience_score <= 1.0);
    }

    #[test]
    fn test_limitation_mitigates() {
        let tester = StressTester::default();
        let bare = tester.test_claim(&claim("Revenue grows", &[EvidenceDomain::FinancialMarkets]), 0.8);
        let hedged = tester.test_claim(
            &claim("Revenue grows, with limitation noted", &[EvidenceDomain::FinancialMarkets]),
            0.8,
        );
        assert!(hedged.resilience_score > bare.resilience_score);
    }

    #[test]
    fn test_economic_downturn_fails_weak_claim() {
        let tester = StressTester::default();
        let c = claim("Revenue doubles", &[EvidenceDomain::FinancialMarkets]);
        let result = tester.test_claim(&c, 0.6);
        let downturn = &result.scenarios[0];
        assert_eq!(downturn.scenario, StressScenario::EconomicDownturn);
        assert!((downturn.stressed_confidence - 0.35).abs() < 1e-9);
        assert!(!downturn.passed);
        assert!(!result.passed_all());
        assert!(result
            .failed_scenarios()
            .any(|s| s == StressScenario::EconomicDownturn));
    }

    #[test]
    fn test_zero_baseline() {
        let result = StressTester::default().test_claim(&claim("x", &[]), 0.0);
        assert_eq!(result.resilience_score, 0.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(StressConfig::default().validate().is_ok());
        let bad = StressConfig {
            pass_floor: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
