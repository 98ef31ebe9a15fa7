//! Quality assessments and the composite score.

use serde::{Deserialize, Serialize};

use super::grade::{CredibilityTier, QualityGrade};
use super::weights::{QualityDimension, WeightConfig};

/// The five dimension scores of one evidence item, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub credibility: f64,
    pub relevance: f64,
    pub recency: f64,
    pub completeness: f64,
    pub consistency: f64,
}

impl DimensionScores {
    pub fn get(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Credibility => self.credibility,
            QualityDimension::Relevance => self.relevance,
            QualityDimension::Recency => self.recency,
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Consistency => self.consistency,
        }
    }

    /// Σ(dimension × weight).
    pub fn weighted_sum(&self, weights: &WeightConfig) -> f64 {
        QualityDimension::ALL
            .iter()
            .map(|d| self.get(*d) * weights.get(*d))
            .sum()
    }
}

/// Why a multiplicative penalty was applied to the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyReason {
    LowCredibility,
    LowRelevance,
    Contradiction,
}

impl std::fmt::Display for PenaltyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowCredibility => write!(f, "low_credibility"),
            Self::LowRelevance => write!(f, "low_relevance"),
            Self::Contradiction => write!(f, "contradiction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedPenalty {
    pub reason: PenaltyReason,
    pub factor: f64,
}

/// Quality assessment of one evidence item.
///
/// Built once by the scorer and never edited; re-scoring yields a new value
/// with a higher `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub evidence_id: String,
    pub version: u32,
    pub credibility: f64,
    pub relevance: f64,
    pub recency: f64,
    pub completeness: f64,
    pub consistency: f64,
    /// Weighted sum before penalties.
    pub raw_composite: f64,
    pub composite_score: f64,
    pub quality_grade: QualityGrade,
    pub credibility_tier: CredibilityTier,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub penalties: Vec<AppliedPenalty>,
    #[serde(default)]
    pub contradiction_detected: bool,
    /// Built from recency and relevance only because source metadata was absent.
    #[serde(default)]
    pub insufficient_data: bool,
}

impl QualityAssessment {
    pub fn dimensions(&self) -> DimensionScores {
        DimensionScores {
            credibility: self.credibility,
            relevance: self.relevance,
            recency: self.recency,
            completeness: self.completeness,
            consistency: self.consistency,
        }
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} composite={:.3} cred={:.2} rel={:.2} rec={:.2} comp={:.2} cons={:.2}",
            self.quality_grade,
            self.evidence_id,
            self.composite_score,
            self.credibility,
            self.relevance,
            self.recency,
            self.completeness,
            self.consistency
        )
    }
}
