//! Dimension weights for the composite quality score.

use serde::{Deserialize, Serialize};

/// Tolerance used when checking that weights sum to one.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// One of the five evidence quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    Credibility,
    Relevance,
    Recency,
    Completeness,
    Consistency,
}

impl QualityDimension {
    pub const ALL: [QualityDimension; 5] = [
        Self::Credibility,
        Self::Relevance,
        Self::Recency,
        Self::Completeness,
        Self::Consistency,
    ];
}

impl std::fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credibility => write!(f, "credibility"),
            Self::Relevance => write!(f, "relevance"),
            Self::Recency => write!(f, "recency"),
            Self::Completeness => write!(f, "completeness"),
            Self::Consistency => write!(f, "consistency"),
        }
    }
}

/// Weight per dimension. A valid config is non-negative and sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub credibility: f64,
    pub relevance: f64,
    pub recency: f64,
    pub completeness: f64,
    pub consistency: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            credibility: 0.35,
            relevance: 0.25,
            recency: 0.20,
            completeness: 0.15,
            consistency: 0.05,
        }
    }
}

impl WeightConfig {
    /// Equal weight on every dimension.
    pub fn uniform() -> Self {
        Self {
            credibility: 0.2,
            relevance: 0.2,
            recency: 0.2,
            completeness: 0.2,
            consistency: 0.2,
        }
    }

    pub fn get(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Credibility => self.credibility,
            QualityDimension::Relevance => self.relevance,
            QualityDimension::Recency => self.recency,
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Consistency => self.consistency,
        }
    }

    fn slot(&mut self, dimension: QualityDimension) -> &mut f64 {
        match dimension {
            QualityDimension::Credibility => &mut self.credibility,
            QualityDimension::Relevance => &mut self.relevance,
            QualityDimension::Recency => &mut self.recency,
            QualityDimension::Completeness => &mut self.completeness,
            QualityDimension::Consistency => &mut self.consistency,
        }
    }

    /// Add `delta` to one dimension, clamping at zero.
    pub fn adjust(&mut self, dimension: QualityDimension, delta: f64) {
        let slot = self.slot(dimension);
        *slot = (*slot + delta).max(0.0);
    }

    /// Multiply one dimension by `factor`, clamping at zero.
    pub fn scale(&mut self, dimension: QualityDimension, factor: f64) {
        let slot = self.slot(dimension);
        *slot = (*slot * factor).max(0.0);
    }

    pub fn sum(&self) -> f64 {
        QualityDimension::ALL.iter().map(|d| self.get(*d)).sum()
    }

    /// Rescale so the weights sum to 1.0.
    ///
    /// Negative or non-finite entries are treated as zero; an all-zero config
    /// falls back to [`WeightConfig::uniform`].
    pub fn normalized(&self) -> Self {
        let mut out = *self;
        for d in QualityDimension::ALL {
            let slot = out.slot(d);
            if !slot.is_finite() || *slot < 0.0 {
                *slot = 0.0;
            }
        }
        let total = out.sum();
        if total <= 0.0 {
            return Self::uniform();
        }
        for d in QualityDimension::ALL {
            *out.slot(d) /= total;
        }
        out
    }

    /// Whether every weight is non-negative and the total is 1.0 within tolerance.
    pub fn is_normalized(&self) -> bool {
        QualityDimension::ALL
            .iter()
            .all(|d| self.get(*d).is_finite() && self.get(*d) >= 0.0)
            && (self.sum() - 1.0).abs() <= WEIGHT_EPSILON
    }
}
