//! Letter grades and credibility tiers.

use serde::{Deserialize, Serialize};

/// Letter grade mapped from a composite score.
///
/// | Grade | Lower bound (inclusive) |
/// |-------|-------------------------|
/// | A+    | 0.95 |
/// | A     | 0.90 |
/// | B+    | 0.85 |
/// | B     | 0.75 |
/// | C     | 0.65 |
/// | D     | 0.50 |
/// | F     | -    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl QualityGrade {
    const TABLE: [(f64, QualityGrade); 6] = [
        (0.95, Self::APlus),
        (0.90, Self::A),
        (0.85, Self::BPlus),
        (0.75, Self::B),
        (0.65, Self::C),
        (0.50, Self::D),
    ];

    pub fn from_score(score: f64) -> Self {
        Self::TABLE
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map(|(_, grade)| *grade)
            .unwrap_or(Self::F)
    }

    /// Inclusive lower bound of this grade's score range.
    pub fn min_score(self) -> f64 {
        Self::TABLE
            .iter()
            .find(|(_, grade)| *grade == self)
            .map(|(floor, _)| *floor)
            .unwrap_or(0.0)
    }

    /// Position in the table; 0 is best. Ordering follows the same direction.
    pub fn tier_index(self) -> usize {
        self as usize
    }

    /// Whether this grade is at least as good as `other`.
    pub fn at_least(self, other: QualityGrade) -> bool {
        self <= other
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::APlus => write!(f, "A+"),
            Self::A => write!(f, "A"),
            Self::BPlus => write!(f, "B+"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
            Self::D => write!(f, "D"),
            Self::F => write!(f, "F"),
        }
    }
}

/// Credibility rubric tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityTier {
    /// [0.90, 1.00]
    Exceptional,
    /// [0.75, 0.90)
    Strong,
    /// [0.60, 0.75)
    Adequate,
    /// [0.50, 0.60)
    Weak,
    /// [0.00, 0.50)
    Poor,
}

impl CredibilityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            Self::Exceptional
        } else if score >= 0.75 {
            Self::Strong
        } else if score >= 0.60 {
            Self::Adequate
        } else if score >= 0.50 {
            Self::Weak
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exceptional => write!(f, "exceptional"),
            Self::Strong => write!(f, "strong"),
            Self::Adequate => write!(f, "adequate"),
            Self::Weak => write!(f, "weak"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries_are_inclusive() {
        assert_eq!(QualityGrade::from_score(0.95), QualityGrade::APlus);
        assert_eq!(QualityGrade::from_score(0.9499), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(0.90), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(0.85), QualityGrade::BPlus);
        assert_eq!(QualityGrade::from_score(0.75), QualityGrade::B);
        assert_eq!(QualityGrade::from_score(0.65), QualityGrade::C);
        assert_eq!(QualityGrade::from_score(0.50), QualityGrade::D);
        assert_eq!(QualityGrade::from_score(0.4999), QualityGrade::F);
        assert_eq!(QualityGrade::from_score(0.0), QualityGrade::F);
    }

    #[test]
    fn test_grade_min_score_round_trips() {
        for grade in [
            QualityGrade::APlus,
            QualityGrade::A,
            QualityGrade::BPlus,
            QualityGrade::B,
            QualityGrade::C,
            QualityGrade::D,
        ] {
            assert_eq!(QualityGrade::from_score(grade.min_score()), grade);
        }
        assert_eq!(QualityGrade::F.min_score(), 0.0);
    }

    #[test]
    fn test_grade_ordering() {
        assert!(QualityGrade::A.at_least(QualityGrade::B));
        assert!(!QualityGrade::D.at_least(QualityGrade::C));
        assert!(QualityGrade::C.tier_index() > QualityGrade::B.tier_index());
    }

    #[test]
    fn test_grade_serde_uses_letters() {
        assert_eq!(
            serde_json::to_string(&QualityGrade::BPlus).unwrap(),
            "\"B+\""
        );
        let g: QualityGrade = serde_json::from_str("\"A+\"").unwrap();
        assert_eq!(g, QualityGrade::APlus);
    }

    #[test]
    fn test_credibility_rubric() {
        assert_eq!(CredibilityTier::from_score(0.9), CredibilityTier::Exceptional);
        assert_eq!(CredibilityTier::from_score(0.8), CredibilityTier::Strong);
        assert_eq!(CredibilityTier::from_score(0.6), CredibilityTier::Adequate);
        assert_eq!(CredibilityTier::from_score(0.55), CredibilityTier::Weak);
        assert_eq!(CredibilityTier::from_score(0.49), CredibilityTier::Poor);
    }
}
