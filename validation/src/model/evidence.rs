//! Evidence items and the source metadata the scorer reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Subject-matter domain of an evidence item.
///
/// Drives the recency half-life and the decision-context fit of relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceDomain {
    Technology,
    FinancialMarkets,
    Regulatory,
    Demographic,
    CompetitiveIntelligence,
    MarketResearch,
    Other,
}

impl EvidenceDomain {
    /// Every domain, in declaration order.
    pub const ALL: [EvidenceDomain; 7] = [
        Self::Technology,
        Self::FinancialMarkets,
        Self::Regulatory,
        Self::Demographic,
        Self::CompetitiveIntelligence,
        Self::MarketResearch,
        Self::Other,
    ];

    /// Recency half-life in days before stability adjustment.
    pub fn half_life_days(self) -> f64 {
        match self {
            Self::Technology => 90.0,
            Self::FinancialMarkets => 30.0,
            Self::Regulatory => 365.0,
            Self::Demographic => 1095.0,
            Self::CompetitiveIntelligence => 180.0,
            Self::MarketResearch => 365.0,
            Self::Other => 365.0,
        }
    }
}

impl Default for EvidenceDomain {
    fn default() -> Self {
        Self::Other
    }
}

impl std::fmt::Display for EvidenceDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Technology => write!(f, "technology"),
            Self::FinancialMarkets => write!(f, "financial_markets"),
            Self::Regulatory => write!(f, "regulatory"),
            Self::Demographic => write!(f, "demographic"),
            Self::CompetitiveIntelligence => write!(f, "competitive_intelligence"),
            Self::MarketResearch => write!(f, "market_research"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// How often the publishing source refreshes its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFrequency {
    RealTime,
    Daily,
    Weekly,
    Monthly,
    Annual,
    Static,
}

impl UpdateFrequency {
    /// Additive adjustment applied to the decayed recency score.
    pub fn recency_adjustment(self) -> f64 {
        match self {
            Self::RealTime | Self::Daily => 0.05,
            Self::Weekly => 0.03,
            Self::Monthly => 0.0,
            Self::Annual => -0.02,
            Self::Static => -0.05,
        }
    }
}

/// Provenance of an evidence item as extracted by the collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub publication: Option<String>,
    #[serde(default)]
    pub peer_reviewed: bool,
    #[serde(default)]
    pub citation_count: u32,
    #[serde(default)]
    pub funding_independent: bool,
    /// Declared conflicts of interest (sponsor names, affiliations).
    #[serde(default)]
    pub conflicts_of_interest: Vec<String>,
    #[serde(default)]
    pub update_frequency: Option<UpdateFrequency>,
}

impl SourceMetadata {
    /// Whether any identifying field (author, institution, publication) is present.
    pub fn has_identity(&self) -> bool {
        [&self.author, &self.institution, &self.publication]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// An atomic fact candidate cited by exactly one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_metadata: Option<SourceMetadata>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub data_collection_date: Option<NaiveDate>,
    #[serde(default)]
    pub domain: EvidenceDomain,
    /// Gaps the collector explicitly identified (e.g. "no sample size").
    #[serde(default)]
    pub missing_information: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Evidence {
    pub fn new(id: &str, text: &str, domain: EvidenceDomain) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            source_url: String::new(),
            source_metadata: None,
            publication_date: None,
            data_collection_date: None,
            domain,
            missing_information: Vec::new(),
            region: None,
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.source_metadata = Some(metadata);
        self
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }

    pub fn published(mut self, date: NaiveDate) -> Self {
        self.publication_date = Some(date);
        self
    }

    pub fn collected(mut self, date: NaiveDate) -> Self {
        self.data_collection_date = Some(date);
        self
    }

    pub fn with_missing(mut self, item: &str) -> Self {
        self.missing_information.push(item.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Whether the source carries enough metadata for a full credibility score.
    pub fn has_source_identity(&self) -> bool {
        self.source_metadata
            .as_ref()
            .is_some_and(SourceMetadata::has_identity)
    }

    /// Date used for recency: publication date, falling back to collection date.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.publication_date.or(self.data_collection_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_half_lives() {
        assert_eq!(EvidenceDomain::Technology.half_life_days(), 90.0);
        assert_eq!(EvidenceDomain::FinancialMarkets.half_life_days(), 30.0);
        assert_eq!(EvidenceDomain::Demographic.half_life_days(), 1095.0);
        assert_eq!(EvidenceDomain::Other.half_life_days(), 365.0);
    }

    #[test]
    fn test_domain_serde_snake_case() {
        let json = serde_json::to_string(&EvidenceDomain::CompetitiveIntelligence).unwrap();
        assert_eq!(json, "\"competitive_intelligence\"");
        assert_eq!(
            EvidenceDomain::FinancialMarkets.to_string(),
            "financial_markets"
        );
    }

    #[test]
    fn test_has_identity_ignores_blank_fields() {
        let meta = SourceMetadata {
            author: Some("  ".into()),
            ..Default::default()
        };
        assert!(!meta.has_identity());

        let meta = SourceMetadata {
            publication: Some("Nature".into()),
            ..Default::default()
        };
        assert!(meta.has_identity());
    }

    #[test]
    fn test_effective_date_falls_back_to_collection() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let ev = Evidence::new("e1", "text", EvidenceDomain::Other).collected(date);
        assert_eq!(ev.effective_date(), Some(date));
        assert!(!ev.has_source_identity());
    }

    #[test]
    fn test_evidence_deserializes_with_defaults() {
        let ev: Evidence = serde_json::from_str(r#"{"id":"e1","text":"t"}"#).unwrap();
        assert_eq!(ev.domain, EvidenceDomain::Other);
        assert!(ev.source_metadata.is_none());
        assert!(ev.missing_information.is_empty());
    }
}
