use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::normalize_name;

// --- Source configuration ---

/// Which collector family handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS/Atom feed polled for recent entries.
    Feed,
    /// Forum/social listing API queried by category and time window.
    Forum,
    /// Curated startup listing scraped list-page-then-detail-page.
    Listing,
    /// Search-engine discovery via fixed funding-intent query templates.
    Discovery,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Feed => write!(f, "feed"),
            SourceKind::Forum => write!(f, "forum"),
            SourceKind::Listing => write!(f, "listing"),
            SourceKind::Discovery => write!(f, "discovery"),
        }
    }
}

impl SourceKind {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "feed" | "rss" | "atom" => SourceKind::Feed,
            "forum" | "social" | "api" => SourceKind::Forum,
            "listing" | "directory" => SourceKind::Listing,
            _ => SourceKind::Discovery,
        }
    }
}

/// One configured source. Read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub kind: SourceKind,
    pub endpoint: String,
    pub enabled: bool,
    /// Reliability weight in [0,1]. Doubles as the per-evidence confidence
    /// attached to items from this source.
    pub reliability: f64,
}

impl SourceDescriptor {
    /// High-trust sources bypass the pending pool and write canonical records
    /// directly at intake.
    pub fn is_high_trust(&self) -> bool {
        self.reliability >= 0.9
    }
}

// --- Pipeline types ---

/// One harvested item, ephemeral: produced by a collector, consumed once by
/// the extraction gateway, then discarded.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: String,
    pub source_name: String,
}

/// One source's observation of a candidate. Immutable once attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source_name: String,
    pub source_url: String,
    pub extracted_at: DateTime<Utc>,
    /// Per-evidence confidence in [0,1], inherited from source reliability.
    pub confidence: f64,
}

/// Structured facts about one funding/launch event, as produced by the
/// extraction gateway after date-fallback normalization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedCompany {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    /// Raw amount as written in the source ("$5M", "5 million", "undisclosed").
    pub funding_amount: Option<String>,
    pub funding_round: Option<String>,
    /// Announcement date, already normalized by the gateway.
    pub announced_at: NaiveDate,
    pub founders: Vec<String>,
    pub industry: Option<String>,
    pub tags: Vec<String>,
    /// Extraction confidence in [0,1].
    pub confidence: f64,
}

// --- Record lifecycle ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Validated,
    Rejected,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Pending => write!(f, "pending"),
            ValidationStatus::Validated => write!(f, "validated"),
            ValidationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl ValidationStatus {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "validated" => ValidationStatus::Validated,
            "rejected" => ValidationStatus::Rejected,
            _ => ValidationStatus::Pending,
        }
    }
}

/// An unvalidated extracted entity accruing confidence in the pending pool.
/// Mutated only by the confidence engine; deleted on promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub name: String,
    /// Normalized dedup key.
    pub canonical_name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub funding_amount: Option<String>,
    pub funding_amount_usd: Option<i64>,
    pub funding_round: Option<String>,
    pub announced_at: NaiveDate,
    pub founders: Vec<String>,
    pub industry: Option<String>,
    pub tags: Vec<String>,
    /// Non-empty, ordered by attachment time.
    pub evidence: Vec<Evidence>,
    pub aggregate_confidence: f64,
    pub status: ValidationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRecord {
    pub fn from_extraction(
        company: &ExtractedCompany,
        evidence: Evidence,
        funding_amount_usd: Option<i64>,
        initial_confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            canonical_name: normalize_name(&company.name),
            name: company.name.clone(),
            description: company.description.clone(),
            website: company.website.clone(),
            funding_amount: company.funding_amount.clone(),
            funding_amount_usd,
            funding_round: company.funding_round.clone(),
            announced_at: company.announced_at,
            founders: company.founders.clone(),
            industry: company.industry.clone(),
            tags: company.tags.clone(),
            evidence: vec![evidence],
            aggregate_confidence: initial_confidence.clamp(0.0, 1.0),
            status: ValidationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of distinct source names across attached evidence.
    pub fn distinct_sources(&self) -> usize {
        let mut names: Vec<&str> = self.evidence.iter().map(|e| e.source_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

/// A promoted, externally-visible entity. Mutated only by enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: Uuid,
    pub name: String,
    pub canonical_name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub funding_amount: Option<String>,
    pub funding_amount_usd: Option<i64>,
    pub funding_round: Option<String>,
    pub announced_at: NaiveDate,
    pub founders: Vec<String>,
    pub industry: Option<String>,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub source_name: String,
    pub source_url: String,
    pub enrichment_complete: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl CanonicalRecord {
    /// Build a canonical record straight from a high-trust extraction.
    pub fn from_extraction(
        company: &ExtractedCompany,
        source_name: &str,
        source_url: &str,
        funding_amount_usd: Option<i64>,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            canonical_name: normalize_name(&company.name),
            name: company.name.clone(),
            description: company.description.clone(),
            website: company.website.clone(),
            funding_amount: company.funding_amount.clone(),
            funding_amount_usd,
            funding_round: company.funding_round.clone(),
            announced_at: company.announced_at,
            founders: company.founders.clone(),
            industry: company.industry.clone(),
            tags: company.tags.clone(),
            confidence: confidence.clamp(0.0, 1.0),
            source_name: source_name.to_string(),
            source_url: source_url.to_string(),
            enrichment_complete: false,
            created_at: now,
            last_seen_at: now,
        }
    }

    /// Promotion copy from a validated candidate. The first evidence item is
    /// the originating source.
    pub fn from_candidate(candidate: &CandidateRecord) -> Self {
        let origin = candidate.evidence.first();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: candidate.name.clone(),
            canonical_name: candidate.canonical_name.clone(),
            description: candidate.description.clone(),
            website: candidate.website.clone(),
            funding_amount: candidate.funding_amount.clone(),
            funding_amount_usd: candidate.funding_amount_usd,
            funding_round: candidate.funding_round.clone(),
            announced_at: candidate.announced_at,
            founders: candidate.founders.clone(),
            industry: candidate.industry.clone(),
            tags: candidate.tags.clone(),
            confidence: candidate.aggregate_confidence,
            source_name: origin.map(|e| e.source_name.clone()).unwrap_or_default(),
            source_url: origin.map(|e| e.source_url.clone()).unwrap_or_default(),
            enrichment_complete: false,
            created_at: now,
            last_seen_at: now,
        }
    }

    pub fn needs_enrichment(&self) -> bool {
        self.website.is_none() || self.founders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(name: &str) -> ExtractedCompany {
        ExtractedCompany {
            name: name.to_string(),
            description: None,
            website: None,
            funding_amount: Some("$5M".to_string()),
            funding_round: Some("Series A".to_string()),
            announced_at: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            founders: vec![],
            industry: None,
            tags: vec![],
            confidence: 0.9,
        }
    }

    fn evidence(source: &str) -> Evidence {
        Evidence {
            source_name: source.to_string(),
            source_url: format!("https://{source}.example.com/item"),
            extracted_at: Utc::now(),
            confidence: 0.8,
        }
    }

    #[test]
    fn candidate_starts_pending_with_one_evidence() {
        let c = CandidateRecord::from_extraction(&company("Acme Inc."), evidence("feed"), None, 0.4);
        assert_eq!(c.status, ValidationStatus::Pending);
        assert_eq!(c.evidence.len(), 1);
        assert_eq!(c.canonical_name, "acme");
    }

    #[test]
    fn initial_confidence_is_clamped() {
        let c = CandidateRecord::from_extraction(&company("Acme"), evidence("feed"), None, 1.7);
        assert_eq!(c.aggregate_confidence, 1.0);
    }

    #[test]
    fn distinct_sources_ignores_repeats() {
        let mut c =
            CandidateRecord::from_extraction(&company("Acme"), evidence("feed"), None, 0.4);
        c.evidence.push(evidence("feed"));
        c.evidence.push(evidence("forum"));
        assert_eq!(c.distinct_sources(), 2);
    }

    #[test]
    fn promotion_copy_carries_origin_source() {
        let c = CandidateRecord::from_extraction(&company("Acme"), evidence("forum"), None, 0.9);
        let canonical = CanonicalRecord::from_candidate(&c);
        assert_eq!(canonical.source_name, "forum");
        assert_eq!(canonical.canonical_name, "acme");
        assert!(!canonical.enrichment_complete);
    }

    #[test]
    fn high_trust_threshold() {
        let mut s = SourceDescriptor {
            name: "wire".to_string(),
            kind: SourceKind::Feed,
            endpoint: "https://wire.example.com/rss".to_string(),
            enabled: true,
            reliability: 0.95,
        };
        assert!(s.is_high_trust());
        s.reliability = 0.6;
        assert!(!s.is_high_trust());
    }
}
