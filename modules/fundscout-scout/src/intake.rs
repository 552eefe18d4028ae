//! Candidate intake: cheap heuristic rejection, exact-match dedup against the
//! canonical store, then either direct promotion (high-trust sources) or a
//! pending-pool write for the confidence engine to arbitrate.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use fundscout_common::{
    is_null_amount, normalize_name, parse_funding_amount, CandidateRecord, CanonicalRecord,
    Evidence, ExtractedCompany, SourceDescriptor,
};
use fundscout_store::{InsertOutcome, RecordStore};

/// Confidence assigned to direct-promoted records from high-trust sources.
pub const DIRECT_PROMOTE_CONFIDENCE: f64 = 0.95;

/// Extractions naming more founders than this are extraction noise, not news.
const MAX_FOUNDERS: usize = 4;

/// Generic placeholders that mean the model failed to find a real name.
const PLACEHOLDER_NAMES: &[&str] = &[
    "startup",
    "company",
    "unknown",
    "stealth",
    "stealth startup",
    "the company",
    "a startup",
    "n/a",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingName,
    MissingAmount,
    NullAmount,
    TooManyFounders,
    PlaceholderName,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingName => write!(f, "missing name"),
            RejectReason::MissingAmount => write!(f, "missing funding amount"),
            RejectReason::NullAmount => write!(f, "null funding amount"),
            RejectReason::TooManyFounders => write!(f, "founder list too long"),
            RejectReason::PlaceholderName => write!(f, "placeholder name"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Written straight to the canonical store; needs enrichment enqueueing.
    Promoted(Uuid),
    /// Written to the pending pool.
    Queued(Uuid),
    /// Already known by exact name or source URL. Not an error.
    Duplicate,
    Rejected(RejectReason),
}

pub struct IntakeFilter {
    store: Arc<dyn RecordStore>,
}

impl IntakeFilter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Ordered heuristic checks, short-circuiting at the first failure.
    fn assess(company: &ExtractedCompany) -> Option<RejectReason> {
        if company.name.trim().is_empty() {
            return Some(RejectReason::MissingName);
        }
        let amount = match company.funding_amount.as_deref() {
            Some(a) => a,
            None => return Some(RejectReason::MissingAmount),
        };
        if is_null_amount(amount) {
            return Some(RejectReason::NullAmount);
        }
        if company.founders.len() > MAX_FOUNDERS {
            return Some(RejectReason::TooManyFounders);
        }
        let key = normalize_name(&company.name);
        if PLACEHOLDER_NAMES.iter().any(|p| normalize_name(p) == key) {
            return Some(RejectReason::PlaceholderName);
        }
        None
    }

    pub async fn process(
        &self,
        company: &ExtractedCompany,
        source: &SourceDescriptor,
        item_url: &str,
    ) -> Result<IntakeOutcome> {
        if let Some(reason) = Self::assess(company) {
            return Ok(IntakeOutcome::Rejected(reason));
        }

        // Exact-match dedup before any write. The uniqueness constraints
        // backstop the race between this check and the insert.
        if self
            .store
            .find_canonical_by_name_or_url(&company.name, item_url)
            .await?
            .is_some()
        {
            return Ok(IntakeOutcome::Duplicate);
        }

        let amount_usd = company.funding_amount.as_deref().and_then(parse_funding_amount);

        if source.is_high_trust() {
            let record = CanonicalRecord::from_extraction(
                company,
                &source.name,
                item_url,
                amount_usd,
                DIRECT_PROMOTE_CONFIDENCE,
            );
            return match self.store.insert_canonical(&record).await? {
                InsertOutcome::Inserted(id) => {
                    info!(
                        name = company.name.as_str(),
                        source = source.name.as_str(),
                        "Direct-promoted canonical record"
                    );
                    Ok(IntakeOutcome::Promoted(id))
                }
                InsertOutcome::Duplicate => {
                    warn!(name = company.name.as_str(), "Insert race resolved as duplicate");
                    Ok(IntakeOutcome::Duplicate)
                }
            };
        }

        // Low-trust path: pending pool, clamped initial confidence.
        let evidence = Evidence {
            source_name: source.name.clone(),
            source_url: item_url.to_string(),
            extracted_at: Utc::now(),
            confidence: source.reliability,
        };
        let candidate = CandidateRecord::from_extraction(
            company,
            evidence,
            amount_usd,
            source.reliability.clamp(0.3, 0.6),
        );
        let id = self.store.insert_candidate(&candidate).await?;
        info!(
            name = company.name.as_str(),
            source = source.name.as_str(),
            confidence = candidate.aggregate_confidence,
            "Queued candidate record"
        );
        Ok(IntakeOutcome::Queued(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fundscout_store::MemoryStore;

    fn company(name: &str, amount: Option<&str>) -> ExtractedCompany {
        ExtractedCompany {
            name: name.to_string(),
            description: Some("A company".to_string()),
            website: None,
            funding_amount: amount.map(str::to_string),
            funding_round: Some("Seed".to_string()),
            announced_at: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            founders: vec!["Dana Reyes".to_string()],
            industry: None,
            tags: vec![],
            confidence: 0.9,
        }
    }

    fn source(name: &str, reliability: f64) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            kind: fundscout_common::SourceKind::Feed,
            endpoint: "https://example.com/feed".to_string(),
            enabled: true,
            reliability,
        }
    }

    #[tokio::test]
    async fn heuristic_rejections_fire_in_order() {
        let store = Arc::new(MemoryStore::new());
        let intake = IntakeFilter::new(store);
        let src = source("feed", 0.95);

        let out = intake
            .process(&company("Acme", None), &src, "https://e.com/1")
            .await
            .unwrap();
        assert_eq!(out, IntakeOutcome::Rejected(RejectReason::MissingAmount));

        let out = intake
            .process(&company("Acme", Some("undisclosed")), &src, "https://e.com/1")
            .await
            .unwrap();
        assert_eq!(out, IntakeOutcome::Rejected(RejectReason::NullAmount));

        let mut noisy = company("Acme", Some("$5M"));
        noisy.founders = (0..6).map(|i| format!("Founder {i}")).collect();
        let out = intake.process(&noisy, &src, "https://e.com/1").await.unwrap();
        assert_eq!(out, IntakeOutcome::Rejected(RejectReason::TooManyFounders));

        let out = intake
            .process(&company("The Startup", Some("$5M")), &src, "https://e.com/1")
            .await
            .unwrap();
        assert_eq!(out, IntakeOutcome::Rejected(RejectReason::PlaceholderName));
    }

    #[tokio::test]
    async fn high_trust_direct_promotes_at_fixed_confidence() {
        let store = Arc::new(MemoryStore::new());
        let intake = IntakeFilter::new(store.clone());

        let out = intake
            .process(&company("Acme", Some("$5M")), &source("feed", 0.95), "https://e.com/1")
            .await
            .unwrap();
        assert!(matches!(out, IntakeOutcome::Promoted(_)));

        let records = store.canonical_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, DIRECT_PROMOTE_CONFIDENCE);
        assert_eq!(records[0].funding_amount_usd, Some(5_000_000));
    }

    #[tokio::test]
    async fn low_trust_queues_with_clamped_confidence() {
        let store = Arc::new(MemoryStore::new());
        let intake = IntakeFilter::new(store.clone());

        let out = intake
            .process(&company("Acme", Some("$5M")), &source("disco", 0.2), "https://e.com/1")
            .await
            .unwrap();
        assert!(matches!(out, IntakeOutcome::Queued(_)));

        let candidates = store.candidate_records();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].aggregate_confidence, 0.3);
        assert_eq!(candidates[0].evidence.len(), 1);
    }

    #[tokio::test]
    async fn repeat_submission_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let intake = IntakeFilter::new(store.clone());
        let src = source("feed", 0.95);
        let c = company("Acme", Some("$5M"));

        let first = intake.process(&c, &src, "https://e.com/1").await.unwrap();
        assert!(matches!(first, IntakeOutcome::Promoted(_)));

        let second = intake.process(&c, &src, "https://e.com/1").await.unwrap();
        assert_eq!(second, IntakeOutcome::Duplicate);
        assert_eq!(store.canonical_count(), 1);

        // Same URL under a different name is still a duplicate.
        let renamed = company("Acme Technologies", Some("$5M"));
        let third = intake.process(&renamed, &src, "https://e.com/1").await.unwrap();
        assert_eq!(third, IntakeOutcome::Duplicate);
    }
}
