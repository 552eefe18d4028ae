// In-memory RecordStore for deterministic pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use fundscout_common::{CandidateRecord, CanonicalRecord, ValidationStatus};

use crate::{InsertOutcome, RecordStore};

#[derive(Default)]
struct Inner {
    canonical: HashMap<Uuid, CanonicalRecord>,
    candidates: HashMap<Uuid, CandidateRecord>,
}

/// Stateful in-memory store enforcing the same (name, source_url) uniqueness
/// as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical_count(&self) -> usize {
        self.inner.lock().unwrap().canonical.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.inner.lock().unwrap().candidates.len()
    }

    pub fn canonical_records(&self) -> Vec<CanonicalRecord> {
        self.inner.lock().unwrap().canonical.values().cloned().collect()
    }

    pub fn candidate_records(&self) -> Vec<CandidateRecord> {
        self.inner.lock().unwrap().candidates.values().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_canonical_by_name_or_url(
        &self,
        name: &str,
        source_url: &str,
    ) -> Result<Option<CanonicalRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .canonical
            .values()
            .find(|r| r.name == name || r.source_url == source_url)
            .cloned())
    }

    async fn insert_canonical(&self, record: &CanonicalRecord) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock().unwrap();
        let collides = inner
            .canonical
            .values()
            .any(|r| r.name == record.name || r.source_url == record.source_url);
        if collides {
            return Ok(InsertOutcome::Duplicate);
        }
        inner.canonical.insert(record.id, record.clone());
        Ok(InsertOutcome::Inserted(record.id))
    }

    async fn get_canonical(&self, id: Uuid) -> Result<Option<CanonicalRecord>> {
        Ok(self.inner.lock().unwrap().canonical.get(&id).cloned())
    }

    async fn update_canonical_enrichment(
        &self,
        id: Uuid,
        website: Option<String>,
        founders: Vec<String>,
        enrichment_complete: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.canonical.get_mut(&id) {
            if website.is_some() {
                record.website = website;
            }
            if !founders.is_empty() {
                record.founders = founders;
            }
            record.enrichment_complete = enrichment_complete;
            record.last_seen_at = Utc::now();
        }
        Ok(())
    }

    async fn list_revalidation_due(&self, now: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .canonical
            .values()
            .filter(|r| now - r.last_seen_at > Duration::days(90) && r.confidence < 0.7)
            .cloned()
            .collect())
    }

    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        inner.candidates.insert(record.id, record.clone());
        Ok(record.id)
    }

    async fn list_pending(&self) -> Result<Vec<CandidateRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<CandidateRecord> = inner
            .candidates
            .values()
            .filter(|c| c.status == ValidationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.created_at);
        Ok(pending)
    }

    async fn update_candidate(&self, record: &CandidateRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.candidates.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.candidates.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fundscout_common::ExtractedCompany;

    fn record(name: &str, url: &str) -> CanonicalRecord {
        let company = ExtractedCompany {
            name: name.to_string(),
            description: None,
            website: None,
            funding_amount: Some("$5M".to_string()),
            funding_round: None,
            announced_at: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            founders: vec![],
            industry: None,
            tags: vec![],
            confidence: 0.9,
        };
        CanonicalRecord::from_extraction(&company, "feed", url, Some(5_000_000), 0.95)
    }

    #[tokio::test]
    async fn duplicate_name_insert_is_rejected() {
        let store = MemoryStore::new();
        let a = record("Acme", "https://a.example.com/1");
        let b = record("Acme", "https://b.example.com/2");

        assert!(matches!(
            store.insert_canonical(&a).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert_eq!(
            store.insert_canonical(&b).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(store.canonical_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_url_insert_is_rejected() {
        let store = MemoryStore::new();
        let a = record("Acme", "https://a.example.com/1");
        let b = record("Zenith", "https://a.example.com/1");

        store.insert_canonical(&a).await.unwrap();
        assert_eq!(
            store.insert_canonical(&b).await.unwrap(),
            InsertOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn revalidation_due_filters_on_age_and_confidence() {
        let store = MemoryStore::new();
        let mut stale = record("Stale", "https://a.example.com/1");
        stale.confidence = 0.5;
        stale.last_seen_at = Utc::now() - Duration::days(120);
        let mut fresh = record("Fresh", "https://a.example.com/2");
        fresh.confidence = 0.5;
        let mut trusted = record("Trusted", "https://a.example.com/3");
        trusted.confidence = 0.9;
        trusted.last_seen_at = Utc::now() - Duration::days(120);

        for r in [&stale, &fresh, &trusted] {
            store.insert_canonical(r).await.unwrap();
        }

        let due = store.list_revalidation_due(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Stale");
    }
}
