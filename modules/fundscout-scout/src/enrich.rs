//! Enrichment queue: fills in missing websites and founder lists for newly
//! promoted records via targeted web searches.
//!
//! The queue drains strictly one record at a time, with a polite delay between
//! records. Concurrent enqueues never spawn a second drain task; a busy flag
//! guards the single consumer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fundscout_common::{extract_domain, name_similarity, CanonicalRecord};
use fundscout_extract::{CompanyExtractor, Extraction};
use fundscout_fetch::{SearchHit, WebSearcher};
use fundscout_store::RecordStore;

/// Domains that outrank a startup's own site in search results but are never
/// the site itself.
const AGGREGATOR_DOMAINS: &[&str] = &[
    "crunchbase.com",
    "linkedin.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "pitchbook.com",
    "techcrunch.com",
    "bloomberg.com",
    "wikipedia.org",
    "medium.com",
    "github.com",
];

struct QueueInner {
    pending: Mutex<VecDeque<Uuid>>,
    busy: AtomicBool,
    store: Arc<dyn RecordStore>,
    searcher: Arc<dyn WebSearcher>,
    extractor: Arc<dyn CompanyExtractor>,
    delay: Duration,
}

#[derive(Clone)]
pub struct EnrichmentQueue {
    inner: Arc<QueueInner>,
}

impl EnrichmentQueue {
    pub fn new(
        store: Arc<dyn RecordStore>,
        searcher: Arc<dyn WebSearcher>,
        extractor: Arc<dyn CompanyExtractor>,
        delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(VecDeque::new()),
                busy: AtomicBool::new(false),
                store,
                searcher,
                extractor,
                delay,
            }),
        }
    }

    /// Add a record id to the queue and start the drain task if one is not
    /// already running.
    pub fn enqueue(&self, id: Uuid) {
        self.inner.pending.lock().unwrap().push_back(id);
        self.maybe_spawn_drain();
    }

    fn maybe_spawn_drain(&self) {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let queue = self.clone();
            tokio::spawn(async move {
                queue.drain().await;
            });
        }
    }

    async fn drain(&self) {
        loop {
            let next = self.inner.pending.lock().unwrap().pop_front();
            let Some(id) = next else {
                self.inner.busy.store(false, Ordering::Release);
                // An enqueue may have slipped in between the pop and the
                // flag clear; reclaim the flag and keep going if so.
                let refill = !self.inner.pending.lock().unwrap().is_empty();
                if refill
                    && self
                        .inner
                        .busy
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                {
                    continue;
                }
                return;
            };

            if let Err(err) = self.process(id).await {
                warn!(%id, error = %err, "Enrichment failed, leaving record incomplete");
            }
            tokio::time::sleep(self.inner.delay).await;
        }
    }

    /// Wait until the queue is empty and the drain task has parked. Polling
    /// keeps this usable from a short-lived CLI process.
    pub async fn idle_wait(&self, poll: Duration) {
        loop {
            let empty = self.inner.pending.lock().unwrap().is_empty();
            if empty && !self.inner.busy.load(Ordering::Acquire) {
                return;
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn process(&self, id: Uuid) -> Result<()> {
        let Some(record) = self.inner.store.get_canonical(id).await? else {
            debug!(%id, "Record vanished before enrichment");
            return Ok(());
        };
        if !record.needs_enrichment() {
            debug!(name = record.name.as_str(), "Already enriched, skipping");
            return Ok(());
        }

        let mut website = record.website.clone();
        if website.is_none() {
            website = self.find_website(&record).await?;
        }

        let mut founders = record.founders.clone();
        if founders.is_empty() {
            founders = self.find_founders(&record).await?;
        }

        let complete = website.is_some() && !founders.is_empty();
        self.inner
            .store
            .update_canonical_enrichment(id, website.clone(), founders.clone(), complete)
            .await?;
        info!(
            name = record.name.as_str(),
            website = website.as_deref().unwrap_or("-"),
            founders = founders.len(),
            complete,
            "Enrichment pass finished"
        );
        Ok(())
    }

    /// First non-aggregator hit for an official-website query.
    async fn find_website(&self, record: &CanonicalRecord) -> Result<Option<String>> {
        let query = format!("{} official website", record.name);
        let hits = self.inner.searcher.search(&query, 5).await?;
        for hit in hits {
            let domain = extract_domain(&hit.url);
            if domain.is_empty() || AGGREGATOR_DOMAINS.iter().any(|agg| domain.ends_with(agg)) {
                continue;
            }
            return Ok(Some(hit.url));
        }
        Ok(None)
    }

    /// Run founder queries through the extractor and keep founders from
    /// extractions that name a matching company.
    async fn find_founders(&self, record: &CanonicalRecord) -> Result<Vec<String>> {
        let queries = [
            format!("{} founders", record.name),
            format!("{} founder CEO startup", record.name),
        ];
        for query in &queries {
            let hits = self.inner.searcher.search(query, 5).await?;
            if hits.is_empty() {
                continue;
            }
            let blob = snippet_blob(&hits);
            if let Extraction::Valid(company) = self.inner.extractor.extract(&blob, None).await {
                if !company.founders.is_empty()
                    && name_similarity(&company.name, &record.name) >= 0.85
                {
                    return Ok(company.founders);
                }
            }
        }
        Ok(Vec::new())
    }
}

fn snippet_blob(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("{}\n{}", h.title, h.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fundscout_common::ExtractedCompany;
    use fundscout_store::{InsertOutcome, MemoryStore};

    use crate::testing::{MockExtractor, RecordingSearcher};

    fn record(name: &str, website: Option<&str>) -> CanonicalRecord {
        let company = ExtractedCompany {
            name: name.to_string(),
            description: None,
            website: website.map(str::to_string),
            funding_amount: Some("$5M".to_string()),
            funding_round: Some("Seed".to_string()),
            announced_at: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            founders: vec![],
            industry: None,
            tags: vec![],
            confidence: 0.9,
        };
        // Each fixture gets its own source URL so repeated inserts do not
        // trip the uniqueness constraint.
        let slug = name.to_lowercase().replace(' ', "-");
        let source_url = format!("https://news.example.com/{slug}");
        CanonicalRecord::from_extraction(&company, "feed", &source_url, None, 0.95)
    }

    fn hit(url: &str, title: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: title.to_string(),
            snippet: String::new(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn website_search_skips_aggregators() {
        let store = Arc::new(MemoryStore::new());
        let r = record("Acme", None);
        store.insert_canonical(&r).await.unwrap();

        let searcher = Arc::new(RecordingSearcher::with_hits(vec![
            hit("https://www.crunchbase.com/organization/acme", "Acme - Crunchbase"),
            hit("https://www.linkedin.com/company/acme", "Acme | LinkedIn"),
            hit("https://acme.io", "Acme"),
        ]));
        let extractor = Arc::new(MockExtractor::invalid("no founders here"));
        let queue = EnrichmentQueue::new(store.clone(), searcher, extractor, Duration::from_millis(1));

        queue.enqueue(r.id);
        queue.idle_wait(Duration::from_millis(5)).await;

        let updated = store.get_canonical(r.id).await.unwrap().unwrap();
        assert_eq!(updated.website.as_deref(), Some("https://acme.io"));
        // No founders found, so the record stays incomplete.
        assert!(!updated.enrichment_complete);
    }

    #[tokio::test]
    async fn founders_require_a_matching_company_name() {
        let store = Arc::new(MemoryStore::new());
        let mut r = record("Acme", Some("https://acme.io"));
        r.founders.clear();
        store.insert_canonical(&r).await.unwrap();

        let searcher =
            Arc::new(RecordingSearcher::with_hits(vec![hit("https://a.example.com", "Acme raises")]));
        let extractor = Arc::new(MockExtractor::valid_named(
            "Zenith Labs",
            vec!["Pat Quinn".to_string()],
        ));
        let queue =
            EnrichmentQueue::new(store.clone(), searcher, extractor, Duration::from_millis(1));

        queue.enqueue(r.id);
        queue.idle_wait(Duration::from_millis(5)).await;

        let updated = store.get_canonical(r.id).await.unwrap().unwrap();
        assert!(updated.founders.is_empty());
        assert!(!updated.enrichment_complete);
    }

    #[tokio::test]
    async fn queue_drains_one_record_at_a_time() {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for i in 0..4 {
            let r = record(&format!("Startup {i}"), None);
            ids.push(r.id);
            let outcome = store.insert_canonical(&r).await.unwrap();
            assert!(matches!(outcome, InsertOutcome::Inserted(_)));
        }

        let searcher = Arc::new(RecordingSearcher::with_hits(vec![hit(
            "https://startup.example.com",
            "Startup",
        )]));
        let extractor = Arc::new(MockExtractor::invalid("nothing"));
        let queue = EnrichmentQueue::new(
            store.clone(),
            searcher.clone(),
            extractor,
            Duration::from_millis(1),
        );

        for id in &ids {
            queue.enqueue(*id);
        }
        queue.idle_wait(Duration::from_millis(5)).await;

        assert_eq!(searcher.max_concurrent(), 1);
        for id in ids {
            let updated = store.get_canonical(id).await.unwrap().unwrap();
            assert!(updated.website.is_some());
        }
    }

    #[tokio::test]
    async fn enqueue_after_drain_parks_resumes() {
        let store = Arc::new(MemoryStore::new());
        let searcher = Arc::new(RecordingSearcher::with_hits(vec![hit(
            "https://startup.example.com",
            "Startup",
        )]));
        let extractor = Arc::new(MockExtractor::invalid("nothing"));
        let queue = EnrichmentQueue::new(
            store.clone(),
            searcher,
            extractor,
            Duration::from_millis(1),
        );

        let a = record("First Co", None);
        store.insert_canonical(&a).await.unwrap();
        queue.enqueue(a.id);
        queue.idle_wait(Duration::from_millis(5)).await;

        let b = record("Second Co", None);
        let outcome = store.insert_canonical(&b).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));
        queue.enqueue(b.id);
        queue.idle_wait(Duration::from_millis(5)).await;

        let updated = store.get_canonical(b.id).await.unwrap().unwrap();
        assert!(updated.website.is_some());
    }
}
