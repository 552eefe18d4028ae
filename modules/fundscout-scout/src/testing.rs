//! In-memory doubles for pipeline tests. No network, no API keys.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use fundscout_common::{ExtractedCompany, RawItem, SourceDescriptor};
use fundscout_extract::{CompanyExtractor, Extraction};
use fundscout_fetch::{PageFetcher, SearchHit, WebSearcher};

use crate::collectors::{Collector, ScrapeBatch};

/// Canned page fetcher keyed by URL. Unknown URLs error like a 404 would.
#[derive(Default)]
pub struct StubFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, body: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), body.to_string());
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn page(&self, url: &str) -> Result<String> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no stub page for {url}"))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Canned searcher returning the same hits for every query.
#[derive(Default)]
pub struct StubSearcher {
    hits: Vec<SearchHit>,
}

impl StubSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl WebSearcher for StubSearcher {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Searcher that records every query and tracks how many calls overlap, for
/// asserting sequential-drain behavior.
#[derive(Default)]
pub struct RecordingSearcher {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSearcher {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, ..Default::default() }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }
}

#[async_trait]
impl WebSearcher for RecordingSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(current, Ordering::AcqRel);
        self.queries.lock().unwrap().push(query.to_string());
        // Long enough for a second in-flight call to be observed if one exists.
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Extractor with a fixed verdict for every input.
pub struct MockExtractor {
    verdict: Extraction,
}

impl MockExtractor {
    /// Always yields a valid funding event for the given company.
    pub fn valid_named(name: &str, founders: Vec<String>) -> Self {
        Self {
            verdict: Extraction::Valid(ExtractedCompany {
                name: name.to_string(),
                description: Some("A startup".to_string()),
                website: None,
                funding_amount: Some("$5M".to_string()),
                funding_round: Some("Seed".to_string()),
                announced_at: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                founders,
                industry: None,
                tags: vec![],
                confidence: 0.9,
            }),
        }
    }

    pub fn valid(company: ExtractedCompany) -> Self {
        Self { verdict: Extraction::Valid(company) }
    }

    pub fn invalid(reason: &str) -> Self {
        Self { verdict: Extraction::Invalid { reason: reason.to_string() } }
    }
}

#[async_trait]
impl CompanyExtractor for MockExtractor {
    async fn extract(&self, _text: &str, _date_hint: Option<NaiveDate>) -> Extraction {
        self.verdict.clone()
    }
}

/// Collector yielding a fixed batch, or a fixed error.
pub struct MockCollector {
    source: SourceDescriptor,
    outcome: std::result::Result<Vec<RawItem>, String>,
}

impl MockCollector {
    pub fn new(source: SourceDescriptor, items: Vec<RawItem>) -> Self {
        Self { source, outcome: Ok(items) }
    }

    pub fn failing(source: SourceDescriptor, message: &str) -> Self {
        Self { source, outcome: Err(message.to_string()) }
    }
}

#[async_trait]
impl Collector for MockCollector {
    fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    async fn scrape(&self) -> Result<ScrapeBatch> {
        match &self.outcome {
            Ok(items) => Ok(ScrapeBatch {
                processed: items.len() as u32,
                errors: 0,
                items: items.clone(),
            }),
            Err(message) => Err(anyhow!("{message}")),
        }
    }
}
