//! On-demand search path: expand a query into funding-intent variants, fan
//! out across the tier's sources concurrently, then aggregate, extract, and
//! paginate. Independent of the collection pipeline except for the shared
//! extraction capability.

pub mod aggregate;
pub mod companies;
pub mod tiers;

pub use aggregate::RankedResult;
pub use tiers::SearchTier;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};

use fundscout_common::ExtractedCompany;
use fundscout_extract::CompanyExtractor;
use fundscout_fetch::{PageFetcher, SearchHit, WebSearcher};

/// Per-call ceiling; one slow source forfeits only its own results.
const CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Results requested from each source per variant.
const RESULTS_PER_CALL: usize = 10;

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub companies: Vec<ExtractedCompany>,
    pub page: usize,
    pub total_pages: usize,
    pub total_companies: usize,
    /// Ranked results that survived filtering, before the company cap.
    pub results_considered: usize,
    /// "source/variant" labels for calls that errored or timed out.
    pub failed_sources: Vec<String>,
}

/// Fixed funding-intent templates. The tier's variant cap takes a prefix.
fn expand_variants(query: &str, max_variants: usize) -> Vec<String> {
    let variants = vec![
        query.to_string(),
        format!("\"{query}\" funding round"),
        format!("{query} raises seed round"),
        format!("{query} series A announcement"),
        format!("{query} site:techcrunch.com"),
        format!("{query} site:crunchbase.com"),
    ];
    variants.into_iter().take(max_variants.max(1)).collect()
}

pub struct SearchOrchestrator {
    searchers: HashMap<String, Arc<dyn WebSearcher>>,
    extractor: Arc<dyn CompanyExtractor>,
    fetcher: Arc<dyn PageFetcher>,
    call_timeout: Duration,
}

impl SearchOrchestrator {
    pub fn new(
        searchers: HashMap<String, Arc<dyn WebSearcher>>,
        extractor: Arc<dyn CompanyExtractor>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            searchers,
            extractor,
            fetcher,
            call_timeout: CALL_TIMEOUT,
        }
    }

    /// Shrink the per-call timeout, for tests that simulate slow sources.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn search(
        &self,
        query: &str,
        tier: &SearchTier,
        page: usize,
    ) -> Result<SearchOutcome> {
        let variants = expand_variants(query, tier.max_variants);
        info!(
            query,
            tier = tier.name,
            variants = variants.len(),
            sources = tier.sources.len(),
            "Search fan-out"
        );

        // Settle-all fan-out: every (source, variant) call resolves to either
        // hits or a recorded failure label; nothing shared is written here.
        let mut calls = FuturesUnordered::new();
        for source_name in &tier.sources {
            let Some(searcher) = self.searchers.get(source_name) else {
                warn!(source = source_name.as_str(), "Tier names an unregistered source");
                continue;
            };
            for variant in &variants {
                let searcher = searcher.clone();
                let label = format!("{source_name}/{variant}");
                let variant = variant.clone();
                let timeout = self.call_timeout;
                calls.push(async move {
                    let outcome =
                        tokio::time::timeout(timeout, searcher.search(&variant, RESULTS_PER_CALL))
                            .await;
                    match outcome {
                        Ok(Ok(hits)) => Ok(hits),
                        Ok(Err(err)) => Err((label, err.to_string())),
                        Err(_) => Err((label, "timed out".to_string())),
                    }
                });
            }
        }

        let mut all_hits: Vec<SearchHit> = Vec::new();
        let mut failed_sources: Vec<String> = Vec::new();
        while let Some(outcome) = calls.next().await {
            match outcome {
                Ok(hits) => all_hits.extend(hits),
                Err((label, reason)) => {
                    warn!(call = label.as_str(), reason = reason.as_str(), "Search call failed");
                    failed_sources.push(label);
                }
            }
        }

        let ranked = aggregate::aggregate(all_hits, Utc::now());
        let results_considered = ranked.len();

        let extracted = companies::extract_companies(
            &ranked,
            &self.extractor,
            &self.fetcher,
            tier.max_companies,
        )
        .await;

        let total_companies = extracted.len();
        let total_pages = total_companies
            .div_ceil(tier.page_size)
            .min(tier.max_pages)
            .max(if total_companies > 0 { 1 } else { 0 });
        let page = page.max(1);
        let start = (page - 1) * tier.page_size;
        let page_companies: Vec<ExtractedCompany> = extracted
            .into_iter()
            .skip(start)
            .take(tier.page_size)
            .collect();

        info!(
            query,
            results_considered,
            total_companies,
            failed = failed_sources.len(),
            "Search complete"
        );

        Ok(SearchOutcome {
            companies: page_companies,
            page,
            total_pages,
            total_companies,
            results_considered,
            failed_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use fundscout_extract::Extraction;

    struct FixedSearcher {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl WebSearcher for FixedSearcher {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct HangingSearcher;

    #[async_trait]
    impl WebSearcher for HangingSearcher {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    struct FailingSearcher;

    #[async_trait]
    impl WebSearcher for FailingSearcher {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
            anyhow::bail!("upstream 500")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct TitleExtractor;

    #[async_trait]
    impl CompanyExtractor for TitleExtractor {
        async fn extract(&self, text: &str, _date_hint: Option<NaiveDate>) -> Extraction {
            // First word of the blob stands in for the company name.
            let name = text.split_whitespace().next().unwrap_or("").to_string();
            if name.is_empty() {
                return Extraction::Invalid { reason: "empty".to_string() };
            }
            Extraction::Valid(ExtractedCompany {
                name,
                description: None,
                website: None,
                funding_amount: Some("$5M".to_string()),
                funding_round: Some("Seed".to_string()),
                announced_at: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                founders: vec![],
                industry: None,
                tags: vec![],
                confidence: 0.8,
            })
        }
    }

    struct EmptyFetcher;

    #[async_trait]
    impl PageFetcher for EmptyFetcher {
        async fn page(&self, _url: &str) -> Result<String> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    fn hit(url: &str, title: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: title.to_string(),
            snippet: "funding coverage".to_string(),
            published_at: None,
        }
    }

    fn orchestrator(
        searchers: Vec<(&str, Arc<dyn WebSearcher>)>,
    ) -> SearchOrchestrator {
        let map: HashMap<String, Arc<dyn WebSearcher>> = searchers
            .into_iter()
            .map(|(name, s)| (name.to_string(), s))
            .collect();
        SearchOrchestrator::new(map, Arc::new(TitleExtractor), Arc::new(EmptyFetcher))
    }

    fn three_source_tier() -> SearchTier {
        SearchTier {
            name: "test",
            sources: vec!["a".to_string(), "b".to_string(), "slow".to_string()],
            max_variants: 1,
            max_companies: 10,
            page_size: 5,
            max_pages: 2,
        }
    }

    #[tokio::test]
    async fn timed_out_source_fails_alone() {
        let orch = orchestrator(vec![
            (
                "a",
                Arc::new(FixedSearcher {
                    hits: vec![hit("https://a.example.com/1", "Acme raises $5M seed")],
                }) as Arc<dyn WebSearcher>,
            ),
            (
                "b",
                Arc::new(FixedSearcher {
                    hits: vec![hit("https://b.example.com/1", "Zenith funding round closes")],
                }),
            ),
            ("slow", Arc::new(HangingSearcher)),
        ])
        .with_call_timeout(Duration::from_millis(20));

        let outcome = orch.search("startups", &three_source_tier(), 1).await.unwrap();

        assert_eq!(outcome.results_considered, 2);
        assert_eq!(outcome.companies.len(), 2);
        assert_eq!(outcome.failed_sources.len(), 1);
        assert!(outcome.failed_sources[0].starts_with("slow/"));
    }

    #[tokio::test]
    async fn erroring_source_is_recorded_not_fatal() {
        let mut tier = three_source_tier();
        tier.sources = vec!["a".to_string(), "bad".to_string()];
        let orch = orchestrator(vec![
            (
                "a",
                Arc::new(FixedSearcher {
                    hits: vec![hit("https://a.example.com/1", "Acme raises $5M seed")],
                }) as Arc<dyn WebSearcher>,
            ),
            ("bad", Arc::new(FailingSearcher)),
        ]);

        let outcome = orch.search("startups", &tier, 1).await.unwrap();
        assert_eq!(outcome.companies.len(), 1);
        assert_eq!(outcome.failed_sources.len(), 1);
    }

    #[tokio::test]
    async fn pagination_slices_by_tier_page_size() {
        let hits: Vec<SearchHit> = (0..8)
            .map(|i| hit(&format!("https://a.example.com/{i}"), &format!("Co{i} raises funding")))
            .collect();
        let mut tier = three_source_tier();
        tier.sources = vec!["a".to_string()];
        tier.page_size = 3;
        tier.max_pages = 2;

        let orch = orchestrator(vec![(
            "a",
            Arc::new(FixedSearcher { hits }) as Arc<dyn WebSearcher>,
        )]);

        let first = orch.search("startups", &tier, 1).await.unwrap();
        assert_eq!(first.total_companies, 8);
        assert_eq!(first.companies.len(), 3);
        // ceil(8/3) = 3 pages, capped at the tier's 2.
        assert_eq!(first.total_pages, 2);

        let second = orch.search("startups", &tier, 2).await.unwrap();
        assert_eq!(second.companies.len(), 3);
        assert_ne!(first.companies[0].name, second.companies[0].name);
    }

    #[tokio::test]
    async fn variant_expansion_respects_the_cap() {
        let variants = expand_variants("acme", 3);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0], "acme");
        assert!(expand_variants("acme", 0).len() == 1);
    }
}
