//! Turn ranked search results into deduplicated company extractions.

use std::sync::Arc;

use tracing::{debug, warn};

use fundscout_common::{normalize_name, ExtractedCompany};
use fundscout_extract::{CompanyExtractor, Extraction};
use fundscout_fetch::PageFetcher;

use crate::aggregate::RankedResult;

/// Extra URLs crawled in full when snippet extraction leaves the cap unmet.
const MAX_CRAWL_SUPPLEMENTS: usize = 3;

/// Extract companies from ranked results, snippet-first, crawling a bounded
/// number of leftover pages if the tier cap is not reached.
pub async fn extract_companies(
    results: &[RankedResult],
    extractor: &Arc<dyn CompanyExtractor>,
    fetcher: &Arc<dyn PageFetcher>,
    max_companies: usize,
) -> Vec<ExtractedCompany> {
    let mut companies: Vec<ExtractedCompany> = Vec::new();
    let mut leftovers: Vec<&RankedResult> = Vec::new();

    // Snippet pass over the top ranked results, one slot per result. Results
    // whose snippet yields nothing stay eligible for the crawl pass below.
    for result in results.iter().take(max_companies) {
        let blob = format!("{}\n{}", result.title, result.snippet);
        let hint = result.published_at.map(|ts| ts.date_naive());
        match extractor.extract(&blob, hint).await {
            Extraction::Valid(mut company) => {
                if company.website.is_none() {
                    company.website = Some(result.url.clone());
                }
                companies.push(company);
            }
            Extraction::Invalid { .. } => leftovers.push(result),
        }
    }
    leftovers.extend(results.iter().skip(max_companies));

    // Crawl pass: fetch full page text for results the snippets said nothing
    // about, bounded so one thin query cannot fan out into a crawl job.
    let mut crawled = 0usize;
    for result in leftovers {
        if companies.len() >= max_companies || crawled >= MAX_CRAWL_SUPPLEMENTS {
            break;
        }
        crawled += 1;
        let text = match fetcher.page(&result.url).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => continue,
            Err(err) => {
                debug!(url = result.url.as_str(), error = %err, "Crawl supplement failed");
                continue;
            }
        };
        let hint = result.published_at.map(|ts| ts.date_naive());
        if let Extraction::Valid(mut company) = extractor.extract(&text, hint).await {
            if company.website.is_none() {
                company.website = Some(result.url.clone());
            }
            companies.push(company);
        }
    }

    dedup_companies(companies)
}

/// Collapse same-entity extractions by normalized name. The higher-confidence
/// instance wins; whatever it lacks backfills from the loser.
pub fn dedup_companies(companies: Vec<ExtractedCompany>) -> Vec<ExtractedCompany> {
    let mut deduped: Vec<ExtractedCompany> = Vec::new();

    for company in companies {
        let key = normalize_name(&company.name);
        match deduped.iter_mut().find(|c| normalize_name(&c.name) == key) {
            Some(existing) => {
                let (mut winner, loser) = if company.confidence > existing.confidence {
                    (company, existing.clone())
                } else {
                    (existing.clone(), company)
                };
                backfill(&mut winner, &loser);
                *existing = winner;
            }
            None => deduped.push(company),
        }
    }

    if deduped.is_empty() {
        warn!("Company extraction yielded nothing after dedup");
    }
    deduped
}

fn backfill(winner: &mut ExtractedCompany, loser: &ExtractedCompany) {
    if winner.description.is_none() {
        winner.description = loser.description.clone();
    }
    if winner.website.is_none() {
        winner.website = loser.website.clone();
    }
    if winner.funding_amount.is_none() {
        winner.funding_amount = loser.funding_amount.clone();
    }
    if winner.funding_round.is_none() {
        winner.funding_round = loser.funding_round.clone();
    }
    if winner.industry.is_none() {
        winner.industry = loser.industry.clone();
    }
    if winner.founders.is_empty() {
        winner.founders = loser.founders.clone();
    }
    for tag in &loser.tags {
        if !winner.tags.contains(tag) {
            winner.tags.push(tag.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn company(name: &str, confidence: f64) -> ExtractedCompany {
        ExtractedCompany {
            name: name.to_string(),
            description: None,
            website: None,
            funding_amount: Some("$5M".to_string()),
            funding_round: None,
            announced_at: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            founders: vec![],
            industry: None,
            tags: vec![],
            confidence,
        }
    }

    #[test]
    fn name_variants_collapse_to_the_higher_confidence_instance() {
        let mut a = company("Acme Inc.", 0.6);
        a.website = Some("https://acme.io".to_string());
        let mut b = company("The Acme", 0.9);
        b.founders = vec!["Dana Reyes".to_string()];

        let deduped = dedup_companies(vec![a, b]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].name, "The Acme");
        assert_eq!(deduped[0].confidence, 0.9);
        // Winner keeps its founders and backfills the website it lacked.
        assert_eq!(deduped[0].website.as_deref(), Some("https://acme.io"));
        assert_eq!(deduped[0].founders, vec!["Dana Reyes".to_string()]);
    }

    #[test]
    fn distinct_companies_survive() {
        let deduped = dedup_companies(vec![company("Acme", 0.8), company("Zenith", 0.7)]);
        assert_eq!(deduped.len(), 2);
    }

    /// Valid only on fetched article text, never on a search snippet.
    struct ArticleOnlyExtractor;

    #[async_trait]
    impl CompanyExtractor for ArticleOnlyExtractor {
        async fn extract(&self, text: &str, _date_hint: Option<NaiveDate>) -> Extraction {
            match text.strip_prefix("Article: ") {
                Some(rest) => {
                    let name = rest.split_whitespace().next().unwrap_or("Unknown");
                    Extraction::Valid(company(name, 0.8))
                }
                None => Extraction::Invalid { reason: "no funding details".to_string() },
            }
        }
    }

    struct ArticleFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for ArticleFetcher {
        async fn page(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let slug = url.rsplit('/').next().unwrap_or("unknown");
            Ok(format!("Article: {slug} raised a seed round."))
        }

        fn name(&self) -> &str {
            "article"
        }
    }

    fn ranked(url: &str) -> RankedResult {
        RankedResult {
            url: url.to_string(),
            title: "Weekly funding roundup".to_string(),
            snippet: "Several startups announced rounds this week.".to_string(),
            published_at: None,
            relevance: 0.5,
        }
    }

    #[tokio::test]
    async fn thin_snippets_fall_through_to_page_crawls() {
        let results = vec![
            ranked("https://news.example.com/alpha"),
            ranked("https://news.example.com/beta"),
            ranked("https://news.example.com/gamma"),
            ranked("https://news.example.com/delta"),
        ];
        let extractor: Arc<dyn CompanyExtractor> = Arc::new(ArticleOnlyExtractor);
        let fetcher = Arc::new(ArticleFetcher { calls: AtomicUsize::new(0) });
        let fetcher_dyn: Arc<dyn PageFetcher> = fetcher.clone();

        let companies = extract_companies(&results, &extractor, &fetcher_dyn, 2).await;

        // Snippets carried no names, so the cap fills from fetched pages.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        let names: Vec<&str> = companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn crawl_volume_stays_bounded() {
        let results: Vec<RankedResult> = (0..10)
            .map(|i| ranked(&format!("https://news.example.com/item-{i}")))
            .collect();
        let extractor: Arc<dyn CompanyExtractor> = Arc::new(ArticleOnlyExtractor);
        let fetcher = Arc::new(ArticleFetcher { calls: AtomicUsize::new(0) });
        let fetcher_dyn: Arc<dyn PageFetcher> = fetcher.clone();

        let companies = extract_companies(&results, &extractor, &fetcher_dyn, 8).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), MAX_CRAWL_SUPPLEMENTS);
        assert_eq!(companies.len(), MAX_CRAWL_SUPPLEMENTS);
    }
}
