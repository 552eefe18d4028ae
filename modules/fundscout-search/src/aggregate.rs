//! Merge, dedup, rank, and filter raw search hits into an ordered result list.

use chrono::{DateTime, Duration, Utc};
use fundscout_common::normalize_url;
use fundscout_fetch::SearchHit;

/// Hosts that reliably carry real funding coverage.
const QUALITY_DOMAINS: &[&str] = &[
    "techcrunch.com",
    "crunchbase.com",
    "venturebeat.com",
    "finsmes.com",
    "businesswire.com",
    "prnewswire.com",
    "forbes.com",
    "bloomberg.com",
    "reuters.com",
    "axios.com",
];

/// Vocabulary that marks a result as funding-related at all.
const FUNDING_KEYWORDS: &[&str] = &[
    "raise", "raises", "raised", "funding", "round", "seed", "series",
    "investment", "investor", "investors", "venture", "capital", "valuation",
    "million", "billion", "backed", "closes",
];

#[derive(Debug, Clone)]
pub struct RankedResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub published_at: Option<DateTime<Utc>>,
    pub relevance: f64,
}

/// Position-seeded base relevance plus recency, domain, and keyword boosts.
fn score_hit(hit: &SearchHit, position: usize, now: DateTime<Utc>) -> f64 {
    // Earlier positions start higher; floor keeps deep results comparable.
    let mut score = (0.5 - position as f64 * 0.02).max(0.1);

    if let Some(ts) = hit.published_at {
        let age = now - ts;
        if age < Duration::days(7) {
            score += 0.2;
        } else if age < Duration::days(30) {
            score += 0.1;
        }
    }

    if let Some(host) = url::Url::parse(&hit.url).ok().and_then(|u| u.host_str().map(str::to_string)) {
        let host = host.trim_start_matches("www.");
        if QUALITY_DOMAINS.iter().any(|d| host == *d || host.ends_with(&format!(".{d}"))) {
            score += 0.15;
        }
    }

    let title = hit.title.to_lowercase();
    let keyword_hits = FUNDING_KEYWORDS
        .iter()
        .filter(|k| title.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == **k))
        .count();
    score += keyword_hits as f64 * 0.05;

    score.min(1.0)
}

fn is_funding_related(hit: &SearchHit) -> bool {
    let text = format!("{} {}", hit.title, hit.snippet).to_lowercase();
    FUNDING_KEYWORDS.iter().any(|k| text.contains(*k))
}

/// Full aggregation pass: score positionally, drop non-funding results,
/// dedup by normalized URL keeping the higher-relevance copy, sort descending.
pub fn aggregate(hits: Vec<SearchHit>, now: DateTime<Utc>) -> Vec<RankedResult> {
    let mut by_url: Vec<RankedResult> = Vec::new();

    for (position, hit) in hits.iter().enumerate() {
        if !is_funding_related(hit) {
            continue;
        }
        let relevance = score_hit(hit, position, now);
        let key = normalize_url(&hit.url);

        match by_url.iter_mut().find(|r| normalize_url(&r.url) == key) {
            Some(existing) => {
                if relevance > existing.relevance {
                    existing.url = hit.url.clone();
                    existing.title = hit.title.clone();
                    existing.snippet = hit.snippet.clone();
                    existing.published_at = hit.published_at;
                    existing.relevance = relevance;
                }
            }
            None => by_url.push(RankedResult {
                url: hit.url.clone(),
                title: hit.title.clone(),
                snippet: hit.snippet.clone(),
                published_at: hit.published_at,
                relevance,
            }),
        }
    }

    by_url.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
    by_url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str, title: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: title.to_string(),
            snippet: "startup coverage".to_string(),
            published_at: None,
        }
    }

    #[test]
    fn non_funding_results_are_dropped() {
        let hits = vec![
            hit("https://a.example.com/1", "Acme raises $5M seed round"),
            hit("https://a.example.com/2", "Top 10 office chairs"),
        ];
        let ranked = aggregate(hits, Utc::now());
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].title.contains("Acme"));
    }

    #[test]
    fn url_variants_collapse_keeping_higher_relevance() {
        let hits = vec![
            hit("http://example.com/story/", "Acme funding news"),
            hit("https://www.example.com/story", "Acme raises $5M seed round"),
        ];
        let ranked = aggregate(hits, Utc::now());
        assert_eq!(ranked.len(), 1);
        // The keyword-richer duplicate wins despite its later position.
        assert!(ranked[0].title.contains("raises"));
    }

    #[test]
    fn quality_domain_and_keywords_dominate_a_bare_twin() {
        let now = Utc::now();
        let plain = hit("https://blog.example.com/a", "Startup investment news update");
        let strong = SearchHit {
            url: "https://techcrunch.com/a".to_string(),
            title: "Startup raises seed round funding".to_string(),
            ..plain.clone()
        };
        // Same position for both, scored independently.
        let s_plain = score_hit(&plain, 0, now);
        let s_strong = score_hit(&strong, 0, now);
        assert!(s_strong > s_plain);
    }

    #[test]
    fn recency_boosts_rank() {
        let now = Utc::now();
        let mut fresh = hit("https://a.example.com/fresh", "Acme raises funding");
        fresh.published_at = Some(now - Duration::days(2));
        let mut old = hit("https://a.example.com/old", "Acme raises funding");
        old.published_at = Some(now - Duration::days(200));

        let ranked = aggregate(vec![old, fresh], now);
        assert_eq!(ranked[0].url, "https://a.example.com/fresh");
    }

    #[test]
    fn relevance_is_capped() {
        let now = Utc::now();
        let h = SearchHit {
            url: "https://techcrunch.com/a".to_string(),
            title: "raises funding round seed series investment venture capital million backed"
                .to_string(),
            snippet: String::new(),
            published_at: Some(now),
        };
        assert!(score_hit(&h, 0, now) <= 1.0);
    }
}
