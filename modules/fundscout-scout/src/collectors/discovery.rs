use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use fundscout_common::{RawItem, SourceDescriptor};
use fundscout_fetch::WebSearcher;

use super::{Collector, ScrapeBatch};

/// Fixed funding-intent templates expanded against the search engine.
/// Ambiguous by construction — everything found here goes to the pending
/// pool, never straight to canonical.
const INTENT_TEMPLATES: &[&str] = &[
    "\"announcing\" seed round startup",
    "startup raises seed funding this week",
    "series a funding announcement startup",
    "startup launch \"we raised\"",
    "pre-seed round closed announcement",
];

const RESULTS_PER_QUERY: usize = 10;

/// Search-engine discovery: each result snippet becomes a candidate text blob.
pub struct DiscoveryCollector {
    source: SourceDescriptor,
    searcher: Arc<dyn WebSearcher>,
}

impl DiscoveryCollector {
    pub fn new(source: SourceDescriptor, searcher: Arc<dyn WebSearcher>) -> Self {
        Self { source, searcher }
    }
}

#[async_trait]
impl Collector for DiscoveryCollector {
    fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    async fn scrape(&self) -> Result<ScrapeBatch> {
        info!(source = self.source.name.as_str(), "Running discovery queries");

        let mut batch = ScrapeBatch::default();
        let mut seen = std::collections::HashSet::new();

        for template in INTENT_TEMPLATES {
            let hits = match self.searcher.search(template, RESULTS_PER_QUERY).await {
                Ok(h) => h,
                Err(e) => {
                    warn!(query = template, error = %e, "Discovery query failed");
                    batch.errors += 1;
                    continue;
                }
            };

            for hit in hits {
                if !seen.insert(hit.url.clone()) {
                    continue;
                }

                let text = format!("{}\n\n{}", hit.title, hit.snippet).trim().to_string();
                if text.is_empty() {
                    continue;
                }

                batch.items.push(RawItem {
                    text,
                    published_at: hit.published_at,
                    source_url: hit.url,
                    source_name: self.source.name.clone(),
                });
                batch.processed += 1;
            }
        }

        info!(
            source = self.source.name.as_str(),
            processed = batch.processed,
            errors = batch.errors,
            "Discovery complete"
        );
        Ok(batch)
    }
}
