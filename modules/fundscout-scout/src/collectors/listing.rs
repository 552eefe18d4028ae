use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use fundscout_common::{RawItem, SourceDescriptor};
use fundscout_fetch::{extract_links_by_pattern, PageFetcher};

use crate::sources::listing_link_pattern;

use super::{Collector, ScrapeBatch};

/// Detail pages visited per run. Listing sites are slow-moving; a modest cap
/// keeps one run polite.
const MAX_DETAIL_PAGES: usize = 15;

/// Two-phase curated-listing harvester: scrape the list page for detail
/// links, then visit each detail page for industry/team/description facts.
pub struct ListingCollector {
    source: SourceDescriptor,
    fetcher: Arc<dyn PageFetcher>,
}

impl ListingCollector {
    pub fn new(source: SourceDescriptor, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { source, fetcher }
    }
}

#[async_trait]
impl Collector for ListingCollector {
    fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    async fn scrape(&self) -> Result<ScrapeBatch> {
        info!(source = self.source.name.as_str(), "Scraping curated listing");

        // Phase 1: the list page, raw — we need its structure for links.
        let list_html = self
            .fetcher
            .page_raw(&self.source.endpoint)
            .await
            .context("List page fetch failed")?;

        let pattern = listing_link_pattern(&self.source.endpoint);
        let links = extract_links_by_pattern(&list_html, &self.source.endpoint, pattern, MAX_DETAIL_PAGES);
        info!(
            source = self.source.name.as_str(),
            links = links.len(),
            "Detail links discovered"
        );

        // Phase 2: each detail page, sequentially, one session at a time.
        let mut batch = ScrapeBatch::default();
        for link in links {
            let content = match self.fetcher.page(&link).await {
                Ok(c) if !c.trim().is_empty() => c,
                Ok(_) => {
                    warn!(url = link.as_str(), "Empty detail page");
                    batch.errors += 1;
                    continue;
                }
                Err(e) => {
                    warn!(url = link.as_str(), error = %e, "Detail page fetch failed");
                    batch.errors += 1;
                    continue;
                }
            };

            batch.items.push(RawItem {
                text: content,
                published_at: None,
                source_url: link,
                source_name: self.source.name.clone(),
            });
            batch.processed += 1;
        }

        info!(
            source = self.source.name.as_str(),
            processed = batch.processed,
            errors = batch.errors,
            "Listing scrape complete"
        );
        Ok(batch)
    }
}
