use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use fundscout_common::{RawItem, SourceDescriptor};

use super::{Collector, ScrapeBatch};

/// Entries taken from the top of a feed per poll.
const MAX_ENTRIES: usize = 20;

/// Polls an RSS/Atom feed and combines each entry's title and body into one
/// text blob.
pub struct FeedCollector {
    source: SourceDescriptor,
    client: reqwest::Client,
}

impl FeedCollector {
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl Collector for FeedCollector {
    fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    async fn scrape(&self) -> Result<ScrapeBatch> {
        info!(source = self.source.name.as_str(), endpoint = self.source.endpoint.as_str(), "Polling feed");

        let bytes = self
            .client
            .get(&self.source.endpoint)
            .send()
            .await
            .context("Feed request failed")?
            .bytes()
            .await
            .context("Failed to read feed body")?;

        let feed = feed_rs::parser::parse(&bytes[..]).context("Malformed feed")?;

        let mut batch = ScrapeBatch::default();

        for entry in feed.entries.into_iter().take(MAX_ENTRIES) {
            let title = entry.title.as_ref().map(|t| t.content.clone()).unwrap_or_default();
            let body = entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
                .unwrap_or_default();

            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| self.source.endpoint.clone());

            let text = format!("{title}\n\n{body}").trim().to_string();
            if text.is_empty() {
                warn!(source = self.source.name.as_str(), entry = entry.id.as_str(), "Empty feed entry");
                batch.errors += 1;
                continue;
            }

            batch.items.push(RawItem {
                text,
                published_at: entry.published.or(entry.updated),
                source_url: link,
                source_name: self.source.name.clone(),
            });
            batch.processed += 1;
        }

        info!(
            source = self.source.name.as_str(),
            processed = batch.processed,
            errors = batch.errors,
            "Feed poll complete"
        );
        Ok(batch)
    }
}
