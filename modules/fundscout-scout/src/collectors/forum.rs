use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use fundscout_common::{RawItem, SourceDescriptor};

use super::{Collector, ScrapeBatch};

/// Posts shorter than this carry no extractable facts.
const MIN_POST_CHARS: usize = 100;

/// Time windows queried per run, newest first.
const TIME_WINDOWS: &[&str] = &["day", "week"];

const POSTS_PER_WINDOW: u32 = 50;

// --- Reddit-style listing wire types ---

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: f64,
}

/// Queries a public forum listing API (Reddit-style JSON) across one or more
/// time windows, dropping trivially short posts.
pub struct ForumCollector {
    source: SourceDescriptor,
    client: reqwest::Client,
}

impl ForumCollector {
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("fundscout/0.1")
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn fetch_window(&self, window: &str) -> Result<Vec<PostData>> {
        let limit = POSTS_PER_WINDOW.to_string();
        let listing: Listing = self
            .client
            .get(&self.source.endpoint)
            .query(&[("t", window), ("limit", limit.as_str())])
            .send()
            .await
            .context("Forum listing request failed")?
            .json()
            .await
            .context("Malformed forum listing")?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }
}

#[async_trait]
impl Collector for ForumCollector {
    fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    async fn scrape(&self) -> Result<ScrapeBatch> {
        info!(source = self.source.name.as_str(), "Querying forum listing");

        let mut batch = ScrapeBatch::default();
        let mut seen = std::collections::HashSet::new();

        for window in TIME_WINDOWS {
            let posts = match self.fetch_window(window).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(
                        source = self.source.name.as_str(),
                        window,
                        error = %e,
                        "Forum window query failed"
                    );
                    batch.errors += 1;
                    continue;
                }
            };

            for post in posts {
                if !seen.insert(post.permalink.clone()) {
                    continue;
                }

                let text = format!("{}\n\n{}", post.title, post.selftext)
                    .trim()
                    .to_string();
                if text.len() < MIN_POST_CHARS {
                    continue;
                }

                let published_at = DateTime::<Utc>::from_timestamp(post.created_utc as i64, 0);

                batch.items.push(RawItem {
                    text,
                    published_at,
                    source_url: format!("https://www.reddit.com{}", post.permalink),
                    source_name: self.source.name.clone(),
                });
                batch.processed += 1;
            }
        }

        info!(
            source = self.source.name.as_str(),
            processed = batch.processed,
            errors = batch.errors,
            "Forum query complete"
        );
        Ok(batch)
    }
}
