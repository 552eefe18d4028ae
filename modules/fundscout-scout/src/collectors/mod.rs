//! Pluggable per-source harvesters. Each collector turns one external source
//! into normalized `RawItem`s; the registry selects an implementation per
//! configured source by kind, no inheritance, no type switches downstream.

mod discovery;
mod feed;
mod forum;
mod listing;

pub use discovery::DiscoveryCollector;
pub use feed::FeedCollector;
pub use forum::ForumCollector;
pub use listing::ListingCollector;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use fundscout_common::{RawItem, SourceDescriptor, SourceKind};
use fundscout_fetch::{PageFetcher, WebSearcher};

/// Result of one collector run. Per-item failures increment `errors` without
/// aborting the run; a negative extraction downstream is neither.
#[derive(Debug, Default)]
pub struct ScrapeBatch {
    pub processed: u32,
    pub errors: u32,
    pub items: Vec<RawItem>,
}

#[async_trait]
pub trait Collector: Send + Sync {
    fn source(&self) -> &SourceDescriptor;

    async fn scrape(&self) -> Result<ScrapeBatch>;
}

/// Build the collector set for the enabled sources. Disabled descriptors are
/// skipped; the fetcher and searcher are shared across collectors (one
/// session context at a time, collectors run sequentially).
pub fn build_collectors(
    sources: &[SourceDescriptor],
    fetcher: Arc<dyn PageFetcher>,
    searcher: Arc<dyn WebSearcher>,
) -> Vec<Box<dyn Collector>> {
    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();

    for source in sources.iter().filter(|s| s.enabled) {
        match source.kind {
            SourceKind::Feed => {
                collectors.push(Box::new(FeedCollector::new(source.clone())));
            }
            SourceKind::Forum => {
                collectors.push(Box::new(ForumCollector::new(source.clone())));
            }
            SourceKind::Listing => {
                collectors.push(Box::new(ListingCollector::new(
                    source.clone(),
                    fetcher.clone(),
                )));
            }
            SourceKind::Discovery => {
                collectors.push(Box::new(DiscoveryCollector::new(
                    source.clone(),
                    searcher.clone(),
                )));
            }
        }
    }

    info!(count = collectors.len(), "Collector registry built");
    collectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, StubSearcher};

    fn descriptor(name: &str, kind: SourceKind, enabled: bool) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            kind,
            endpoint: "https://example.com".to_string(),
            enabled,
            reliability: 0.8,
        }
    }

    #[test]
    fn registry_skips_disabled_sources() {
        let sources = vec![
            descriptor("wire", SourceKind::Feed, true),
            descriptor("forum", SourceKind::Forum, false),
            descriptor("disco", SourceKind::Discovery, true),
        ];
        let collectors = build_collectors(
            &sources,
            Arc::new(StubFetcher::new()),
            Arc::new(StubSearcher::new()),
        );
        assert_eq!(collectors.len(), 2);
        assert_eq!(collectors[0].source().name, "wire");
        assert_eq!(collectors[1].source().name, "disco");
    }
}
