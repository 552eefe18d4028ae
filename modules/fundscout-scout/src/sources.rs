//! Compile-time source configuration: the default source set with reliability
//! weights, and per-site listing link patterns.

use fundscout_common::{SourceDescriptor, SourceKind};

/// Default enabled source set. Reliability doubles as per-evidence confidence;
/// sources at or above 0.9 direct-promote at intake, everything else feeds
/// the pending pool.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor {
            name: "techcrunch_feed".to_string(),
            kind: SourceKind::Feed,
            endpoint: "https://techcrunch.com/category/venture/feed/".to_string(),
            enabled: true,
            reliability: 0.95,
        },
        SourceDescriptor {
            name: "finsmes_feed".to_string(),
            kind: SourceKind::Feed,
            endpoint: "https://www.finsmes.com/feed".to_string(),
            enabled: true,
            reliability: 0.92,
        },
        SourceDescriptor {
            name: "startups_forum".to_string(),
            kind: SourceKind::Forum,
            endpoint: "https://www.reddit.com/r/startups+venturecapital/top.json".to_string(),
            enabled: true,
            reliability: 0.55,
        },
        SourceDescriptor {
            name: "betalist".to_string(),
            kind: SourceKind::Listing,
            endpoint: "https://betalist.com/".to_string(),
            enabled: true,
            reliability: 0.75,
        },
        SourceDescriptor {
            name: "web_discovery".to_string(),
            kind: SourceKind::Discovery,
            endpoint: "serper".to_string(),
            enabled: true,
            reliability: 0.45,
        },
    ]
}

/// URL fragment identifying detail pages on a listing site.
pub fn listing_link_pattern(endpoint: &str) -> &'static str {
    if endpoint.contains("betalist") {
        "/startups/"
    } else if endpoint.contains("producthunt") {
        "/posts/"
    } else {
        "/companies/"
    }
}
