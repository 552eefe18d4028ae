use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

/// Per-request timeout. A slow target fails only its own item, never the run.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// --- PageFetcher trait ---

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and reduce it to readable main-content markdown.
    async fn page(&self, url: &str) -> Result<String>;

    /// Fetch raw HTML without Readability extraction. Used by listing sources
    /// that need the page structure to pull out detail links.
    async fn page_raw(&self, url: &str) -> Result<String> {
        self.page(url).await
    }

    fn name(&self) -> &str;
}

// --- Plain HTTP + Readability fetcher ---

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .user_agent("fundscout/0.1 (+https://fundscout.dev)")
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn get(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Page request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Page request returned {}", response.status());
        }

        Ok(response.text().await.context("Failed to read page body")?)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn page(&self, url: &str) -> Result<String> {
        info!(url, fetcher = "http", "Fetching page");

        let html = self.get(url).await?;
        if html.is_empty() {
            warn!(url, fetcher = "http", "Empty response body");
            return Ok(String::new());
        }

        let parsed_url = url::Url::parse(url).ok();
        let config = TransformConfig {
            readability: true,
            main_content: true,
            return_format: ReturnFormat::Markdown,
            filter_images: true,
            filter_svg: true,
            clean_html: true,
        };
        let input = TransformInput {
            url: parsed_url.as_ref(),
            content: html.as_bytes(),
            screenshot_bytes: None,
            encoding: None,
            selector_config: None,
            ignore_tags: None,
        };

        let text = transform_content_input(input, &config);

        if text.trim().is_empty() {
            warn!(url, fetcher = "http", "Empty content after Readability extraction");
            return Ok(String::new());
        }

        info!(url, fetcher = "http", bytes = text.len(), "Fetched page");
        Ok(text)
    }

    async fn page_raw(&self, url: &str) -> Result<String> {
        info!(url, fetcher = "http", "Fetching raw HTML");
        self.get(url).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract links from raw HTML that contain a given URL pattern.
/// Resolves relative URLs against `base_url`, deduplicates, caps at `max`.
pub fn extract_links_by_pattern(html: &str, base_url: &str, pattern: &str, max: usize) -> Vec<String> {
    let href_re = regex::Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex");
    let base = url::Url::parse(base_url).ok();

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for cap in href_re.captures_iter(html) {
        let raw = &cap[1];

        let resolved = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else if let Some(ref b) = base {
            match b.join(raw) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            }
        } else {
            continue;
        };

        if resolved.contains(pattern) && seen.insert(resolved.clone()) {
            links.push(resolved);
            if links.len() >= max {
                break;
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_extraction_resolves_and_dedups() {
        let html = r#"
            <a href="/companies/acme">Acme</a>
            <a href="https://list.example.com/companies/zenith">Zenith</a>
            <a href="/companies/acme">Acme again</a>
            <a href="/about">About</a>
        "#;
        let links =
            extract_links_by_pattern(html, "https://list.example.com/", "/companies/", 20);
        assert_eq!(
            links,
            vec![
                "https://list.example.com/companies/acme".to_string(),
                "https://list.example.com/companies/zenith".to_string(),
            ]
        );
    }

    #[test]
    fn link_extraction_honors_cap() {
        let html: String = (0..30)
            .map(|i| format!(r#"<a href="/companies/c{i}">c{i}</a>"#))
            .collect();
        let links = extract_links_by_pattern(&html, "https://l.example.com/", "/companies/", 5);
        assert_eq!(links.len(), 5);
    }
}
