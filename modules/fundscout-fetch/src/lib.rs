//! HTTP fetching for the pipeline: page retrieval with Readability main-content
//! extraction, and web search behind a trait so tests can stub it.

mod page;
mod search;

pub use page::{extract_links_by_pattern, HttpFetcher, PageFetcher};
pub use search::{SearchHit, SerperNewsSearcher, SerperSearcher, WebSearcher};
