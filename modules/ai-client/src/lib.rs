mod claude;
pub mod util;

pub use claude::{Claude, DEFAULT_MODEL};

use thiserror::Error;

/// Errors surfaced by the messages API client. `RateLimited` is split out so
/// callers can back off and retry; everything else is terminal for one call.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("rate limited by API (status {status})")]
    RateLimited { status: u16 },

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response was not valid JSON for the expected schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("empty response from model")]
    Empty,
}

pub type Result<T> = std::result::Result<T, AiError>;
