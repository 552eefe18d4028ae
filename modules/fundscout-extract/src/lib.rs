//! The single boundary to the external text-understanding service.
//!
//! `ExtractionGateway` wraps the messages API with rate-limit retry/backoff,
//! defensive parsing, and date fallback, and fails closed: callers always get
//! an `Extraction`, never an error to propagate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use ai_client::util::truncate_to_char_boundary;
use ai_client::{AiError, Claude};
use fundscout_common::ExtractedCompany;

/// Character budget for one extraction prompt.
const CONTENT_BUDGET: usize = 12_000;

/// Rate-limit retry policy: base * 3^attempt between attempts.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(2);

/// Discriminated extraction result. `Invalid` covers both exhausted retries
/// and model-side negatives — a negative classification is not an error.
#[derive(Debug, Clone)]
pub enum Extraction {
    Valid(ExtractedCompany),
    Invalid { reason: String },
}

impl Extraction {
    pub fn is_valid(&self) -> bool {
        matches!(self, Extraction::Valid(_))
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Extraction::Invalid {
            reason: reason.into(),
        }
    }
}

/// Seam for the company-extraction capability, shared by the intake pipeline
/// and the search path, stubbable for deterministic tests.
#[async_trait]
pub trait CompanyExtractor: Send + Sync {
    async fn extract(&self, text: &str, date_hint: Option<NaiveDate>) -> Extraction;
}

// --- LLM payload shape ---

/// What the model returns. Untrusted: every field is optional or defaulted and
/// re-validated before becoming an `ExtractedCompany`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct ExtractionPayload {
    /// Whether the text actually describes a startup funding/launch event.
    is_funding_event: bool,
    /// Why not, when `is_funding_event` is false.
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Official website URL if stated in the text.
    #[serde(default)]
    website: Option<String>,
    /// Amount as written ("$5M", "5 million", "undisclosed").
    #[serde(default)]
    funding_amount: Option<String>,
    /// Round label ("Seed", "Series A", ...).
    #[serde(default)]
    funding_round: Option<String>,
    /// Announcement date, YYYY-MM-DD.
    #[serde(default)]
    announced_at: Option<String>,
    #[serde(default)]
    founders: Vec<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    /// Model's own confidence in the extraction, 0 to 1.
    #[serde(default)]
    confidence: Option<f64>,
}

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a startup funding-event extractor.

Given a block of text harvested from a public web source, decide whether it
describes a startup funding or launch announcement, and if so extract the
structured facts.

## Rules
- is_funding_event is true only for a concrete announcement about one company:
  a funding round, an acquisition-sized raise, or a product/company launch with
  stated backing. Generic market commentary, listicles without a single
  subject, and job posts are NOT funding events.
- name: the company name exactly as written. Never substitute a placeholder
  like "startup" or "the company".
- funding_amount: as written in the text. If the text says the amount is
  undisclosed, return "undisclosed". If no amount is mentioned at all, omit it.
- announced_at: the announcement date in YYYY-MM-DD if the text states or
  implies one; otherwise omit it.
- founders: personal names of founders/co-founders explicitly mentioned.
- website: only a URL the text itself gives for the company.
- confidence: how sure you are that the extracted facts are correct."#;

// --- Gateway ---

pub struct ExtractionGateway {
    claude: Claude,
}

impl ExtractionGateway {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl CompanyExtractor for ExtractionGateway {
    async fn extract(&self, text: &str, date_hint: Option<NaiveDate>) -> Extraction {
        let content = truncate_to_char_boundary(text, CONTENT_BUDGET);
        let user_prompt = format!("Extract the funding event from this text.\n\n---\n\n{content}");

        for attempt in 0..MAX_ATTEMPTS {
            match self
                .claude
                .extract_json::<ExtractionPayload>(EXTRACTION_SYSTEM_PROMPT, &user_prompt)
                .await
            {
                Ok(payload) => {
                    let extraction = payload_to_extraction(payload, date_hint, Utc::now().date_naive());
                    if let Extraction::Valid(ref company) = extraction {
                        info!(name = company.name.as_str(), "Extracted funding event");
                    }
                    return extraction;
                }
                Err(AiError::RateLimited { status }) => {
                    if attempt + 1 < MAX_ATTEMPTS {
                        let backoff = RETRY_BASE * 3u32.pow(attempt);
                        warn!(
                            status,
                            attempt = attempt + 1,
                            backoff_secs = backoff.as_secs(),
                            "Extraction rate limited, retrying after backoff"
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Extraction failed");
                    return Extraction::invalid(format!("extraction failed: {e}"));
                }
            }
        }

        Extraction::invalid("rate limited: retry attempts exhausted")
    }
}

/// Validate the untrusted payload into a domain extraction. Pure so the
/// fallback chain is testable without a model.
fn payload_to_extraction(
    payload: ExtractionPayload,
    date_hint: Option<NaiveDate>,
    today: NaiveDate,
) -> Extraction {
    if !payload.is_funding_event {
        let reason = payload
            .reason
            .unwrap_or_else(|| "not a funding event".to_string());
        return Extraction::invalid(reason);
    }

    let name = match payload.name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => return Extraction::invalid("payload missing company name"),
    };

    // Date fallback: extracted → context hint → processing date.
    let announced_at = payload
        .announced_at
        .as_deref()
        .and_then(parse_loose_date)
        .or(date_hint)
        .unwrap_or(today);

    Extraction::Valid(ExtractedCompany {
        name,
        description: payload.description,
        website: payload.website,
        funding_amount: payload.funding_amount,
        funding_round: payload.funding_round,
        announced_at,
        founders: payload.founders,
        industry: payload.industry,
        tags: payload.tags,
        confidence: payload.confidence.unwrap_or(0.7).clamp(0.0, 1.0),
    })
}

fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
