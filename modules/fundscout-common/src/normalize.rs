//! Normalization used as dedup keys across the pipeline: company names,
//! URLs, domains, and funding amounts.

use std::sync::OnceLock;

use regex::Regex;

/// Tokens stripped from the tail of a company name. Order-independent; applied
/// repeatedly so "Acme Holdings Inc" → "acme holdings" → unaffected further.
const CORPORATE_SUFFIXES: &[&str] = &[
    "inc", "incorporated", "llc", "ltd", "limited", "corp", "corporation", "co", "company",
    "gmbh", "plc", "sa", "ag", "bv", "oy", "srl", "pty",
];

const LEADING_ARTICLES: &[&str] = &["the", "a", "an"];

/// Canonical dedup key for a company name: lowercase, leading article
/// stripped, non-alphanumerics collapsed to spaces, trailing corporate
/// suffix tokens removed.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();

    if tokens.len() > 1 {
        if let Some(first) = tokens.first() {
            if LEADING_ARTICLES.contains(first) {
                tokens.remove(0);
            }
        }
    }

    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        if CORPORATE_SUFFIXES.contains(&last) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// Symmetric name similarity in [0,1]: normalized Levenshtein over the
/// canonical keys. 1.0 means the keys are identical.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let ka = normalize_name(a);
    let kb = normalize_name(b);
    if ka.is_empty() || kb.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&ka, &kb)
}

/// Normalize a URL for dedup: drop the scheme and a leading "www.", lowercase
/// the host, trim the trailing slash on the path. Query strings are kept —
/// two result pages that differ only in query are different results.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) => {
            let host = parsed
                .host_str()
                .unwrap_or_default()
                .trim_start_matches("www.")
                .to_lowercase();
            let path = parsed.path().trim_end_matches('/');
            match parsed.query() {
                Some(q) => format!("{host}{path}?{q}"),
                None => format!("{host}{path}"),
            }
        }
        Err(_) => {
            // Not parseable as an absolute URL — best-effort string cleanup.
            let stripped = trimmed
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_start_matches("www.");
            stripped.trim_end_matches('/').to_lowercase()
        }
    }
}

/// Hostname of a URL, lowercased, without a leading "www.".
pub fn extract_domain(raw: &str) -> String {
    let without_scheme = raw
        .split("://")
        .nth(1)
        .unwrap_or(raw)
        .split('/')
        .next()
        .unwrap_or("");
    without_scheme
        .trim_start_matches("www.")
        .to_lowercase()
}

/// Registrable domain, subdomain-insensitive: the last two dot-separated
/// labels of the host ("blog.acme.io" → "acme.io").
pub fn bare_domain(raw: &str) -> String {
    let host = extract_domain(raw);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }
    labels[labels.len() - 2..].join(".")
}

/// Literals that mean "there is no amount" rather than an amount.
pub fn is_null_amount(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "" | "null" | "none" | "unknown" | "undisclosed" | "n/a" | "na" | "tbd"
    )
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([\d][\d,]*(?:\.\d+)?)\s*(billion|million|thousand|bn|b|mm|m|k)?")
            .expect("valid amount regex")
    })
}

/// Parse a written funding amount to a dollar integer: "$5M" → 5_000_000,
/// "2.5 million" → 2_500_000, "500k" → 500_000. Currency symbols are treated
/// at face value; conversion is out of scope. Returns None for null literals
/// and unparseable strings.
pub fn parse_funding_amount(raw: &str) -> Option<i64> {
    if is_null_amount(raw) {
        return None;
    }

    let caps = amount_regex().captures(raw)?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    let base: f64 = digits.parse().ok()?;

    let scale = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        Some(s) if s == "billion" || s == "bn" || s == "b" => 1_000_000_000.0,
        Some(s) if s == "million" || s == "mm" || s == "m" => 1_000_000.0,
        Some(s) if s == "thousand" || s == "k" => 1_000.0,
        _ => 1.0,
    };

    let value = base * scale;
    if !value.is_finite() || value < 0.0 || value > 1e15 {
        return None;
    }
    Some(value.round() as i64)
}
