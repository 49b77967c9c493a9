//! Input classification: decides whether an input is a page to fetch or literal text.

use serde::{Deserialize, Serialize};
use url::Url;

/// How an input should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fetch the page and summarize its content
    Url,
    /// Summarize the input as-is
    Text,
}

/// Resolve the mode for an input.
///
/// An explicit caller choice always wins. Otherwise the trimmed input is a URL when it is a
/// single token that parses as an absolute http(s) URL with a host.
pub fn classify(input: &str, explicit: Option<Mode>) -> Mode {
    if let Some(mode) = explicit {
        return mode;
    }
    if looks_like_url(input) {
        Mode::Url
    } else {
        Mode::Text
    }
}

fn looks_like_url(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return false;
    }
    parse_web_url(trimmed).is_ok()
}

/// Parse an absolute http(s) URL with a host.
pub fn parse_web_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(url)
}
