//! Web scraping module for content extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing. Fetch failures never escape
//! [`Extractor::extract`]; they come back as a failed [`ExtractionResult`] so the agent can
//! decide how to react.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

use crate::config::ScraperConfig;
use crate::router::parse_web_url;
use crate::summary::ExtractionResult;

/// Appended to content cut at the maximum length
pub const TRUNCATION_MARKER: &str = "...";

/// Title used when the page has neither `<title>` nor `<h1>`
pub const UNTITLED: &str = "Untitled";

/// Subtrees that never carry article text
const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "iframe", "aside"];

/// Content containers in priority order; the first with text wins
const CONTENT_SELECTORS: &[&str] = &["article", "main", ".content", "body"];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "td", "th", "section",
    "article", "main", "header", "blockquote", "pre", "figcaption", "dt", "dd",
];

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("no content found at URL")]
    NoContent,
}

/// Title and cleaned body text of a parsed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub title: String,
    pub content: String,
}

/// Fetches pages and reduces them to title and body text.
#[derive(Debug, Clone)]
pub struct Extractor {
    client: Client,
    timeout_secs: u64,
    max_content_length: usize,
}

impl Extractor {
    /// Build an extractor with a configured HTTP client
    pub fn new(config: &ScraperConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            max_content_length: config.max_content_length,
        })
    }

    /// Fetch and extract content from a URL.
    ///
    /// Makes at most one request and never retries.
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        match self.try_extract(url).await {
            Ok(page) => {
                tracing::info!(
                    url,
                    title = %page.title,
                    chars = page.content.chars().count(),
                    "extracted page"
                );
                ExtractionResult::ok(page.title, page.content)
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "extraction failed");
                ExtractionResult::failed(err.to_string())
            }
        }
    }

    async fn try_extract(&self, url: &str) -> Result<PageText, ScraperError> {
        let url = parse_web_url(url).map_err(|reason| ScraperError::InvalidUrl {
            url: url.to_string(),
            reason,
        })?;

        let html = self.fetch_html(&url).await?;
        let page = extract_document(&html, self.max_content_length);

        if page.content.is_empty() {
            return Err(ScraperError::NoContent);
        }
        Ok(page)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, ScraperError> {
        tracing::debug!(url = %url, "fetching page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status(status));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !is_html_content_type(content_type) {
                return Err(ScraperError::UnsupportedContentType(content_type.to_string()));
            }
        }

        response.text().await.map_err(|e| self.classify_error(e))
    }

    fn classify_error(&self, error: reqwest::Error) -> ScraperError {
        if error.is_timeout() {
            ScraperError::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            ScraperError::Connect(error.to_string())
        } else {
            ScraperError::FetchError(error)
        }
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Reduce an HTML document to its title and cleaned, length-capped body text.
///
/// Pure function of the input text.
pub fn extract_document(html: &str, max_content_length: usize) -> PageText {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let content = truncate_content(&extract_text(&document), max_content_length);

    PageText { title, content }
}

/// Extract the page title from <title> or <h1>
fn extract_title(document: &Html) -> String {
    ["title", "h1"]
        .iter()
        .find_map(|css| {
            let element = select_kept(document, css).into_iter().next()?;
            let title = normalize_whitespace(&element.text().collect::<String>());
            (!title.is_empty()).then_some(title)
        })
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Extract readable text from the highest-priority container that has any
fn extract_text(document: &Html) -> String {
    for css in CONTENT_SELECTORS {
        let elements = select_kept(document, css);
        if elements.is_empty() {
            continue;
        }

        let mut buf = String::new();
        for element in elements {
            collect_text(element, &mut buf);
            buf.push('\n');
        }

        let text = normalize_whitespace(&buf);
        if !text.is_empty() {
            return text;
        }
    }

    String::new()
}

/// Elements matching `css` that do not sit inside a stripped subtree
fn select_kept<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|element| !is_stripped(element))
        .collect()
}

fn is_stripped(element: &ElementRef<'_>) -> bool {
    STRIPPED_TAGS.contains(&element.value().name())
        || element.ancestors().any(|node| {
            node.value()
                .as_element()
                .is_some_and(|el| STRIPPED_TAGS.contains(&el.name()))
        })
}

fn collect_text(element: ElementRef<'_>, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if STRIPPED_TAGS.contains(&tag) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    buf.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, buf);
                }
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse whitespace runs: a run containing a newline becomes one `\n`, any other run one
/// space. Leading and trailing whitespace is dropped. Idempotent.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<char> = None;

    for ch in text.chars() {
        if ch == '\n' {
            pending = Some('\n');
        } else if ch.is_whitespace() {
            pending.get_or_insert(' ');
        } else {
            if let Some(separator) = pending.take() {
                if !out.is_empty() {
                    out.push(separator);
                }
            }
            out.push(ch);
        }
    }

    out
}

/// Cut `text` to `max_chars` characters and append [`TRUNCATION_MARKER`] when it was longer
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}{}", &text[..end], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
