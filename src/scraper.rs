//! Web scraping module for content extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing. The extractor looks for a
//! main content landmark first, then for the densest text block, and finally falls
//! back to the page body.

use crate::config::ScrapingConfig;
use reqwest::{header, Client, Response, StatusCode};
use scraper::{ElementRef, Html, Node, Selector};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Upper bound on the page fetch timeout, whatever the configuration asks for
const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Main content landmarks, in priority order
const MAIN_SELECTORS: [&str; 9] = [
    "main",
    "article",
    "[role='main']",
    ".content",
    ".post-content",
    ".entry-content",
    "#content",
    "#main-content",
    ".main-content",
];

/// Block containers considered when no landmark exists
const BLOCK_SELECTOR: &str = "div, section, article";

/// Subtrees that never contribute readable text
const STRIPPED_TAGS: [&str; 10] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "noscript",
    "template",
];

/// A text block must exceed this many characters to win the density fallback
const MIN_BLOCK_CHARS: usize = 200;

/// Extracted text shorter than this is treated as an empty page
const MIN_TEXT_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Please enter a valid URL with http:// or https://")]
    InvalidUrl,
    #[error("Page took too long to load")]
    Timeout,
    #[error("Failed to fetch page: {0}")]
    Fetch(reqwest::Error),
    #[error("Failed to fetch page: server responded with {0}")]
    HttpStatus(StatusCode),
    #[error("No readable content found on the page")]
    NoReadableContent,
    #[error("Error processing page: {0}")]
    Processing(String),
}

impl From<reqwest::Error> for ScraperError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScraperError::Timeout
        } else {
            ScraperError::Fetch(err)
        }
    }
}

/// Create an HTTP client for scraping.
///
/// User agent and timeout are applied per request, since both come from the
/// configuration that is re-read on every call.
pub fn create_client() -> Result<Client, reqwest::Error> {
    Client::builder().build()
}

/// Check that a URL has both a scheme and a host before anything is fetched
pub fn validate_url(url: &str) -> Result<Url, ScraperError> {
    let parsed = Url::parse(url.trim()).map_err(|_| ScraperError::InvalidUrl)?;
    if parsed.scheme().is_empty() || parsed.host_str().map_or(true, str::is_empty) {
        return Err(ScraperError::InvalidUrl);
    }
    Ok(parsed)
}

/// Effective fetch timeout for a configuration
pub fn fetch_timeout(config: &ScrapingConfig) -> Duration {
    Duration::from_secs(config.timeout_secs).min(MAX_FETCH_TIMEOUT)
}

/// Fetch a page and extract its main text content
pub async fn fetch_and_clean_content(
    client: &Client,
    url: &Url,
    config: &ScrapingConfig,
) -> Result<String, ScraperError> {
    let started = Instant::now();

    let mut response = client
        .get(url.as_str())
        .header(header::USER_AGENT, config.user_agent.as_str())
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
        .timeout(fetch_timeout(config))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::HttpStatus(status));
    }

    let body = read_capped(&mut response, config.max_content_size).await?;
    let text = extract(&body, config)?;

    tracing::info!(
        url = %url,
        chars = text.chars().count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scraped page"
    );
    Ok(text)
}

/// Read the response body chunk by chunk, stopping at `limit` bytes
async fn read_capped(response: &mut Response, limit: usize) -> Result<Vec<u8>, ScraperError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = limit - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Extract cleaned, size-bounded text from raw HTML bytes
pub fn extract(html: &[u8], config: &ScrapingConfig) -> Result<String, ScraperError> {
    let html = decode_html(html);
    let document = Html::parse_document(&html);

    let region = main_content(&document)?;
    let text = collapse_lines(&visible_text(region).join(" "));
    let text = truncate_chars(&text, config.max_text_chars);

    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return Err(ScraperError::NoReadableContent);
    }
    Ok(text)
}

/// Strict UTF-8 first, lossy decoding when the bytes are not valid UTF-8
fn decode_html(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(html) => Cow::Borrowed(html),
        Err(_) => String::from_utf8_lossy(bytes),
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::Processing(e.to_string()))
}

/// Locate the main content region of a document
fn main_content(document: &Html) -> Result<ElementRef<'_>, ScraperError> {
    for selector_str in MAIN_SELECTORS {
        let selector = parse_selector(selector_str)?;
        if let Some(element) = document.select(&selector).next() {
            return Ok(element);
        }
    }

    // No landmark: take the block with the most visible text, first one on ties
    let blocks = parse_selector(BLOCK_SELECTOR)?;
    let mut densest: Option<(ElementRef<'_>, usize)> = None;
    for element in document.select(&blocks) {
        let len = stripped_len(element);
        if densest.map_or(true, |(_, best)| len > best) {
            densest = Some((element, len));
        }
    }
    if let Some((element, len)) = densest {
        if len > MIN_BLOCK_CHARS {
            return Ok(element);
        }
    }

    let body = parse_selector("body")?;
    Ok(document
        .select(&body)
        .next()
        .unwrap_or_else(|| document.root_element()))
}

/// Number of characters of visible text with surrounding whitespace stripped
fn stripped_len(element: ElementRef<'_>) -> usize {
    visible_text(element)
        .iter()
        .map(|text| text.chars().count())
        .sum()
}

/// Trimmed, non-empty text nodes of an element, skipping non-content subtrees
fn visible_text(element: ElementRef<'_>) -> Vec<&str> {
    let mut out = Vec::new();
    collect_text(element, &mut out);
    out
}

fn collect_text<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
            }
            Node::Element(el) if STRIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Split on line breaks, drop blank lines and rejoin with single spaces
fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cap text at `max_chars` characters, ellipsis included
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPH: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
        eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
        quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

    fn config(max_text_chars: usize) -> ScrapingConfig {
        ScrapingConfig {
            max_text_chars,
            ..ScrapingConfig::default()
        }
    }

    #[test]
    fn landmark_text_excludes_boilerplate() {
        let html = format!(
            r#"<html><head><title>T</title><style>body {{ color: red; }}</style></head>
            <body>
              <nav>Home | About | Contact</nav>
              <main>
                <script>var tracking = "secret";</script>
                <nav>Breadcrumbs here</nav>
                <h1>Headline</h1>
                <p>{PARAGRAPH}</p>
                <button>Subscribe</button>
              </main>
              <footer>Copyright footer</footer>
            </body></html>"#
        );
        let text = extract(html.as_bytes(), &config(8000)).unwrap();
        assert!(text.starts_with("Headline"));
        assert!(text.contains("Lorem ipsum"));
        for noise in ["tracking", "Breadcrumbs", "Subscribe", "Home", "Copyright", "color"] {
            assert!(!text.contains(noise), "unexpected {noise:?} in {text:?}");
        }
    }

    #[test]
    fn main_wins_over_article() {
        let html = format!(
            "<body><article><p>Article text that should lose. {PARAGRAPH}</p></article>\
             <main><p>Main text that should win. {PARAGRAPH}</p></main></body>"
        );
        let text = extract(html.as_bytes(), &config(8000)).unwrap();
        assert!(text.starts_with("Main text that should win."));
    }

    #[test]
    fn densest_block_is_used_without_landmark() {
        let long = format!("{PARAGRAPH} {PARAGRAPH}");
        let html = format!(
            "<body><div class=\"sidebar\">Short sidebar blurb that is long enough to count.</div>\
             <section><p>{long}</p></section>\
             <p>Loose trailing paragraph outside of every block element in the page.</p></body>"
        );
        let text = extract(html.as_bytes(), &config(8000)).unwrap();
        assert_eq!(text, long);
    }

    #[test]
    fn small_blocks_fall_back_to_body() {
        let html = "<body><div>First block with some words in it.</div>\
                    <p>Body paragraph outside of the blocks carrying enough words.</p></body>";
        let text = extract(html.as_bytes(), &config(8000)).unwrap();
        assert!(text.contains("First block"));
        assert!(text.contains("Body paragraph"));
    }

    #[test]
    fn short_content_is_rejected() {
        let html = "<html><body><main><p>Too short.</p></main></body></html>";
        assert!(matches!(
            extract(html.as_bytes(), &config(8000)),
            Err(ScraperError::NoReadableContent)
        ));
    }

    #[test]
    fn text_never_exceeds_budget() {
        let html = format!("<main><p>{PARAGRAPH} {PARAGRAPH} {PARAGRAPH}</p></main>");
        let text = extract(html.as_bytes(), &config(120)).unwrap();
        assert_eq!(text.chars().count(), 120);
        assert!(text.ends_with(ELLIPSIS));

        let untouched = extract(html.as_bytes(), &config(100_000)).unwrap();
        assert!(!untouched.ends_with(ELLIPSIS));
    }

    #[test]
    fn multiline_text_is_collapsed() {
        let html = format!("<main><pre>  first line\n\n   second line  \n{PARAGRAPH}</pre></main>");
        let text = extract(html.as_bytes(), &config(8000)).unwrap();
        assert!(text.starts_with("first line second line Lorem"));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut html = b"<main><p>".to_vec();
        html.extend_from_slice(PARAGRAPH.as_bytes());
        html.extend_from_slice(&[0xff, 0xfe]);
        html.extend_from_slice(b"</p></main>");
        let text = extract(&html, &config(8000)).unwrap();
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo...");
        assert_eq!(truncate_chars("short", 8), "short");
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com/page").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(matches!(validate_url("example.com"), Err(ScraperError::InvalidUrl)));
        assert!(matches!(validate_url("not a url"), Err(ScraperError::InvalidUrl)));
        assert!(matches!(
            validate_url("mailto:someone@example.com"),
            Err(ScraperError::InvalidUrl)
        ));
    }

    #[test]
    fn fetch_timeout_is_capped() {
        assert_eq!(fetch_timeout(&ScrapingConfig::default()), MAX_FETCH_TIMEOUT);
        let quick = ScrapingConfig {
            timeout_secs: 3,
            ..ScrapingConfig::default()
        };
        assert_eq!(fetch_timeout(&quick), Duration::from_secs(3));
    }
}
