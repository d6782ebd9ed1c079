//! HTML parsing and outlink extraction
//!
//! Parsing is split in two: a `MarkupParser` pulls raw `href` values out of a
//! document, and `extract_outlinks` turns them into canonical absolute URLs.

use crate::url::normalize_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Errors produced while parsing a document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Extracts link targets from a markup document
pub trait MarkupParser: Send + Sync {
    /// Returns the raw `href` values of the document's anchors, in document order
    fn parse(&self, content: &[u8]) -> Result<Vec<String>, ParseError>;
}

/// `MarkupParser` over scraper's HTML5 parser
///
/// **Include:** `<a href="...">` anywhere in the document, `rel="nofollow"`
/// included.
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAnchorParser;

impl HtmlAnchorParser {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupParser for HtmlAnchorParser {
    fn parse(&self, content: &[u8]) -> Result<Vec<String>, ParseError> {
        let selector =
            Selector::parse("a[href]").map_err(|e| ParseError::Selector(e.to_string()))?;
        let html = String::from_utf8_lossy(content);
        let document = Html::parse_document(&html);

        let hrefs = document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| is_followable(href))
            .map(str::to_string)
            .collect();

        Ok(hrefs)
    }
}

fn is_followable(href: &str) -> bool {
    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lowered = href.to_ascii_lowercase();
    !(lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:"))
}

/// Extracts the canonical absolute outlinks of a page
///
/// Each href is resolved against `base`, normalized (fragment dropped, host
/// lowercased) and deduplicated. A parser failure yields no links.
///
/// # Example
///
/// ```
/// use tidewalk::crawler::{extract_outlinks, HtmlAnchorParser};
/// use url::Url;
///
/// let html = br#"<a href="/a#top">A</a> <a href="/a">A again</a> <a href="b">B</a>"#;
/// let base = Url::parse("https://ics.uci.edu/dir/page").unwrap();
/// let links = extract_outlinks(&HtmlAnchorParser::new(), html, &base);
///
/// assert_eq!(links.len(), 2);
/// assert!(links.contains(&Url::parse("https://ics.uci.edu/a").unwrap()));
/// assert!(links.contains(&Url::parse("https://ics.uci.edu/dir/b").unwrap()));
/// ```
pub fn extract_outlinks(parser: &dyn MarkupParser, content: &[u8], base: &Url) -> HashSet<Url> {
    let hrefs = match parser.parse(content) {
        Ok(hrefs) => hrefs,
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}", base, e);
            return HashSet::new();
        }
    };

    hrefs
        .iter()
        .filter_map(|href| match base.join(href) {
            Ok(absolute) => Some(absolute),
            Err(e) => {
                tracing::trace!("Unresolvable href {:?} on {}: {}", href, base, e);
                None
            }
        })
        .filter_map(|absolute| normalize_url(absolute.as_str()).ok())
        .collect()
}
