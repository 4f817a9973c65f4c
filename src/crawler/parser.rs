//! HTML parser for extracting links
//!
//! Link extraction rules:
//!
//! **Include:**
//! - `<a href="...">` and `<area href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links (same page anchors)
//!
//! Whether a resolved link is actually followed is decided by the
//! `LinkFilter`, not here.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href], area[href]").expect("valid link selector"));

/// Extracts every followable link from a parsed document
///
/// Links are resolved against `base_url` and returned in document order,
/// fragments removed. Duplicates are kept; the frontier filters them.
///
/// # Example
///
/// ```
/// use mkto_crawl::crawler::extract_links;
/// use scraper::Html;
/// use url::Url;
///
/// let html = Html::parse_document(r#"<a href="/page">Link</a>"#);
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(&html, &base_url);
/// assert_eq!(links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    document
        .select(&LINK_SELECTOR)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url)
}
