//! Sitemap parsing
//!
//! Only `<loc>` values are read. A `<sitemapindex>` lists further sitemaps,
//! a `<urlset>` lists pages.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static LOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("valid loc regex"));
static SITEMAP_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<sitemapindex[\s>]").expect("valid sitemapindex regex"));

/// What a sitemap's `<loc>` entries point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<urlset>`: pages
    UrlSet,
    /// `<sitemapindex>`: more sitemaps
    Index,
}

/// Parsed sitemap
#[derive(Debug, Clone, PartialEq)]
pub struct Sitemap {
    pub kind: SitemapKind,
    pub locations: Vec<Url>,
}

/// Parses a sitemap body, resolving locations against `base_url`
///
/// Entries that are not valid URLs are skipped.
pub fn parse_sitemap(xml: &str, base_url: &Url) -> Sitemap {
    let kind = if SITEMAP_INDEX.is_match(xml) {
        SitemapKind::Index
    } else {
        SitemapKind::UrlSet
    };

    let locations = LOC
        .captures_iter(xml)
        .map(|captures| unescape(strip_cdata(&captures[1])))
        .filter(|loc| !loc.is_empty())
        .filter_map(|loc| match base_url.join(&loc) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Skipping sitemap entry {:?}: {}", loc, e);
                None
            }
        })
        .collect();

    Sitemap { kind, locations }
}

fn strip_cdata(value: &str) -> &str {
    value
        .strip_prefix("<![CDATA[")
        .and_then(|v| v.strip_suffix("]]>"))
        .map(str::trim)
        .unwrap_or(value)
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
