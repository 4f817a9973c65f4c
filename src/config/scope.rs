use crate::url::{canonicalize_url, LinkFilter};
use crate::UrlError;
use url::Url;

/// How the seed URL is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Breadth-first crawl from one page, following allowed links
    StartPage,
    /// The seed is a sitemap; listed pages are crawled, links are not followed
    Sitemap,
}

/// Immutable description of what one crawl may visit
///
/// Built once from the seed and shared read-only by the frontier and the page
/// processor.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    seed: Url,
    kind: SeedKind,
    filter: LinkFilter,
}

impl CrawlScope {
    /// Derives the scope from a seed URL
    ///
    /// For a start page the allow-list is the seed's host plus its path
    /// segment. For a sitemap only the host restriction applies, since the
    /// sitemap's own path says nothing about the pages it lists.
    pub fn from_seed(seed: &str, kind: SeedKind) -> Result<Self, UrlError> {
        let seed = canonicalize_url(seed)?;
        let filter = match kind {
            SeedKind::StartPage => LinkFilter::from_seed(&seed),
            SeedKind::Sitemap => {
                let host = seed.host_str().ok_or(UrlError::MissingHost)?;
                LinkFilter::new(vec![host.to_string()], None)
            }
        };

        Ok(Self { seed, kind, filter })
    }

    /// The seed URL
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// How the seed is interpreted
    pub fn kind(&self) -> SeedKind {
        self.kind
    }

    /// Whether outbound links are extracted from content pages
    pub fn follows_links(&self) -> bool {
        self.kind == SeedKind::StartPage
    }

    /// The allow-list for discovered links
    pub fn link_filter(&self) -> &LinkFilter {
        &self.filter
    }

    /// Whether the URL is on an allowed host (path not considered)
    pub fn allows_host(&self, url: &Url) -> bool {
        self.filter.allows_host(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_page_scope() {
        let scope = CrawlScope::from_seed("https://example.com/us/en", SeedKind::StartPage).unwrap();
        assert!(scope.follows_links());
        assert_eq!(scope.link_filter().allow_segment(), Some("/us/en/"));

        let inside = Url::parse("https://example.com/us/en/contact").unwrap();
        let outside = Url::parse("https://example.com/fr/fr/contact").unwrap();
        assert!(scope.link_filter().allows(&inside));
        assert!(!scope.link_filter().allows(&outside));
        assert!(scope.allows_host(&outside));
    }

    #[test]
    fn test_sitemap_scope_has_no_path_restriction() {
        let scope =
            CrawlScope::from_seed("https://example.com/sitemap.xml", SeedKind::Sitemap).unwrap();
        assert!(!scope.follows_links());
        assert_eq!(scope.link_filter().allow_segment(), None);

        let page = Url::parse("https://example.com/any/page").unwrap();
        assert!(scope.link_filter().allows(&page));
    }

    #[test]
    fn test_invalid_seed() {
        assert!(CrawlScope::from_seed("example.com/no-scheme", SeedKind::StartPage).is_err());
        assert!(CrawlScope::from_seed("ftp://example.com/", SeedKind::StartPage).is_err());
    }
}
