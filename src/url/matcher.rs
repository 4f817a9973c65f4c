use url::Url;

/// File extensions that never lead to an HTML page
const IGNORED_EXTENSIONS: &[&str] = &[
    "7z", "bz2", "gz", "rar", "tar", "tgz", "zip", "bmp", "gif", "ico", "jpeg", "jpg", "png",
    "svg", "tif", "tiff", "webp", "avi", "m4a", "mov", "mp3", "mp4", "mpeg", "ogg", "wav", "webm",
    "wmv", "csv", "doc", "docx", "pdf", "ppt", "pptx", "rtf", "xls", "xlsx", "css", "dmg", "exe",
    "iso", "js", "msi",
];

/// Checks if a host is an allowed host or one of its subdomains
///
/// # Examples
///
/// ```
/// use mkto_crawl::url::host_matches;
///
/// assert!(host_matches("example.com", "example.com"));
/// assert!(host_matches("example.com", "www.example.com"));
/// assert!(!host_matches("example.com", "notexample.com"));
/// ```
pub fn host_matches(allowed: &str, candidate: &str) -> bool {
    candidate == allowed || candidate.ends_with(&format!(".{}", allowed))
}

/// Allow-list applied to discovered links
///
/// A link passes when its host is one of the allowed hosts (or a subdomain of
/// one) and, if a path segment is set, its path contains `/<segment>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFilter {
    allowed_hosts: Vec<String>,
    allow_segment: Option<String>,
}

impl LinkFilter {
    /// Creates a filter from a host set and an optional path segment
    ///
    /// Leading and trailing slashes on the segment are ignored; an empty
    /// segment allows every path.
    pub fn new(allowed_hosts: Vec<String>, allow_segment: Option<&str>) -> Self {
        let allow_segment = allow_segment
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
            .map(|s| format!("/{}/", s));

        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.to_lowercase())
                .collect(),
            allow_segment,
        }
    }

    /// Derives the filter from a seed URL: its host and its path
    pub fn from_seed(seed: &Url) -> Self {
        let hosts = seed.host_str().map(|h| vec![h.to_string()]).unwrap_or_default();
        Self::new(hosts, Some(seed.path()))
    }

    /// Returns true when the URL is on an allowed host
    pub fn allows_host(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => {
                let host = host.to_lowercase();
                self.allowed_hosts.iter().any(|a| host_matches(a, &host))
            }
            None => false,
        }
    }

    /// Returns true when the URL's path lies under the allowed segment
    pub fn allows_path(&self, url: &Url) -> bool {
        let Some(segment) = &self.allow_segment else {
            return true;
        };

        let path = url.path();
        if path.ends_with('/') {
            path.contains(segment.as_str())
        } else {
            format!("{}/", path).contains(segment.as_str())
        }
    }

    /// Full link check: host, path, and extension
    pub fn allows(&self, url: &Url) -> bool {
        (url.scheme() == "http" || url.scheme() == "https")
            && self.allows_host(url)
            && self.allows_path(url)
            && !has_ignored_extension(url)
    }

    /// The `/<segment>/` pattern links must contain, if any
    pub fn allow_segment(&self) -> Option<&str> {
        self.allow_segment.as_deref()
    }
}

/// Checks whether the URL path ends in a known non-HTML extension
pub fn has_ignored_extension(url: &Url) -> bool {
    let last = url.path().rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((_, ext)) => IGNORED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}
