use crate::url::matches_suffix;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Substrings that disqualify a URL anywhere in its text
const REJECTED_KEYWORDS: &[&str] = &["=", "?", "login"];

/// Path keywords that, next to a date segment, mark a calendar link farm
const CALENDAR_KEYWORDS: &[&str] = &["events", "meeting", "calendar", "day"];

/// File extensions that never hold crawlable HTML
const DENIED_EXTENSIONS: &[&str] = &[
    "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "png", "tif", "tiff", "mid", "mp2", "mp3",
    "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf", "ps", "eps",
    "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "data", "dat", "exe", "bz2",
    "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "epub", "dll", "cnf", "tgz", "sha1", "thmx",
    "mso", "arff", "rtf", "jar", "csv", "rm", "smil", "wmv", "swf", "wma", "zip", "rar", "gz",
    "jsp", "bib", "txt", "rpm",
];

/// Matches `/YYYY-MM` and `/YYYY-MM-DD` path segments
fn date_segment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/\d{4}-\d{2}").expect("date segment pattern is valid"))
}

/// Decides whether a URL is eligible for crawling
///
/// The filter restricts the crawl to an allow-listed set of host suffixes and
/// rejects URLs that are known to lead nowhere useful: query strings, login
/// pages, date-stamped calendar pages, and non-HTML files.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    allowed_suffixes: Vec<String>,
}

impl UrlFilter {
    /// Creates a filter scoped to the given host suffixes
    pub fn new<I, S>(allowed_suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_suffixes: allowed_suffixes
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        }
    }

    /// Returns the configured suffixes
    pub fn allowed_suffixes(&self) -> &[String] {
        &self.allowed_suffixes
    }

    /// Checks every crawl-eligibility rule against a URL
    ///
    /// # Examples
    ///
    /// ```
    /// use tidewalk::url::UrlFilter;
    /// use url::Url;
    ///
    /// let filter = UrlFilter::new(["ics.uci.edu", "today.uci.edu"]);
    /// assert!(filter.is_valid(&Url::parse("http://ics.uci.edu/about").unwrap()));
    /// assert!(!filter.is_valid(&Url::parse("http://ics.uci.edu/doc.pdf").unwrap()));
    /// ```
    pub fn is_valid(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let host = match url.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };

        if !self
            .allowed_suffixes
            .iter()
            .any(|suffix| matches_suffix(suffix, &host))
        {
            return false;
        }

        if url.query().is_some() {
            return false;
        }

        let lowered = url.as_str().to_lowercase();
        if REJECTED_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return false;
        }

        let path = url.path().to_lowercase();

        if is_calendar_path(&path) {
            return false;
        }

        !has_denied_extension(&path)
    }
}

/// A date segment together with an event keyword marks generated calendar pages
fn is_calendar_path(path: &str) -> bool {
    date_segment().is_match(path) && CALENDAR_KEYWORDS.iter().any(|kw| path.contains(kw))
}

fn has_denied_extension(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') => DENIED_EXTENSIONS.contains(&ext),
        _ => false,
    }
}
