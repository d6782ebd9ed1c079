use crate::UrlError;
use url::Url;

/// Normalizes a URL into the form the frontier stores
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but http:// and https://
/// 3. Lowercase the host (the parser already drops default ports and
///    resolves dot segments; an empty path becomes `/`)
/// 4. Remove the fragment (everything after #)
///
/// The query string is kept so the filter can see it and reject the URL.
///
/// # Examples
///
/// ```
/// use tidewalk::url::normalize_url;
///
/// let url = normalize_url("http://WWW.ICS.UCI.EDU/about#team").unwrap();
/// assert_eq!(url.as_str(), "http://www.ics.uci.edu/about");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    Ok(url)
}

/// Returns the `scheme://host[:port]/path` key that identifies a page
///
/// Two URLs that differ only by query or fragment share a page key.
pub fn page_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}
