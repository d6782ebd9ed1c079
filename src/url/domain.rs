use url::Url;

/// Extracts the host from a URL, lowercased
///
/// The host is the politeness key: every URL sharing it shares one dispatch
/// timer, regardless of port.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidewalk::url::extract_host;
///
/// let url = Url::parse("https://Vision.ICS.uci.edu/path").unwrap();
/// assert_eq!(extract_host(&url), Some("vision.ics.uci.edu".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
