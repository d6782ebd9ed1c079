/// Checks if a host falls under an allow-listed suffix
///
/// The suffix matches the host itself or any subdomain of it, on a label
/// boundary: "ics.uci.edu" matches "ics.uci.edu" and "www.ics.uci.edu" but
/// not "physics.uci.edu".
///
/// # Examples
///
/// ```
/// use tidewalk::url::matches_suffix;
///
/// assert!(matches_suffix("ics.uci.edu", "ics.uci.edu"));
/// assert!(matches_suffix("ics.uci.edu", "vision.ics.uci.edu"));
/// assert!(!matches_suffix("ics.uci.edu", "physics.uci.edu"));
/// assert!(!matches_suffix("ics.uci.edu", "evil.com"));
/// ```
pub fn matches_suffix(suffix: &str, host: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }

    match host.strip_suffix(suffix) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}
