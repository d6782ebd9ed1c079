//! URL handling module for Tidewalk
//!
//! This module provides URL normalization, host extraction, suffix matching,
//! and the crawl-eligibility filter.

mod domain;
mod filter;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::extract_host;
pub use filter::UrlFilter;
pub use matcher::matches_suffix;
pub use normalize::{normalize_url, page_key};

/// Checks whether a host belongs to a root domain family
///
/// Returns the host itself as the subdomain key when it does.
///
/// # Examples
///
/// ```
/// use tidewalk::url::subdomain_of;
///
/// assert_eq!(subdomain_of("vision.ics.uci.edu", "uci.edu"), Some("vision.ics.uci.edu"));
/// assert_eq!(subdomain_of("uci.edu", "uci.edu"), Some("uci.edu"));
/// assert_eq!(subdomain_of("evil.com", "uci.edu"), None);
/// ```
pub fn subdomain_of<'a>(host: &'a str, root_domain: &str) -> Option<&'a str> {
    if matches_suffix(root_domain, host) {
        Some(host)
    } else {
        None
    }
}
