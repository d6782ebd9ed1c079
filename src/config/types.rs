use serde::Deserialize;

/// Main configuration structure for Tidewalk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub scope: ScopeConfig,
    pub output: OutputConfig,
    /// URLs that bootstrap a crawl with no prior persisted state
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Minimum time between dispatches to the same host (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Pages larger than this are classified as oversized
    #[serde(rename = "max-page-bytes", default = "default_max_page_bytes")]
    pub max_page_bytes: usize,

    /// How many of the most frequent words the summary reports
    #[serde(rename = "top-words", default = "default_top_words")]
    pub top_words: usize,

    /// How many faulted workers may be replaced during one run
    #[serde(rename = "max-worker-restarts", default = "default_max_worker_restarts")]
    pub max_worker_restarts: usize,
}

fn default_max_page_bytes() -> usize {
    1024 * 1024
}

fn default_top_words() -> usize {
    50
}

fn default_max_worker_restarts() -> usize {
    3
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Restricts which hosts the crawl may visit
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Host suffixes eligible for crawling (e.g. "ics.uci.edu")
    #[serde(rename = "allowed-suffixes")]
    pub allowed_suffixes: Vec<String>,

    /// Root domain whose subdomains get per-subdomain page counts
    #[serde(rename = "root-domain")]
    pub root_domain: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding frontier state
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Append-only log of every URL judged valid by the filter
    #[serde(rename = "discovered-links-path")]
    pub discovered_links_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}
