//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Reducing transport failures to a response with no body

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// What came back from fetching one URL
///
/// A transport failure is not an error here: it is a response without
/// content, with the failure described in `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code, 0 when no response arrived
    pub status: u16,

    /// Raw body bytes, if any were received
    pub content: Option<Vec<u8>>,

    /// Transport or read error description
    pub error: Option<String>,
}

impl FetchResponse {
    /// Builds a response carrying a body
    pub fn ok(status: u16, content: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content: Some(content.into()),
            error: None,
        }
    }

    /// Builds a response for a request that produced no body
    pub fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// Retrieves page content for a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResponse;
}

/// Formats the crawler's user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use tidewalk::config::UserAgentConfig;
/// use tidewalk::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Tidewalk".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.edu/crawler".to_string(),
///     contact_email: "crawler@example.edu".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the configured user agent and timeouts
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResponse {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                return FetchResponse::failed(0, error);
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => FetchResponse::ok(status, body.to_vec()),
            Err(e) => FetchResponse::failed(status, e.to_string()),
        }
    }
}
