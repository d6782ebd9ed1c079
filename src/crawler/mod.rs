//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier with per-host politeness
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing and outlink extraction
//! - Content fingerprinting for duplicate suppression
//! - The worker loop and the coordinator that supervises it

mod coordinator;
mod fetcher;
mod fingerprint;
mod frontier;
mod parser;
mod worker;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, user_agent_string, FetchResponse, Fetcher, HttpFetcher};
pub use fingerprint::{fingerprint, Fingerprint, FingerprintStore};
pub use frontier::Frontier;
pub use parser::{extract_outlinks, HtmlAnchorParser, MarkupParser, ParseError};
pub use worker::{classify_response, CrawlContext, PageOutcome, Worker, MIN_PAGE_BYTES};
