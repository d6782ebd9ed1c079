//! Crawl worker
//!
//! A worker repeatedly takes a URL from the frontier, fetches it, decides
//! whether the response is worth expanding, and feeds surviving outlinks back
//! into the frontier.

use crate::crawler::fetcher::{FetchResponse, Fetcher};
use crate::crawler::fingerprint::FingerprintStore;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{extract_outlinks, MarkupParser};
use crate::output::{LinkSink, StatsAggregator};
use crate::url::UrlFilter;
use crate::{CrawlerError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use url::Url;

/// Bodies shorter than this are treated as dead pages
pub const MIN_PAGE_BYTES: usize = 100;

/// How a fetched page is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Worth extracting links and statistics from
    Ok,
    /// Status 200 with (almost) nothing in it
    Dead,
    /// Status 200 with a body over the size limit
    Oversized,
    /// No body received
    FetchFailed,
    /// Non-200 status with a body
    ErrorStatus,
}

/// Classifies a fetch response
///
/// Every outcome other than `PageOutcome::Ok` ends processing of the URL.
pub fn classify_response(response: &FetchResponse, max_page_bytes: usize) -> PageOutcome {
    let body_len = response.content.as_ref().map(Vec::len);

    if response.status == 200 && body_len.unwrap_or(0) < MIN_PAGE_BYTES {
        return PageOutcome::Dead;
    }

    match body_len {
        None => PageOutcome::FetchFailed,
        Some(len) if response.status == 200 && len > max_page_bytes => PageOutcome::Oversized,
        Some(_) if response.status != 200 => PageOutcome::ErrorStatus,
        Some(_) => PageOutcome::Ok,
    }
}

/// Components shared by every worker of a crawl
pub struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub fetcher: Arc<dyn Fetcher>,
    pub parser: Arc<dyn MarkupParser>,
    pub filter: UrlFilter,
    pub fingerprints: FingerprintStore,
    pub stats: StatsAggregator,
    pub links: Arc<dyn LinkSink>,
    pub max_page_bytes: usize,
    pub politeness_delay: Duration,
}

/// One crawl worker
pub struct Worker {
    id: usize,
    ctx: Arc<CrawlContext>,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<CrawlContext>) -> Self {
        Self { id, ctx }
    }

    /// Runs until the frontier is exhausted or a fault occurs
    ///
    /// Returns the number of URLs this worker processed. On a fault or a panic
    /// the URL in hand is still marked complete so the frontier can drain.
    pub async fn run(self) -> Result<usize> {
        let span = tracing::info_span!("worker", id = self.id);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(self) -> Result<usize> {
        tracing::debug!("Worker started");
        let mut processed = 0;

        while let Some(url) = self.ctx.frontier.next_url().await {
            let in_hand = InHand::new(&self.ctx.frontier, &url);
            if let Err(e) = self.process(&url).await {
                tracing::error!("Fault while processing {}: {}", url, e);
                return Err(CrawlerError::Worker {
                    worker_id: self.id,
                    message: e.to_string(),
                });
            }
            in_hand.release();
            processed += 1;

            // Politeness between this worker's own requests
            tokio::time::sleep(self.ctx.politeness_delay).await;
        }

        tracing::debug!("Worker finished after {} URLs", processed);
        Ok(processed)
    }

    async fn process(&self, url: &Url) -> Result<()> {
        let ctx = &self.ctx;
        let response = ctx.fetcher.fetch(url).await;

        let content = match classify_response(&response, ctx.max_page_bytes) {
            PageOutcome::Ok => response.content.unwrap_or_default(),
            outcome => {
                log_skipped(url, outcome, &response);
                ctx.frontier.mark_complete(url)?;
                return Ok(());
            }
        };

        if ctx.fingerprints.record(&content) {
            self.expand(url, &content)?;
        } else {
            tracing::info!("Duplicate content at {}, not following links", url);
        }

        ctx.frontier.mark_complete(url)?;
        ctx.stats.record_page(url, &content);
        Ok(())
    }

    fn expand(&self, url: &Url, content: &[u8]) -> Result<()> {
        let ctx = &self.ctx;
        let outlinks = extract_outlinks(ctx.parser.as_ref(), content, url);
        let mut added = 0;

        for link in outlinks.iter().filter(|link| ctx.filter.is_valid(link)) {
            ctx.links.record(link)?;
            if ctx.frontier.add_url(link.as_str())? {
                added += 1;
            }
        }

        tracing::debug!(
            "Processed {} ({} outlinks, {} new)",
            url,
            outlinks.len(),
            added
        );
        Ok(())
    }
}

/// The URL a worker is processing
///
/// Dropping it before `release` (an early return or a panic unwinding
/// through the worker) marks the URL complete, so it never stays in flight.
struct InHand<'a> {
    frontier: &'a Frontier,
    url: Option<Url>,
}

impl<'a> InHand<'a> {
    fn new(frontier: &'a Frontier, url: &Url) -> Self {
        Self {
            frontier,
            url: Some(url.clone()),
        }
    }

    /// Processing finished normally and already marked the URL complete
    fn release(mut self) {
        self.url = None;
    }
}

impl Drop for InHand<'_> {
    fn drop(&mut self) {
        if let Some(url) = self.url.take() {
            if let Err(e) = self.frontier.mark_complete(&url) {
                tracing::error!("Could not mark {} complete: {}", url, e);
            }
        }
    }
}

fn log_skipped(url: &Url, outcome: PageOutcome, response: &FetchResponse) {
    let size = response.content.as_ref().map_or(0, Vec::len);
    match outcome {
        PageOutcome::Dead => {
            tracing::warn!("Dead page {} ({} bytes)", url, size)
        }
        PageOutcome::Oversized => {
            tracing::warn!("Skipping oversized page {} ({} bytes)", url, size)
        }
        PageOutcome::FetchFailed => tracing::warn!(
            "Fetch failed for {} (status {}): {}",
            url,
            response.status,
            response.error.as_deref().unwrap_or("no content")
        ),
        PageOutcome::ErrorStatus => {
            tracing::warn!("HTTP {} for {}", response.status, url)
        }
        PageOutcome::Ok => {}
    }
}
