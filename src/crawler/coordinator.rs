//! Crawler coordinator - crawl orchestration
//!
//! This module ties the crawl together:
//! - Opening storage and the frontier, resuming when possible
//! - Tracking the run in the runs table
//! - Spawning, supervising and joining the worker pool
//! - Building the end-of-run summary

use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::fingerprint::FingerprintStore;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{HtmlAnchorParser, MarkupParser};
use crate::crawler::worker::{CrawlContext, Worker};
use crate::output::{
    print_summary, write_markdown_summary, FileLinkSink, LinkSink, RunSummary, StatsAggregator,
};
use crate::storage::{open_storage, FrontierStore, RunStatus};
use crate::url::UrlFilter;
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    ctx: Arc<CrawlContext>,
    run_id: i64,
}

impl Coordinator {
    /// Creates a coordinator with the production components
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded on the run
    /// * `fresh` - Whether to start a fresh crawl (clears existing state)
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - Failed to open storage, seed the frontier, or
    ///   build the HTTP client
    pub fn new(config: Config, config_hash: &str, fresh: bool) -> Result<Self> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        let links = FileLinkSink::open(Path::new(&config.output.discovered_links_path))?;

        Self::with_components(
            config,
            config_hash,
            fresh,
            Box::new(storage),
            Arc::new(fetcher),
            Arc::new(HtmlAnchorParser::new()),
            Arc::new(links),
        )
    }

    /// Creates a coordinator over caller-supplied components
    pub fn with_components(
        config: Config,
        config_hash: &str,
        fresh: bool,
        mut store: Box<dyn FrontierStore>,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn MarkupParser>,
        links: Arc<dyn LinkSink>,
    ) -> Result<Self> {
        let resume = !fresh;
        let run_id = start_run(store.as_mut(), config_hash, resume)?;

        let politeness_delay = Duration::from_millis(config.crawler.politeness_delay_ms);
        let frontier = Frontier::open(store, &config.seeds, resume, politeness_delay)?;

        let ctx = CrawlContext {
            frontier: Arc::new(frontier),
            fetcher,
            parser,
            filter: UrlFilter::new(config.scope.allowed_suffixes.iter().cloned()),
            fingerprints: FingerprintStore::new(),
            stats: StatsAggregator::new(config.scope.root_domain.clone()),
            links,
            max_page_bytes: config.crawler.max_page_bytes,
            politeness_delay,
        };

        Ok(Self {
            config: Arc::new(config),
            ctx: Arc::new(ctx),
            run_id,
        })
    }

    /// The run this coordinator records into
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// The shared frontier
    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.ctx.frontier
    }

    /// Runs the worker pool until the frontier drains
    ///
    /// A worker that ends with a fault (or panics) is replaced while the
    /// frontier still has work, up to `max-worker-restarts` times.
    pub async fn run(self) -> Result<RunSummary> {
        let crawler = &self.config.crawler;
        tracing::info!(
            "Starting crawl run {} with {} workers",
            self.run_id,
            crawler.workers
        );

        let start_time = Instant::now();
        let mut workers = JoinSet::new();
        let mut next_id = 0;

        for _ in 0..crawler.workers {
            spawn_worker(&mut workers, next_id, &self.ctx);
            next_id += 1;
        }

        let mut faults = 0;
        let mut restarts = 0;

        while let Some(joined) = workers.join_next().await {
            let failed = match joined {
                Ok((id, Ok(processed))) => {
                    tracing::debug!("Worker {} exited after {} URLs", id, processed);
                    false
                }
                Ok((id, Err(e))) => {
                    tracing::error!("Worker {} ended with a fault: {}", id, e);
                    true
                }
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    true
                }
            };

            if failed {
                faults += 1;
                if restarts < crawler.max_worker_restarts && !self.ctx.frontier.is_finished() {
                    restarts += 1;
                    tracing::warn!(
                        "Replacing faulted worker ({} of {} restarts)",
                        restarts,
                        crawler.max_worker_restarts
                    );
                    spawn_worker(&mut workers, next_id, &self.ctx);
                    next_id += 1;
                }
            }
        }

        if let Err(e) = self.ctx.links.flush() {
            tracing::warn!("Failed to flush discovered links: {}", e);
        }

        let frontier = &self.ctx.frontier;
        let queued = frontier.queued_len();
        let status = if queued == 0 {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        frontier.with_store(|store| store.finish_run(self.run_id, status))?;

        let summary = RunSummary {
            run_id: self.run_id,
            duration: start_time.elapsed(),
            root_domain: self.ctx.stats.root_domain().to_string(),
            stats: self.ctx.stats.snapshot(crawler.top_words),
            completed: frontier.completed_len(),
            queued,
            worker_faults: faults,
        };

        tracing::info!(
            "Crawl run {} finished ({}): {} unique pages in {:?}",
            self.run_id,
            status.to_db_string(),
            summary.stats.unique_pages,
            summary.duration
        );

        Ok(summary)
    }
}

/// Resumes an interrupted run or records a new one
fn start_run(store: &mut dyn FrontierStore, config_hash: &str, resume: bool) -> Result<i64> {
    if resume {
        if let Some(latest) = store.get_latest_run()? {
            if latest.status == RunStatus::Running {
                tracing::info!("Resuming interrupted run {}", latest.id);
                return Ok(latest.id);
            }
        }
        tracing::info!("No interrupted run found, starting new run");
    } else {
        tracing::info!("Starting fresh run");
    }

    Ok(store.create_run(config_hash)?)
}

fn spawn_worker(
    workers: &mut JoinSet<(usize, Result<usize>)>,
    id: usize,
    ctx: &Arc<CrawlContext>,
) {
    let worker = Worker::new(id, Arc::clone(ctx));
    workers.spawn(async move { (id, worker.run().await) });
}

/// Runs a complete crawl and reports the result
///
/// This function orchestrates the entire crawl process:
///
/// 1. Open storage, resuming an interrupted run unless `fresh`
/// 2. Seed or reload the frontier
/// 3. Run the worker pool until nothing is queued or in flight
/// 4. Print the summary and write it as markdown
///
/// # Example
///
/// ```no_run
/// use tidewalk::config::load_config_with_hash;
/// use tidewalk::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// run_crawl(config, &hash, false).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str, fresh: bool) -> Result<RunSummary> {
    let summary_path = config.output.summary_path.clone();
    let coordinator = Coordinator::new(config, config_hash, fresh)?;
    let summary = coordinator.run().await?;

    print_summary(&summary);
    write_markdown_summary(&summary, Path::new(&summary_path))?;
    tracing::info!("Summary written to {}", summary_path);

    Ok(summary)
}
