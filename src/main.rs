//! Tidewalk main entry point
//!
//! This is the command-line interface for the Tidewalk crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use tidewalk::config::{load_config_with_hash, Config};
use tidewalk::crawler::run_crawl;
use tidewalk::state::EntryState;
use tidewalk::storage::{FrontierStore, SqliteStorage};
use tidewalk::url::{normalize_url, UrlFilter};
use tracing_subscriber::EnvFilter;

/// Tidewalk: a polite, restartable web crawler
///
/// Tidewalk crawls an allow-listed set of hosts with several workers,
/// spacing requests to each host, skipping duplicate content, and
/// summarizing what it found. An interrupted crawl resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "tidewalk")]
#[command(version = "1.0.0")]
#[command(about = "A polite, restartable web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl, failing if there is no saved state
    /// (resuming is the default whenever state exists)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, discarding saved frontier state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show saved frontier state and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        if cli.resume {
            require_saved_state(&config)?;
        }
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidewalk=info,warn"),
            1 => EnvFilter::new("tidewalk=debug,info"),
            2 => EnvFilter::new("tidewalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the configuration and usable seeds
fn handle_dry_run(config: &Config) {
    println!("=== Tidewalk Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Politeness delay: {}ms",
        config.crawler.politeness_delay_ms
    );
    println!("  Max page size: {} bytes", config.crawler.max_page_bytes);
    println!("  Top words: {}", config.crawler.top_words);
    println!(
        "  Max worker restarts: {}",
        config.crawler.max_worker_restarts
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nScope:");
    println!("  Root domain: {}", config.scope.root_domain);
    for suffix in &config.scope.allowed_suffixes {
        println!("  - {}", suffix);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Discovered links: {}", config.output.discovered_links_path);
    println!("  Summary: {}", config.output.summary_path);

    let filter = UrlFilter::new(config.scope.allowed_suffixes.iter().cloned());
    let mut accepted = 0;
    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        match normalize_url(seed) {
            Ok(url) if filter.is_valid(&url) => {
                accepted += 1;
                println!("  ✓ {}", url);
            }
            Ok(url) => println!("  ✗ {} (outside crawl scope)", url),
            Err(e) => println!("  ✗ {} ({})", seed, e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ {} of {} seeds pass the URL filter", accepted, config.seeds.len());
}

/// Handles the --stats mode: shows saved frontier state
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let queued = storage.count_by_state(EntryState::Queued)?;
    let complete = storage.count_by_state(EntryState::Complete)?;

    println!("=== Frontier ===\n");
    println!("Queued:   {}", queued);
    println!("Complete: {}", complete);
    println!("Total:    {}", queued + complete);

    println!("\n=== Latest Run ===\n");
    match storage.get_latest_run()? {
        Some(run) => {
            println!("Run ID:  {}", run.id);
            println!("Status:  {}", run.status.to_db_string());
            println!("Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("Finished: {}", finished);
            }
            println!("Config:  {}", run.config_hash);
        }
        None => println!("No runs recorded"),
    }

    Ok(())
}

/// Checks that an explicit --resume has a saved frontier to continue from
fn require_saved_state(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let saved = storage.count_by_state(EntryState::Queued)?
        + storage.count_by_state(EntryState::Complete)?;

    if saved == 0 {
        tracing::error!(
            "Nothing to resume in {}; run without --resume to start a new crawl",
            config.output.database_path
        );
        return Err("no saved frontier state to resume".into());
    }

    tracing::info!("Resuming from {} saved frontier entries", saved);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding saved state)");
    } else {
        tracing::info!("Starting crawl (will resume from saved state if present)");
    }

    tracing::info!(
        "Workers: {}, allowed suffixes: {}, seeds: {}",
        config.crawler.workers,
        config.scope.allowed_suffixes.len(),
        config.seeds.len()
    );

    match run_crawl(config, config_hash, fresh).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed successfully ({} worker faults)",
                summary.worker_faults
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
