//! Output module for crawl results
//!
//! This module handles:
//! - Recording discovered links as they are found
//! - Aggregating page statistics across workers
//! - Printing and writing the end-of-run summary

mod links;
mod markdown;
pub mod stats;
mod traits;

pub use links::{FileLinkSink, MemoryLinkSink};
pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use stats::{extract_words, LongestPage, StatsAggregator, StatsSnapshot};
pub use traits::{LinkSink, OutputError, OutputResult, RunSummary};

/// Prints the run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    let stats = &summary.stats;

    println!("\n=== Crawl Summary ===\n");
    println!("Run ID: {}", summary.run_id);
    println!(
        "Duration: {:.1}s ({:.2} pages/s)",
        summary.duration.as_secs_f64(),
        summary.pages_per_second()
    );
    println!("Unique pages: {}", stats.unique_pages);
    println!("Completed URLs: {}", summary.completed);
    if summary.queued > 0 {
        println!("Still queued: {}", summary.queued);
    }
    if summary.worker_faults > 0 {
        println!("Worker faults: {}", summary.worker_faults);
    }

    match &stats.longest_page {
        Some(page) => println!("Longest page: {} ({} words)", page.url, page.word_count),
        None => println!("Longest page: none"),
    }

    if !stats.top_words.is_empty() {
        println!("\nTop {} words:", stats.top_words.len());
        for (rank, (word, count)) in stats.top_words.iter().enumerate() {
            println!("  {:>3}. {:<20} {}", rank + 1, word, count);
        }
    }

    if !stats.subdomains.is_empty() {
        println!("\nSubdomains of {}:", summary.root_domain);
        for (subdomain, count) in &stats.subdomains {
            println!("  {}, {}", subdomain, count);
        }
    }

    println!();
}
