//! Markdown summary generation
//!
//! This module renders the end-of-run report: page counts, the longest page,
//! the most common words and the per-subdomain breakdown.

use crate::output::traits::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary to a file
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn write_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Tidewalk Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.duration.as_secs_f64()
    ));
    md.push_str(&format!(
        "- **Rate**: {:.2} pages/second\n",
        summary.pages_per_second()
    ));
    md.push_str(&format!("- **Worker Faults**: {}\n\n", summary.worker_faults));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Unique Pages**: {}\n", stats.unique_pages));
    md.push_str(&format!("- **Completed URLs**: {}\n", summary.completed));
    md.push_str(&format!("- **Still Queued**: {}\n", summary.queued));
    match &stats.longest_page {
        Some(page) => md.push_str(&format!(
            "- **Longest Page**: {} ({} words)\n\n",
            page.url, page.word_count
        )),
        None => md.push_str("- **Longest Page**: none\n\n"),
    }

    if !stats.top_words.is_empty() {
        md.push_str(&format!("## Top {} Words\n\n", stats.top_words.len()));
        md.push_str("| Rank | Word | Count |\n");
        md.push_str("|------|------|-------|\n");
        for (rank, (word, count)) in stats.top_words.iter().enumerate() {
            md.push_str(&format!("| {} | {} | {} |\n", rank + 1, word, count));
        }
        md.push('\n');
    }

    if !stats.subdomains.is_empty() {
        md.push_str(&format!("## Subdomains of {}\n\n", summary.root_domain));
        md.push_str("| Subdomain | Pages |\n");
        md.push_str("|-----------|-------|\n");
        for (subdomain, count) in &stats.subdomains {
            md.push_str(&format!("| {} | {} |\n", subdomain, count));
        }
        md.push('\n');
    }

    md
}
