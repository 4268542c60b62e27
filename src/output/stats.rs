//! End-of-run summaries printed to stdout

use crate::crawler::TraversalOutcome;
use crate::download::{BatchEntry, BatchSummary};
use std::path::Path;

/// Prints what a listing crawl collected and why it stopped
pub fn print_traversal_summary(outcome: &TraversalOutcome, output: &Path) {
    println!("=== Collection Summary ===\n");

    match outcome.page_count_hint {
        Some(hint) => println!("  Page count shown: {}", hint),
        None => println!("  Page count shown: unknown"),
    }
    println!("  Page ceiling: {}", outcome.ceiling);
    println!("  Pages visited: {}", outcome.pages_visited.len() + 1);
    println!("  Records collected: {}", outcome.items.len());
    println!("  Stopped because: {}", outcome.stop);
    println!("  Output: {}", output.display());
}

/// Prints batch totals and every failed record
pub fn print_batch_summary(entries: &[BatchEntry], manifest: &Path) {
    let summary = BatchSummary::from_entries(entries);

    println!("=== Download Summary ===\n");
    println!("  Records: {}", summary.total);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("  Files saved: {}", summary.files_saved);
    println!();

    let failures: Vec<_> = entries.iter().filter(|e| !e.outcome.is_ok()).collect();
    if !failures.is_empty() {
        println!("Failures ({}):", failures.len());
        for entry in failures {
            println!("  - {}: {}", entry.target.title, entry.outcome.info());
        }
        println!();
    }

    println!("Results saved to {}", manifest.display());
}
