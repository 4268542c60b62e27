//! Output module for the files and summaries a run produces
//!
//! This module handles:
//! - The collected-records CSV (written by `collect`, read by `download`)
//! - The `download_results.csv` manifest
//! - Summaries printed at the end of a run

mod manifest;
mod records_csv;
mod stats;

pub use manifest::{write_manifest, write_manifest_to, MANIFEST_COLUMNS, MANIFEST_FILE};
pub use records_csv::{read_targets, read_targets_from, write_records, write_records_to, RECORD_COLUMNS};
pub use stats::{print_batch_summary, print_traversal_summary};
