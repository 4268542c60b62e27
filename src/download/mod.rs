//! Download module for fetching templates referenced by collected records
//!
//! - `client`: the shared HTTP session and browser cookie parsing
//! - `classifier`: decides what a 200 response actually contains
//! - `writer`: file names, atomic publication, debug pages
//! - `retrier`: the per-record, per-type retry loop
//! - `batch`: bounded fan-out over many records

mod batch;
mod classifier;
mod client;
mod retrier;
mod writer;

pub use batch::{batch_progress, run_batch, saved_files, BatchEntry, BatchSummary};
pub use classifier::{
    classify, parse_content_disposition, Classifier, ContentKind, ResponseFacts, WordFormat,
    CLASSIFIERS, PDF_SIGNATURE,
};
pub use client::{build_http_client, cookie_jar, parse_cookie_string};
pub use retrier::{Downloader, RetryPolicy, NOT_BINARY, SNIFF_LEN};
pub use writer::{
    candidate_paths, sanitize_title, save_debug_artifact, AtomicFile, DEBUG_DIR, MAX_TITLE_CHARS,
};
