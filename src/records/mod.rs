//! Record types shared by the collector and the downloader
//!
//! - `Section`, `ItemRecord`: what a listing crawl produces
//! - `FileType`, `DownloadTarget`: what the downloader consumes
//! - `DownloadOutcome`, `FailureReason`: what the downloader reports

mod item;
mod outcome;

pub use item::{DownloadTarget, FileType, ItemRecord, RawCells, Section};
pub use outcome::{DownloadOutcome, FailureReason};
