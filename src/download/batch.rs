//! Batch downloader
//!
//! Fans out one task per record over a bounded worker pool. Entries are
//! reported as they finish, while the returned list keeps input order by
//! slot index. Only the caller task writes to that list, so no lock is
//! needed around it. A task that panics only fails its own record.

use crate::download::retrier::Downloader;
use crate::records::{DownloadOutcome, DownloadTarget, FailureReason, FileType};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of one record in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub target: DownloadTarget,
    pub outcome: DownloadOutcome,
}

/// Totals over a finished batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub files_saved: usize,
}

impl BatchSummary {
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        let succeeded = entries.iter().filter(|e| e.outcome.is_ok()).count();
        Self {
            total: entries.len(),
            succeeded,
            failed: entries.len() - succeeded,
            files_saved: entries
                .iter()
                .map(|e| e.outcome.saved_paths().len())
                .sum(),
        }
    }
}

/// Progress bar over `total` records, drawn on stderr
pub fn batch_progress(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress
}

/// Downloads every target with at most `workers` records in flight
///
/// `progress` advances once per finished record. Returns one entry per
/// target, in the order given.
pub async fn run_batch(
    downloader: Arc<Downloader>,
    targets: Vec<DownloadTarget>,
    types: &[FileType],
    workers: usize,
    progress: &ProgressBar,
) -> Vec<BatchEntry> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let types: Arc<[FileType]> = types.into();

    tracing::info!(
        "Downloading {} records with {} workers",
        targets.len(),
        workers.max(1)
    );
    progress.set_length(targets.len() as u64);

    let mut tasks = JoinSet::new();
    for (index, target) in targets.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let downloader = downloader.clone();
        let types = types.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let download = tokio::spawn(async move { downloader.fetch(&target, &types).await });
            (index, download.await)
        });
    }

    let mut outcomes: Vec<Option<DownloadOutcome>> = targets.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = match joined {
            Ok(slot) => slot,
            Err(e) => {
                tracing::error!("Download slot task failed: {}", e);
                continue;
            }
        };

        let title = &targets[index].title;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Download task for '{}' failed: {}", title, e);
                DownloadOutcome::failed(FailureReason::TaskFailed(e.to_string()))
            }
        };

        progress.suspend(|| {
            if outcome.is_ok() {
                tracing::info!("[ok] {}", title);
            } else {
                tracing::warn!("[failed] {}: {}", title, outcome.info());
            }
        });
        progress.set_message(title.clone());
        progress.inc(1);
        outcomes[index] = Some(outcome);
    }
    progress.finish_and_clear();

    targets
        .into_iter()
        .zip(outcomes)
        .map(|(target, outcome)| BatchEntry {
            target,
            outcome: outcome.unwrap_or_else(|| {
                DownloadOutcome::failed(FailureReason::TaskFailed("no result".to_string()))
            }),
        })
        .collect()
}

/// Every file saved across a batch
pub fn saved_files(entries: &[BatchEntry]) -> Vec<PathBuf> {
    entries
        .iter()
        .flat_map(|e| e.outcome.saved_paths().iter().cloned())
        .collect()
}
