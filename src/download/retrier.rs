//! Retrying template fetches
//!
//! For every requested file type of a record the downloader walks an
//! `AttemptTracker` through its budget:
//! 1. Request the endpoint with the detail page as referer
//! 2. Classify the response from its headers and the first bytes of the body
//! 3. Stream an accepted body to disk, or keep a debug copy of anything else
//! 4. Back off linearly and try again until the budget is spent

use crate::config::DownloadConfig;
use crate::download::classifier::{classify, ResponseFacts};
use crate::download::writer::{candidate_paths, sanitize_title, save_debug_artifact, AtomicFile};
use crate::records::{DownloadOutcome, DownloadTarget, FailureReason, FileType};
use crate::state::{AttemptState, AttemptTracker};
use crate::url::{download_endpoint, extract_resource_id};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE, REFERER};
use reqwest::{Client, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Last-error text for a 200 response that was not a document
pub const NOT_BINARY: &str = "not_binary_content";

/// Body bytes gathered before classifying, unless the body ends sooner
pub const SNIFF_LEN: usize = 8;

/// How often, and how patiently, a single type is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial request
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Added to the delay once per failed attempt
    pub step: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            step: Duration::from_millis(config.retry_step_ms),
        }
    }

    /// Delay after the zero-based attempt `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay + self.step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DownloadConfig::default())
    }
}

/// Fetches the templates of one record at a time
///
/// Cheap to clone; clones share the HTTP session.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    base_url: Url,
    out_dir: PathBuf,
    policy: RetryPolicy,
}

impl Downloader {
    pub fn new(client: Client, base_url: Url, out_dir: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url,
            out_dir: out_dir.into(),
            policy,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Downloads every requested type of `target`
    ///
    /// Records without a detail URL or a resource id fail before any request
    /// is made. Otherwise every type is tried in order, even after an earlier
    /// one failed; the record only succeeds if all of them do.
    pub async fn fetch(&self, target: &DownloadTarget, types: &[FileType]) -> DownloadOutcome {
        let Some(detail_url) = target.detail_url.as_deref().filter(|u| !u.is_empty()) else {
            tracing::warn!("'{}' has no detail URL", target.title);
            return DownloadOutcome::failed(FailureReason::NoDetailUrl);
        };

        let Some(resource_id) = extract_resource_id(detail_url) else {
            tracing::warn!("No resource id in {}", detail_url);
            return DownloadOutcome::failed(FailureReason::NoId);
        };

        let mut saved = Vec::new();
        let mut reasons = Vec::new();

        for &file_type in types {
            match self
                .fetch_type(target, detail_url, &resource_id, file_type)
                .await
            {
                Ok(path) => saved.push(path),
                Err(reason) => reasons.push(reason),
            }
        }

        if reasons.is_empty() {
            DownloadOutcome::Saved(saved)
        } else {
            DownloadOutcome::Failed { reasons, saved }
        }
    }

    async fn fetch_type(
        &self,
        target: &DownloadTarget,
        detail_url: &str,
        resource_id: &str,
        file_type: FileType,
    ) -> Result<PathBuf, FailureReason> {
        let exhausted = |last_error: String| FailureReason::Exhausted {
            file_type,
            last_error,
        };

        let endpoint = download_endpoint(&self.base_url, resource_id, file_type)
            .map_err(|e| exhausted(e.to_string()))?;
        let mut tracker = AttemptTracker::new(self.policy.max_retries);

        loop {
            tracing::debug!(
                "GET {} (attempt {}/{})",
                endpoint,
                tracker.attempt() + 1,
                tracker.max_attempts()
            );

            match self
                .attempt(&endpoint, target, detail_url, resource_id, file_type)
                .await
            {
                Ok(path) => {
                    tracker.accept();
                    tracing::info!("Saved {}", path.display());
                    return Ok(path);
                }
                Err(error) => {
                    tracing::warn!(
                        "{} {} attempt {}/{} failed: {}",
                        resource_id,
                        file_type,
                        tracker.attempt() + 1,
                        tracker.max_attempts(),
                        error
                    );

                    if tracker.fail(error) == AttemptState::Exhausted {
                        let last_error = tracker.last_error().unwrap_or_default().to_string();
                        return Err(exhausted(last_error));
                    }

                    let delay = self.policy.delay_for(tracker.attempt());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    tracker.resume();
                }
            }
        }
    }

    /// One request; returns the saved path or the last-error text
    async fn attempt(
        &self,
        endpoint: &Url,
        target: &DownloadTarget,
        detail_url: &str,
        resource_id: &str,
        file_type: FileType,
    ) -> Result<PathBuf, String> {
        let mut response = self
            .client
            .get(endpoint.clone())
            .header(REFERER, detail_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.bytes().await.unwrap_or_default();
            self.keep_debug_copy(
                resource_id,
                file_type,
                &format!("status{}", status.as_u16()),
                &body,
            )
            .await;
            return Err(format!("status {}", status.as_u16()));
        }

        let content_type = header_value(&response, CONTENT_TYPE);
        let disposition = header_value(&response, CONTENT_DISPOSITION);
        let mut head = Vec::with_capacity(SNIFF_LEN);
        while head.len() < SNIFF_LEN {
            match response.chunk().await.map_err(|e| e.to_string())? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }

        let kind = classify(&ResponseFacts {
            content_type: content_type.as_deref(),
            disposition: disposition.as_deref(),
            head: &head,
        });

        let Some(ext) = kind.extension() else {
            let mut body = head;
            while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
                body.extend_from_slice(&chunk);
            }
            self.keep_debug_copy(resource_id, file_type, "notbinary", &body)
                .await;
            return Err(NOT_BINARY.to_string());
        };

        let dir = self.out_dir.join(sanitize_title(&target.section));
        let candidates = candidate_paths(&dir, &target.title, resource_id, ext);

        let mut file = AtomicFile::create(&candidates[0])
            .await
            .map_err(|e| e.to_string())?;
        file.write_chunk(&head).await.map_err(|e| e.to_string())?;
        while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
            file.write_chunk(&chunk).await.map_err(|e| e.to_string())?;
        }

        file.commit(&candidates).await.map_err(|e| e.to_string())
    }

    async fn keep_debug_copy(&self, resource_id: &str, file_type: FileType, reason: &str, body: &[u8]) {
        match save_debug_artifact(&self.out_dir, resource_id, file_type.type_code(), reason, body)
            .await
        {
            Ok(path) => tracing::info!("Debug page saved to {}", path.display()),
            Err(e) => tracing::warn!("Could not save debug page for {}: {}", resource_id, e),
        }
    }
}

fn header_value(response: &Response, name: HeaderName) -> Option<String> {
    response.headers().get(name).map(header_text)
}

/// Header text, decoding raw UTF-8 bytes that `to_str` refuses
fn header_text(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
    }
}
