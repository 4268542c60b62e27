//! Saving downloaded documents and debug pages
//!
//! Documents are written to a temporary sibling first and only then linked
//! into place, so a reader never sees a half-written file at its final path
//! and an existing file is never replaced.

use crate::HarvestError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Longest sanitized title, in characters
pub const MAX_TITLE_CHARS: usize = 180;

/// Directory (under the output root) that receives debug pages
pub const DEBUG_DIR: &str = "debug_html";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Makes a title safe to use as a file name
///
/// Alphanumerics (any script) and ` ._-()` are kept, everything else becomes
/// `_`, and the result is cut to `MAX_TITLE_CHARS` characters.
///
/// # Example
///
/// ```
/// use template_harvest::download::sanitize_title;
///
/// assert_eq!(sanitize_title("Sale/Purchase: v2 (draft)"), "Sale_Purchase_ v2 (draft)");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || " ._-()".contains(c) {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TITLE_CHARS)
        .collect();

    if sanitized.is_empty() {
        "item".to_string()
    } else {
        sanitized
    }
}

/// Paths a document may be saved under, in preference order
///
/// `{dir}/{title}{ext}` first, then `{dir}/{title}_{id}{ext}`.
pub fn candidate_paths(dir: &Path, title: &str, resource_id: &str, ext: &str) -> [PathBuf; 2] {
    let title = sanitize_title(title);
    [
        dir.join(format!("{}{}", title, ext)),
        dir.join(format!("{}_{}{}", title, sanitize_title(resource_id), ext)),
    ]
}

/// A file being written under a temporary name next to its destination
///
/// Dropping it without `commit` removes the temporary file.
pub struct AtomicFile {
    temp_path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl AtomicFile {
    /// Creates the temporary sibling of `destination`
    ///
    /// The parent directory is created if needed.
    pub async fn create(destination: &Path) -> std::io::Result<Self> {
        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).await?;

        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = dir.join(format!(
            ".{}.{}-{}.part",
            name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let file = File::create(&temp_path).await?;
        Ok(Self {
            temp_path,
            file: Some(file),
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub async fn write_chunk(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(bytes).await,
            None => Err(std::io::Error::new(ErrorKind::Other, "file already closed")),
        }
    }

    /// Moves the finished file to the first candidate path that is still free
    ///
    /// Existing files are never replaced. Returns the path used.
    pub async fn commit(mut self, candidates: &[PathBuf]) -> Result<PathBuf, HarvestError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        for candidate in candidates {
            match fs::hard_link(&self.temp_path, candidate).await {
                Ok(()) => {
                    self.committed = true;
                    if let Err(e) = fs::remove_file(&self.temp_path).await {
                        tracing::debug!("Could not remove {}: {}", self.temp_path.display(), e);
                    }
                    return Ok(candidate.clone());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    // Filesystems without hard links: check, then rename.
                    tracing::debug!("Hard link failed ({}), falling back to rename", e);
                    if fs::try_exists(candidate).await? {
                        continue;
                    }
                    fs::rename(&self.temp_path, candidate).await?;
                    self.committed = true;
                    return Ok(candidate.clone());
                }
            }
        }

        Err(HarvestError::PathCollision(
            candidates
                .first()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ))
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

/// Persists an unexpected response body for manual inspection
///
/// Written to `{out_dir}/debug_html/{id}_{type_code}_{reason}.html`.
pub async fn save_debug_artifact(
    out_dir: &Path,
    resource_id: &str,
    type_code: u8,
    reason: &str,
    body: &[u8],
) -> std::io::Result<PathBuf> {
    let dir = out_dir.join(DEBUG_DIR);
    fs::create_dir_all(&dir).await?;

    let path = dir.join(format!(
        "{}_{}_{}.html",
        sanitize_title(resource_id),
        type_code,
        reason
    ));
    fs::write(&path, body).await?;
    Ok(path)
}
