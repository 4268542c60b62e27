//! Results manifest written after a download batch

use crate::download::BatchEntry;
use crate::HarvestError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the output directory
pub const MANIFEST_FILE: &str = "download_results.csv";

pub const MANIFEST_COLUMNS: [&str; 5] = ["title", "detail_url", "section", "ok", "info"];

/// Writes `{out_dir}/download_results.csv` and returns its path
pub fn write_manifest(out_dir: &Path, entries: &[BatchEntry]) -> Result<PathBuf, HarvestError> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(MANIFEST_FILE);
    let file = std::fs::File::create(&path)?;
    write_manifest_to(file, entries)?;
    Ok(path)
}

/// Writes one manifest row per batch entry, in batch order
///
/// The `title`, `detail_url` and `section` columns echo the input cells, not
/// the defaults the downloader fell back to.
pub fn write_manifest_to<W: Write>(writer: W, entries: &[BatchEntry]) -> Result<(), HarvestError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(MANIFEST_COLUMNS)?;

    for entry in entries {
        let raw = &entry.target.raw;
        let info = entry.outcome.info();
        writer.write_record([
            raw.title.as_str(),
            raw.detail_url.as_str(),
            raw.section.as_str(),
            if entry.outcome.is_ok() { "true" } else { "false" },
            info.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
