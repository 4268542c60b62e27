//! Collected-records CSV
//!
//! The collector writes `section,title,detail_url` rows; the downloader reads
//! any header-keyed CSV and maps its columns onto `DownloadTarget`s.

use crate::records::{DownloadTarget, ItemRecord};
use crate::HarvestError;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

/// Header of the collected-records file
pub const RECORD_COLUMNS: [&str; 3] = ["section", "title", "detail_url"];

/// Writes collected records to `path`, replacing any previous file
pub fn write_records<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a ItemRecord>,
) -> Result<usize, HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let written = write_records_to(file, records)?;
    tracing::info!("Wrote {} records to {}", written, path.display());
    Ok(written)
}

/// Writes collected records as CSV to any writer
pub fn write_records_to<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a ItemRecord>,
) -> Result<usize, HarvestError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(RECORD_COLUMNS)?;

    let mut written = 0;
    for record in records {
        writer.write_record([
            record.section.as_str(),
            record.title.as_str(),
            record.detail_url.as_str(),
        ])?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

/// Reads download targets from the CSV at `path`
pub fn read_targets(path: &Path) -> Result<Vec<DownloadTarget>, HarvestError> {
    let file = std::fs::File::open(path)?;
    let targets = read_targets_from(file)?;
    tracing::info!("Read {} rows from {}", targets.len(), path.display());
    Ok(targets)
}

/// Reads download targets from CSV data with a header row
///
/// Short rows are allowed; missing cells count as empty.
pub fn read_targets_from<R: Read>(reader: R) -> Result<Vec<DownloadTarget>, HarvestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut targets = Vec::new();
    for row in reader.records() {
        let row = row?;
        let fields: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(row.iter().map(str::to_string))
            .collect();
        targets.push(DownloadTarget::from_row(&fields));
    }

    Ok(targets)
}
