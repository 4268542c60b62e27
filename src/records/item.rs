/// Listing sections, collected item records and download targets
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Which listing of the portal a record came from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Nationally published templates
    National,

    /// Locally published templates
    Local,
}

impl Section {
    /// Returns the lowercase name used in CSV files and directory names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Local => "local",
        }
    }

    /// Returns the portal path of the first listing page for this section
    pub fn start_path(&self) -> &'static str {
        match self {
            Self::National => "/National",
            Self::Local => "/Local",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Section {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "national" => Ok(Self::National),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::Validation(format!(
                "section must be 'national' or 'local', got '{}'",
                other
            ))),
        }
    }
}

/// A single listing entry, identified by its detail URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub section: Section,
    pub title: String,
    pub detail_url: String,
}

impl ItemRecord {
    pub fn new(section: Section, title: impl Into<String>, detail_url: impl Into<String>) -> Self {
        Self {
            section,
            title: title.into(),
            detail_url: detail_url.into(),
        }
    }
}

/// A downloadable template format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Word,
}

impl FileType {
    /// Numeric code the download endpoint expects in its `type` parameter
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Pdf => 2,
            Self::Word => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
        }
    }

    /// Parses a comma-separated, ordered type list such as `"pdf,word"`
    ///
    /// Blank entries are skipped; an empty list falls back to `[pdf]`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ConfigError> {
        let types = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Self>, _>>()?;

        if types.is_empty() {
            Ok(vec![Self::Pdf])
        } else {
            Ok(types)
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "word" => Ok(Self::Word),
            other => Err(ConfigError::UnknownFileType(other.to_string())),
        }
    }
}

/// One row of the downloader's input table
///
/// Unlike `ItemRecord`, every field is taken as-is from the input file, so the
/// section is a free-form directory label and the detail URL may be missing.
/// The resolved fields drive the download; `raw` keeps the cells of the
/// canonical columns for the results manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub title: String,
    pub detail_url: Option<String>,
    pub section: String,
    pub raw: RawCells,
}

/// Input cells under the exact `title`, `detail_url` and `section` headers
///
/// A missing column reads as an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCells {
    pub title: String,
    pub detail_url: String,
    pub section: String,
}

impl DownloadTarget {
    /// Builds a target whose raw cells echo the given values
    pub fn new(title: impl Into<String>, detail_url: Option<&str>, section: impl Into<String>) -> Self {
        let title = title.into();
        let section = section.into();
        let raw = RawCells {
            title: title.clone(),
            detail_url: detail_url.unwrap_or_default().to_string(),
            section: section.clone(),
        };
        Self {
            title,
            detail_url: detail_url.map(str::to_string),
            section,
            raw,
        }
    }

    /// Builds a target from a header-keyed CSV row, honouring column aliases
    ///
    /// | Field | Columns tried | Default |
    /// |-------|---------------|---------|
    /// | detail_url | `detail_url`, `file_url`, `detail` | none |
    /// | title | `title`, `name` | `item` |
    /// | section | `section` | `unknown` |
    pub fn from_row(row: &HashMap<String, String>) -> Self {
        let detail_url = first_non_empty(row, &["detail_url", "file_url", "detail"]);
        let title = first_non_empty(row, &["title", "name"]).unwrap_or_else(|| "item".to_string());
        let section = first_non_empty(row, &["section"]).unwrap_or_else(|| "unknown".to_string());

        let cell = |column: &str| row.get(column).cloned().unwrap_or_default();
        let raw = RawCells {
            title: cell("title"),
            detail_url: cell("detail_url"),
            section: cell("section"),
        };

        Self {
            title,
            detail_url,
            section,
            raw,
        }
    }
}

impl From<&ItemRecord> for DownloadTarget {
    fn from(record: &ItemRecord) -> Self {
        Self::new(
            record.title.clone(),
            Some(record.detail_url.as_str()),
            record.section.as_str(),
        )
    }
}

fn first_non_empty(row: &HashMap<String, String>, columns: &[&str]) -> Option<String> {
    columns
        .iter()
        .filter_map(|column| row.get(*column))
        .find(|value| !value.is_empty())
        .cloned()
}
