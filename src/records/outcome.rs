/// Per-record download outcomes
use crate::records::FileType;
use std::fmt;
use std::path::PathBuf;

/// Why a record (or one of its requested types) could not be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The input row carried no detail URL
    NoDetailUrl,

    /// No resource id could be extracted from the detail URL
    NoId,

    /// Every attempt for a type was used without an accepted response
    Exhausted {
        file_type: FileType,
        last_error: String,
    },

    /// The worker task died before producing an outcome
    TaskFailed(String),
}

impl FailureReason {
    /// Returns true for failures decided before any network request
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NoDetailUrl | Self::NoId)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDetailUrl => write!(f, "no_detail_url"),
            Self::NoId => write!(f, "no_id"),
            Self::Exhausted {
                file_type,
                last_error,
            } => write!(f, "fail_{}:{}", file_type, last_error),
            Self::TaskFailed(message) => write!(f, "{}", message),
        }
    }
}

/// Result of downloading every requested type of one record
///
/// Reporting is all-or-nothing: a single failed type makes the record fail,
/// but files saved for the other types are still listed (and kept on disk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(Vec<PathBuf>),
    Failed {
        reasons: Vec<FailureReason>,
        saved: Vec<PathBuf>,
    },
}

impl DownloadOutcome {
    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed {
            reasons: vec![reason],
            saved: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    /// Paths written for this record, whether or not it succeeded overall
    pub fn saved_paths(&self) -> &[PathBuf] {
        match self {
            Self::Saved(paths) => paths,
            Self::Failed { saved, .. } => saved,
        }
    }

    /// The manifest `info` column: saved paths on success, reason codes on failure
    pub fn info(&self) -> String {
        match self {
            Self::Saved(paths) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(";"),
            Self::Failed { reasons, .. } => reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}
