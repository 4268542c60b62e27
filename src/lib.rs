//! Template-Harvest: a listing collector and template downloader
//!
//! This crate walks a paginated listing on a document portal by following its
//! page-number controls, collects deduplicated item records, and then fetches
//! the PDF/Word templates those records point at, sniffing ambiguous responses
//! and retrying the ones that look like error pages.

pub mod config;
pub mod crawler;
pub mod download;
pub mod output;
pub mod records;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Template-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No free output path for {0}")]
    PathCollision(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),
}

/// Errors raised while moving between listing pages
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("No control found for page {0}")]
    NoControl(u32),

    #[error("Control '{0}' has no navigable target")]
    NotInvokable(String),

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("No page has been loaded yet")]
    NotLoaded,
}

/// Result type alias for Template-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{DownloadOutcome, DownloadTarget, FailureReason, FileType, ItemRecord, Section};
pub use state::{AttemptState, TraversalState};
pub use crate::url::{download_endpoint, extract_resource_id};
