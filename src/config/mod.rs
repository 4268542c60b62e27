//! Configuration module for Template-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; command-line flags are applied on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use template_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Collecting up to {} pages", config.collect.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CollectConfig, Config, DownloadConfig, HttpConfig, PortalConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
