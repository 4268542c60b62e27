//! Crawler module for walking a paginated listing
//!
//! This module contains the listing-side logic, including:
//! - Item and pagination-control extraction from listing markup
//! - Ordered resolution of the control that leads to a page number
//! - The page fetcher boundary and its HTTP-backed session
//! - The traversal controller that decides when the listing is exhausted

mod controls;
mod coordinator;
mod fetcher;
mod parser;

pub use controls::{
    page_count_hint, resolve_next_control, resolve_page_control, PageControl, ResolutionStrategy,
    ResolvedControl,
};
pub use coordinator::{StopReason, TraversalController, TraversalOutcome, TraversalSettings};
pub use fetcher::{HttpPageSession, PageFetcher};
pub use parser::{extract_controls, extract_items, has_list_item, PAGINATION_CONTAINERS};

use crate::config::Config;
use crate::download::build_http_client;
use crate::HarvestError;

/// Crawls the configured listing section over HTTP
///
/// This is the main entry point for collecting records. It will:
/// 1. Build an HTTP page session (with the configured proxy, if any)
/// 2. Load the section's start page and read its page-count hint
/// 3. Walk the listing until it is exhausted, the ceiling is reached, or a
///    page cannot be reached
/// 4. Close the session
///
/// # Arguments
///
/// * `config` - The harvest configuration
///
/// # Returns
///
/// * `Ok(TraversalOutcome)` - The collected records and why traversal stopped
/// * `Err(HarvestError)` - The session could not be built or the start page failed
pub async fn collect(config: &Config) -> Result<TraversalOutcome, HarvestError> {
    if config.collect.headless {
        tracing::debug!("Headless mode has no effect on an HTTP page session");
    }

    let client = build_http_client(&config.http, config.collect.proxy.as_deref(), None)?;
    let session = HttpPageSession::new(client, config.portal.list_item_selector.clone());
    let settings = TraversalSettings::from_config(config)?;

    TraversalController::new(session, settings)
        .crawl(config.collect.max_pages)
        .await
}
