//! Traversal controller - listing crawl orchestration
//!
//! This module walks a paginated listing one page at a time:
//! - seeding the accumulator from the start page
//! - choosing a page ceiling from the page-count hint or the hard cap
//! - moving to each next page through the page fetcher
//! - merging extracted items and watching for pages that add nothing
//! - deciding when the listing is exhausted

use crate::config::Config;
use crate::crawler::controls::{page_count_hint, resolve_next_control};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::extract_items;
use crate::records::{ItemRecord, Section};
use crate::state::TraversalState;
use crate::url::start_url;
use crate::{HarvestError, NavigationError};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Knobs of a single listing crawl
#[derive(Debug, Clone)]
pub struct TraversalSettings {
    pub section: Section,
    pub base_url: Url,
    pub detail_marker: String,
    pub no_growth_limit: u32,
    pub initial_delay: Duration,
    pub settle_timeout: Duration,
    pub settle_delay: Duration,
    pub page_delay: Duration,
}

impl TraversalSettings {
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let collect = &config.collect;
        Ok(Self {
            section: collect.section,
            base_url: Url::parse(&config.portal.base_url)?,
            detail_marker: config.portal.detail_marker.clone(),
            no_growth_limit: collect.no_growth_limit,
            initial_delay: Duration::from_millis(collect.initial_delay_ms),
            settle_timeout: Duration::from_millis(collect.settle_timeout_ms),
            settle_delay: Duration::from_millis(collect.settle_delay_ms),
            page_delay: Duration::from_millis(collect.page_delay_ms),
        })
    }
}

/// Why a traversal ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every page up to the ceiling was visited
    CeilingReached,

    /// Too many consecutive pages added no new records
    Exhausted,

    /// No control could move the listing to `page`
    NavigationAborted { page: u32, reason: String },
}

impl StopReason {
    /// True for the two normal completions
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::NavigationAborted { .. })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CeilingReached => write!(f, "page ceiling reached"),
            Self::Exhausted => write!(f, "listing exhausted"),
            Self::NavigationAborted { page, reason } => {
                write!(f, "navigation to page {} failed: {}", page, reason)
            }
        }
    }
}

/// Everything a traversal produced
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    /// Collected records keyed by detail URL
    pub items: BTreeMap<String, ItemRecord>,

    /// Page numbers successfully moved to after the start page
    pub pages_visited: Vec<u32>,

    /// Page-count hint read from the start page, if any
    pub page_count_hint: Option<u32>,

    /// Last page number the traversal was allowed to reach
    pub ceiling: u32,

    pub stop: StopReason,
}

/// Drives one page fetcher across a paginated listing
///
/// The controller owns the fetcher for the whole run; `crawl` releases it
/// on every exit path.
pub struct TraversalController<F: PageFetcher> {
    fetcher: F,
    settings: TraversalSettings,
}

impl<F: PageFetcher> TraversalController<F> {
    pub fn new(fetcher: F, settings: TraversalSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Releases the fetcher after a `run` driven by the caller
    pub async fn close(mut self) -> Result<(), NavigationError> {
        self.fetcher.close().await
    }

    /// Crawls the configured section from its start page
    ///
    /// Only a failure to load the start page is an error; a failed page
    /// change ends the traversal with whatever was collected so far. The
    /// fetcher is closed before this returns, whatever the result.
    pub async fn crawl(mut self, hard_cap: u32) -> Result<TraversalOutcome, HarvestError> {
        let result = self.crawl_from_start(hard_cap).await;

        if let Err(e) = self.fetcher.close().await {
            tracing::warn!("Failed to close page session: {}", e);
        }

        result
    }

    async fn crawl_from_start(&mut self, hard_cap: u32) -> Result<TraversalOutcome, HarvestError> {
        let start = start_url(&self.settings.base_url, self.settings.section)?;
        tracing::info!("Loading start page {}", start);

        self.fetcher.load(start.as_str()).await?;
        pause(self.settings.initial_delay).await;
        self.fetcher.await_settled(self.settings.settle_timeout).await;

        let content = self.fetcher.current_content().await?;
        let controls = self.fetcher.controls().await?;
        let hint = page_count_hint(&controls);

        match hint {
            Some(pages) => tracing::info!("Pagination shows {} pages", pages),
            None => tracing::info!(
                "Could not read the page count, trying up to {} pages",
                hard_cap
            ),
        }

        Ok(self.run(&content, hint, hard_cap).await)
    }

    /// Collects every record reachable from an already loaded start page
    ///
    /// Visits pages 2, 3, ... up to the ceiling (the hint when it is greater
    /// than one, otherwise `hard_cap`), stopping early once
    /// `no_growth_limit` consecutive pages add nothing, or as soon as a page
    /// cannot be reached.
    pub async fn run(
        &mut self,
        start_content: &str,
        page_count_hint: Option<u32>,
        hard_cap: u32,
    ) -> TraversalOutcome {
        let mut state = TraversalState::new(self.settings.section, page_count_hint, hard_cap);
        let mut pages_visited = Vec::new();

        let seeded = state.merge(&self.extract(start_content));
        tracing::info!("[page 1] {} new (total {})", seeded, state.len());

        let stop = loop {
            if !state.has_pages_left() {
                break StopReason::CeilingReached;
            }

            let page = state.current_page();
            tracing::info!("Moving to page {}", page);

            let content = match self.go_to_page(page).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Cannot reach page {}, stopping: {}", page, e);
                    break StopReason::NavigationAborted {
                        page,
                        reason: e.to_string(),
                    };
                }
            };
            pages_visited.push(page);

            let extracted = self.extract(&content);
            let new_count = state.merge(&extracted);
            state.record_growth(new_count);
            tracing::info!(
                "[page {}] extracted {}, {} new (total {})",
                page,
                extracted.len(),
                new_count,
                state.len()
            );

            if state.is_exhausted(self.settings.no_growth_limit) {
                tracing::info!(
                    "{} consecutive pages added nothing, treating the listing as exhausted",
                    state.no_growth()
                );
                break StopReason::Exhausted;
            }

            state.advance();
            pause(self.settings.page_delay).await;
        };

        tracing::info!(
            "Traversal finished after {} pages: {} ({} records)",
            pages_visited.len() + 1,
            stop,
            state.len()
        );

        TraversalOutcome {
            ceiling: state.ceiling(),
            items: state.into_items(),
            pages_visited,
            page_count_hint,
            stop,
        }
    }

    /// Moves the fetcher to `page` and returns the settled page content
    ///
    /// Falls back to the "next" control when the control for `page` cannot
    /// be invoked.
    async fn go_to_page(&mut self, page: u32) -> Result<String, NavigationError> {
        let resolved = self
            .fetcher
            .resolve_page_control(page)
            .await?
            .ok_or(NavigationError::NoControl(page))?;

        if resolved.strategy.is_exact() {
            tracing::debug!(
                "Page {} control '{}' found by {}",
                page,
                resolved.control.describe(),
                resolved.strategy
            );
        } else {
            tracing::info!("No control for page {}, using the next control", page);
        }

        if let Err(e) = self.fetcher.invoke(&resolved.control).await {
            if !resolved.strategy.is_exact() {
                return Err(e);
            }
            tracing::warn!("Page {} control failed ({}), trying the next control", page, e);
            let controls = self.fetcher.controls().await?;
            let next = resolve_next_control(&controls).ok_or(e)?;
            self.fetcher.invoke(&next.control).await?;
        }

        self.fetcher.await_settled(self.settings.settle_timeout).await;
        pause(self.settings.settle_delay).await;

        self.fetcher.current_content().await
    }

    fn extract(&self, content: &str) -> Vec<(String, String)> {
        extract_items(content, &self.settings.base_url, &self.settings.detail_marker)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
