//! Page fetcher boundary
//!
//! The traversal drives one stateful page session through this trait:
//! - load a URL
//! - read the current markup and its controls
//! - invoke a control and wait for the listing to settle
//! - tear the session down
//!
//! `HttpPageSession` is the built-in implementation. It follows each control's
//! link target with a plain GET, so controls that only work through scripts
//! cannot be invoked.

use crate::crawler::controls::{resolve_page_control, PageControl, ResolvedControl};
use crate::crawler::parser::{extract_controls, has_list_item};
use crate::NavigationError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A single stateful page session
///
/// Implementations are driven strictly sequentially: every call completes
/// before the next one is issued.
#[async_trait]
pub trait PageFetcher: Send {
    /// Navigates the session to `url`
    async fn load(&mut self, url: &str) -> Result<(), NavigationError>;

    /// Returns the markup of the page currently shown
    async fn current_content(&mut self) -> Result<String, NavigationError>;

    /// Returns the clickable controls of the page currently shown
    async fn controls(&mut self) -> Result<Vec<PageControl>, NavigationError>;

    /// Triggers a control, navigating the session to wherever it leads
    async fn invoke(&mut self, control: &PageControl) -> Result<(), NavigationError>;

    /// Waits up to `timeout` for a listing item to appear
    ///
    /// Returns whether one was seen. Not seeing one is not an error.
    async fn await_settled(&mut self, timeout: Duration) -> bool;

    /// Releases the session
    async fn close(&mut self) -> Result<(), NavigationError>;

    /// Resolves the control leading to `page` on the current page
    ///
    /// The default runs the ordered strategies over `controls()`. Sessions
    /// that can ask the page directly may override it.
    async fn resolve_page_control(
        &mut self,
        page: u32,
    ) -> Result<Option<ResolvedControl>, NavigationError> {
        let controls = self.controls().await?;
        Ok(resolve_page_control(&controls, page))
    }
}

/// The page currently held by an `HttpPageSession`
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    html: String,
}

/// A `PageFetcher` backed by plain HTTP requests
pub struct HttpPageSession {
    client: Client,
    list_item_selector: String,
    current: Option<LoadedPage>,
}

impl HttpPageSession {
    pub fn new(client: Client, list_item_selector: impl Into<String>) -> Self {
        Self {
            client,
            list_item_selector: list_item_selector.into(),
            current: None,
        }
    }

    /// URL of the page currently shown, if any
    pub fn current_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|page| &page.url)
    }

    fn page(&self) -> Result<&LoadedPage, NavigationError> {
        self.current.as_ref().ok_or(NavigationError::NotLoaded)
    }
}

#[async_trait]
impl PageFetcher for HttpPageSession {
    async fn load(&mut self, url: &str) -> Result<(), NavigationError> {
        let request_error = |message: String| NavigationError::Request {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(request_error(format!("status {}", status.as_u16())));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| request_error(e.to_string()))?;

        tracing::debug!("Loaded {} ({} bytes)", final_url, html.len());
        self.current = Some(LoadedPage {
            url: final_url,
            html,
        });
        Ok(())
    }

    async fn current_content(&mut self) -> Result<String, NavigationError> {
        Ok(self.page()?.html.clone())
    }

    async fn controls(&mut self) -> Result<Vec<PageControl>, NavigationError> {
        let page = self.page()?;
        Ok(extract_controls(&page.html, &page.url))
    }

    async fn invoke(&mut self, control: &PageControl) -> Result<(), NavigationError> {
        let target = control
            .href
            .clone()
            .ok_or_else(|| NavigationError::NotInvokable(control.describe()))?;
        self.load(&target).await
    }

    async fn await_settled(&mut self, _timeout: Duration) -> bool {
        // The body is complete once `load` returns; only check for the marker.
        let settled = self
            .current
            .as_ref()
            .is_some_and(|page| has_list_item(&page.html, &self.list_item_selector));
        if !settled {
            tracing::debug!("No listing item found on the current page");
        }
        settled
    }

    async fn close(&mut self) -> Result<(), NavigationError> {
        if let Some(page) = self.current.take() {
            tracing::debug!("Closing page session at {}", page.url);
        }
        Ok(())
    }
}
