use crate::records::{FileType, Section};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Template-Harvest
///
/// Every section and key has a default, so an empty file (or no file at all)
/// yields a usable configuration pointed at the public portal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub http: HttpConfig,
    pub collect: CollectConfig,
    pub download: DownloadConfig,
}

/// Where the portal lives and how its pages are recognised
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PortalConfig {
    /// Scheme and host of the portal, e.g. `https://htsfwb.samr.gov.cn`
    pub base_url: String,

    /// Substring every detail-page link contains
    pub detail_marker: String,

    /// CSS selector of a rendered listing item, used to decide a page has settled
    pub list_item_selector: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://htsfwb.samr.gov.cn".to_string(),
            detail_marker: "/View?id=".to_string(),
            list_item_selector:
                ".samr-home-list .item, .item-box .item, .samr-home-list .item-box .item"
                    .to_string(),
        }
    }
}

/// Headers and timeouts of the shared HTTP session
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.0.0"
                .to_string(),
            accept: "*/*".to_string(),
            accept_language: "zh-CN,zh;q=0.9".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Listing collection behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CollectConfig {
    pub section: Section,

    /// Recorded for browser-backed page fetchers; an HTTP session has no window
    pub headless: bool,

    /// Last page to try when the listing does not reveal its page count
    pub max_pages: u32,

    /// Optional proxy URL for the page session
    pub proxy: Option<String>,

    /// Collected-records CSV; defaults to `outputs_all_{section}_by_clicks.csv`
    pub output: Option<PathBuf>,

    /// Consecutive pages without new records that end the crawl
    pub no_growth_limit: u32,

    /// Wait after loading the start page (milliseconds)
    pub initial_delay_ms: u64,

    /// Upper bound on waiting for a listing item to appear (milliseconds)
    pub settle_timeout_ms: u64,

    /// Extra wait after a page change for rendering to catch up (milliseconds)
    pub settle_delay_ms: u64,

    /// Pause between two page changes (milliseconds)
    pub page_delay_ms: u64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            section: Section::National,
            headless: false,
            max_pages: 999,
            proxy: None,
            output: None,
            no_growth_limit: 3,
            initial_delay_ms: 1000,
            settle_timeout_ms: 8000,
            settle_delay_ms: 600,
            page_delay_ms: 500,
        }
    }
}

impl CollectConfig {
    /// Path the collected records are written to
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!("outputs_all_{}_by_clicks.csv", self.section))
        })
    }
}

/// Template download behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DownloadConfig {
    /// Requested file types, in priority order
    pub types: Vec<FileType>,

    /// Raw `key=value; key=value` cookie string copied from a browser
    pub cookie: Option<String>,

    /// Number of records downloaded concurrently
    pub workers: usize,

    /// Root directory for saved files, debug pages and the results manifest
    pub out_dir: PathBuf,

    /// Retries per type after the first attempt
    pub max_retries: u32,

    /// Backoff before the first retry (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Backoff added per further attempt (milliseconds)
    pub retry_step_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            types: vec![FileType::Pdf],
            cookie: None,
            workers: 6,
            out_dir: PathBuf::from("downloads"),
            max_retries: 2,
            retry_base_delay_ms: 1000,
            retry_step_ms: 1500,
        }
    }
}
