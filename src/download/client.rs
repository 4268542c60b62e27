//! Shared HTTP session
//!
//! One `reqwest::Client` is built per run and cloned into every task; clones
//! share the connection pool, default headers and cookie jar, so the session
//! can be used from many downloads at once.

use crate::config::HttpConfig;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Proxy};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with browser-like headers
///
/// # Arguments
///
/// * `config` - Header values and request timeout
/// * `proxy` - Optional proxy URL applied to every request; empty means none
/// * `cookies` - Optional cookie jar shared by every clone of the client
///
/// # Example
///
/// ```no_run
/// use template_harvest::config::HttpConfig;
/// use template_harvest::download::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default(), None, None).unwrap();
/// ```
pub fn build_http_client(
    config: &HttpConfig,
    proxy: Option<&str>,
    cookies: Option<Arc<Jar>>,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, ACCEPT, &config.accept);
    insert_header(&mut headers, ACCEPT_LANGUAGE, &config.accept_language);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    if let Some(jar) = cookies {
        builder = builder.cookie_provider(jar);
    }

    builder.build()
}

fn insert_header(headers: &mut HeaderMap, name: reqwest::header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!("Ignoring invalid value for header {}", name),
    }
}

/// Parses a raw `key=value; key=value` cookie string copied from a browser
///
/// Parts without `=` are skipped; only the first `=` splits key from value.
///
/// # Example
///
/// ```
/// use template_harvest::download::parse_cookie_string;
///
/// let cookies = parse_cookie_string("__jsluid_s=abc; samr=isopen");
/// assert_eq!(cookies.get("samr").map(String::as_str), Some("isopen"));
/// ```
pub fn parse_cookie_string(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|part| part.trim().split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Builds a cookie jar holding `cookies` for the portal at `base_url`
pub fn cookie_jar(cookies: &BTreeMap<String, String>, base_url: &Url) -> Arc<Jar> {
    let jar = Jar::default();
    for (key, value) in cookies {
        jar.add_cookie_str(&format!("{}={}; Path=/", key, value), base_url);
    }
    Arc::new(jar)
}
