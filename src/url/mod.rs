//! URL handling module for Template-Harvest
//!
//! This module knows how the portal shapes its URLs: where listings start,
//! how a detail URL carries its resource id, and how the template download
//! endpoint is addressed.

use crate::records::{FileType, Section};
use url::Url;

/// Path of the template download endpoint, relative to the portal base
pub const DOWNLOAD_PATH: &str = "/api/File/DownTemplate";

/// Extracts the resource id from a detail URL
///
/// The `id` query parameter is read first. When the URL does not parse (for
/// example a bare `/View?id=...` path) or carries no usable `id` parameter,
/// the text after the last literal `id=` up to the next `&` is used instead.
///
/// # Examples
///
/// ```
/// use template_harvest::url::extract_resource_id;
///
/// assert_eq!(
///     extract_resource_id("https://example.com/View?id=abc&x=1"),
///     Some("abc".to_string())
/// );
/// assert_eq!(extract_resource_id("/View?id=42"), Some("42".to_string()));
/// assert_eq!(extract_resource_id("https://example.com/View"), None);
/// ```
pub fn extract_resource_id(detail_url: &str) -> Option<String> {
    let from_query = Url::parse(detail_url).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, value)| key == "id" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    });

    from_query.or_else(|| {
        let (_, tail) = detail_url.rsplit_once("id=")?;
        let id = tail.split('&').next().unwrap_or_default();
        (!id.is_empty()).then(|| id.to_string())
    })
}

/// Returns true if `url` points at a single listing entry
pub fn is_detail_url(url: &str, detail_marker: &str) -> bool {
    !url.is_empty() && url.contains(detail_marker)
}

/// Builds the URL of the first listing page of a section
pub fn start_url(base: &Url, section: Section) -> Result<Url, url::ParseError> {
    base.join(section.start_path())
}

/// Builds the download request URL for a resource id and file type
///
/// # Examples
///
/// ```
/// use template_harvest::records::FileType;
/// use template_harvest::url::download_endpoint;
/// use url::Url;
///
/// let base = Url::parse("https://portal.example").unwrap();
/// let url = download_endpoint(&base, "abc", FileType::Pdf).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://portal.example/api/File/DownTemplate?id=abc&type=2"
/// );
/// ```
pub fn download_endpoint(
    base: &Url,
    resource_id: &str,
    file_type: FileType,
) -> Result<Url, url::ParseError> {
    let mut url = base.join(DOWNLOAD_PATH)?;
    url.query_pairs_mut()
        .append_pair("id", resource_id)
        .append_pair("type", &file_type.type_code().to_string());
    Ok(url)
}

/// Resolves a link href against the page it was found on
///
/// Returns None for empty hrefs, fragment-only links, `javascript:`,
/// `mailto:`, `tel:` and `data:` schemes, and anything that does not resolve
/// to an HTTP(S) URL.
pub fn resolve_href(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
