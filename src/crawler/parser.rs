//! HTML parser for listing pages
//!
//! This module turns listing markup into:
//! - item pairs `(title, detail URL)` for the accumulator
//! - the set of pagination controls the traversal can act on
//! - a yes/no answer to "has the listing rendered yet"

use crate::crawler::controls::PageControl;
use crate::url::{is_detail_url, resolve_href};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Selectors of elements that wrap the page-number links
pub const PAGINATION_CONTAINERS: &str = ".samr-pagination, .pagination, .paging, .pager, .pagerbox";

/// Labels a generic "next page" control may carry
const NEXT_LABELS: [&str; 2] = ["下一页", "next"];

/// Extracts every `(title, detail URL)` pair from a listing page
///
/// An anchor counts as an item when its raw `href` contains `detail_marker`.
/// URLs are made absolute against `base_url`; titles are the anchor's text
/// pieces, trimmed and joined by single spaces, and may be empty.
///
/// # Example
///
/// ```
/// use template_harvest::crawler::extract_items;
/// use url::Url;
///
/// let html = r#"<ul><li><a href="/View?id=1"> Lease <b>contract</b></a></li></ul>"#;
/// let base = Url::parse("https://portal.example/National").unwrap();
/// let items = extract_items(html, &base, "/View?id=");
/// assert_eq!(
///     items,
///     vec![("Lease contract".to_string(), "https://portal.example/View?id=1".to_string())]
/// );
/// ```
pub fn extract_items(html: &str, base_url: &Url, detail_marker: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let Some(anchor_selector) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchor_selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            if !href.contains(detail_marker) {
                return None;
            }
            let url = base_url.join(href.trim()).ok()?.to_string();
            if !is_detail_url(&url, detail_marker) {
                return None;
            }
            Some((joined_text(&anchor), url))
        })
        .collect()
}

/// Extracts the clickable controls of a listing page
///
/// Controls inside a known pagination container are flagged `in_pagination`.
/// When the page has no such container, the parent of the first
/// numerically-labelled link stands in for it.
pub fn extract_controls(html: &str, base_url: &Url) -> Vec<PageControl> {
    let document = Html::parse_document(html);
    let (Some(anchor_selector), Some(container_selector)) =
        (selector("a"), selector(PAGINATION_CONTAINERS))
    else {
        return Vec::new();
    };

    let has_container = document.select(&container_selector).next().is_some();
    let fallback_parent = if has_container {
        None
    } else {
        document
            .select(&anchor_selector)
            .find(|anchor| is_numeric(&normalized_text(anchor)))
            .and_then(|anchor| anchor.parent())
            .map(|parent| parent.id())
    };

    document
        .select(&anchor_selector)
        .map(|anchor| {
            let element = anchor.value();
            let label = normalized_text(&anchor);

            let in_pagination = if has_container {
                anchor
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| container_selector.matches(&ancestor))
            } else {
                fallback_parent.is_some() && anchor.parent().map(|p| p.id()) == fallback_parent
            };

            PageControl {
                own_text: own_text(&anchor),
                page_attr: element.attr("data-page").map(str::to_string),
                href: element.attr("href").and_then(|href| resolve_href(href, base_url)),
                is_next: is_next_control(&anchor, &label),
                in_pagination,
                label,
            }
        })
        .collect()
}

/// Returns true if any element matching `list_item_selector` is present
///
/// An invalid selector is treated as "not present".
pub fn has_list_item(html: &str, list_item_selector: &str) -> bool {
    let document = Html::parse_document(html);
    selector(list_item_selector)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Text pieces of an element, each trimmed, empty ones dropped, joined by spaces
fn joined_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// All descendant text with runs of whitespace collapsed
fn normalized_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the element's direct text-node children only
fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_numeric(label: &str) -> bool {
    !label.is_empty() && label.chars().all(|c| c.is_ascii_digit())
}

fn has_class(element: &ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// `a.next`, an anchor inside `.next`, `a[aria-label=Next]`, or a "next" label
fn is_next_control(anchor: &ElementRef, label: &str) -> bool {
    if has_class(anchor, "next") {
        return true;
    }

    if anchor
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| has_class(&parent, "next"))
    {
        return true;
    }

    if anchor.value().attr("aria-label") == Some("Next") {
        return true;
    }

    let label = label.to_lowercase();
    NEXT_LABELS.iter().any(|candidate| label == *candidate)
}
