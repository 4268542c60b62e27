//! Pagination control resolution
//!
//! A listing page exposes a set of clickable controls. Moving to page N means
//! picking one of them, and listings disagree on how page links are marked, so
//! resolution is a fixed, ordered list of independent strategies; the first
//! one that finds a control wins.

use std::fmt;

/// A clickable element found on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageControl {
    /// Full visible text, whitespace-normalized
    pub label: String,

    /// Text of the element's own text nodes, ignoring nested elements
    pub own_text: String,

    /// Value of the `data-page` attribute, if any
    pub page_attr: Option<String>,

    /// Absolute link target, if the control navigates somewhere
    pub href: Option<String>,

    /// Whether the control sits inside the pagination container
    pub in_pagination: bool,

    /// Whether the control is a generic "next page" control
    pub is_next: bool,
}

impl PageControl {
    /// Human-readable name for log lines
    pub fn describe(&self) -> String {
        if self.label.is_empty() {
            self.href.clone().unwrap_or_else(|| "<unlabelled>".to_string())
        } else {
            self.label.clone()
        }
    }

    /// Returns the page number this control is labelled with, if numeric
    pub fn page_number(&self) -> Option<u32> {
        if !self.label.is_empty() && self.label.chars().all(|c| c.is_ascii_digit()) {
            self.label.parse().ok()
        } else {
            None
        }
    }
}

/// One way of locating the control for a page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
    /// A control whose `data-page` attribute equals the page number
    PageAttribute,

    /// A control whose own text is exactly the page number
    VisibleText,

    /// A control inside the pagination container labelled with the page number
    PaginationContainer,

    /// The generic "next page" control, whatever page it leads to
    Next,
}

impl ResolutionStrategy {
    /// All strategies, in the order they are tried
    pub const ORDERED: [ResolutionStrategy; 4] = [
        Self::PageAttribute,
        Self::VisibleText,
        Self::PaginationContainer,
        Self::Next,
    ];

    /// Finds the first control this strategy accepts for `page`
    pub fn find<'a>(&self, controls: &'a [PageControl], page: u32) -> Option<&'a PageControl> {
        let wanted = page.to_string();
        controls.iter().find(|control| match self {
            Self::PageAttribute => {
                control.page_attr.as_deref().map(str::trim) == Some(wanted.as_str())
            }
            Self::VisibleText => control.own_text == wanted,
            Self::PaginationContainer => control.in_pagination && control.label == wanted,
            Self::Next => control.is_next,
        })
    }

    /// True for strategies that target the exact page number
    pub fn is_exact(&self) -> bool {
        !matches!(self, Self::Next)
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PageAttribute => "page-attribute",
            Self::VisibleText => "visible-text",
            Self::PaginationContainer => "pagination-container",
            Self::Next => "next",
        };
        write!(f, "{}", name)
    }
}

/// A control together with the strategy that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedControl {
    pub strategy: ResolutionStrategy,
    pub control: PageControl,
}

/// Resolves the control that leads to `page`, trying every strategy in order
///
/// # Examples
///
/// ```
/// use template_harvest::crawler::{resolve_page_control, PageControl, ResolutionStrategy};
///
/// let controls = vec![PageControl {
///     label: "3".to_string(),
///     own_text: "3".to_string(),
///     href: Some("https://portal.example/National?page=3".to_string()),
///     ..PageControl::default()
/// }];
///
/// let resolved = resolve_page_control(&controls, 3).unwrap();
/// assert_eq!(resolved.strategy, ResolutionStrategy::VisibleText);
/// assert!(resolve_page_control(&controls, 4).is_none());
/// ```
pub fn resolve_page_control(controls: &[PageControl], page: u32) -> Option<ResolvedControl> {
    ResolutionStrategy::ORDERED.iter().find_map(|strategy| {
        strategy.find(controls, page).map(|control| ResolvedControl {
            strategy: *strategy,
            control: control.clone(),
        })
    })
}

/// Resolves only the generic "next page" control
pub fn resolve_next_control(controls: &[PageControl]) -> Option<ResolvedControl> {
    ResolutionStrategy::Next
        .find(controls, 0)
        .map(|control| ResolvedControl {
            strategy: ResolutionStrategy::Next,
            control: control.clone(),
        })
}

/// Reads the page-count hint: the highest page number shown in the pagination container
///
/// Pagination widgets often show only a sliding window of page links, so this
/// is a lower bound on the real page count, not an exact one.
pub fn page_count_hint(controls: &[PageControl]) -> Option<u32> {
    controls
        .iter()
        .filter(|control| control.in_pagination)
        .filter_map(PageControl::page_number)
        .max()
}
