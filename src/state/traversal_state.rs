/// Traversal state for one listing crawl
///
/// The accumulator only grows, the page counter only moves forward by one,
/// and the no-growth counter is reset by any page that adds a record.
use crate::records::{ItemRecord, Section};
use std::collections::BTreeMap;

/// Page 1 is the start page; traversal proper begins on page 2
pub const FIRST_TRAVERSED_PAGE: u32 = 2;

/// Picks the last page number to visit
///
/// A page-count hint greater than one wins; anything else falls back to the
/// caller's hard cap.
pub fn ceiling_for(page_count_hint: Option<u32>, hard_cap: u32) -> u32 {
    match page_count_hint {
        Some(hint) if hint > 1 => hint,
        _ => hard_cap,
    }
}

#[derive(Debug, Clone)]
pub struct TraversalState {
    section: Section,
    items: BTreeMap<String, ItemRecord>,
    current_page: u32,
    no_growth: u32,
    ceiling: u32,
    /// Set once the page counter cannot move past `u32::MAX`
    past_last_page: bool,
}

impl TraversalState {
    pub fn new(section: Section, page_count_hint: Option<u32>, hard_cap: u32) -> Self {
        Self {
            section,
            items: BTreeMap::new(),
            current_page: FIRST_TRAVERSED_PAGE,
            no_growth: 0,
            ceiling: ceiling_for(page_count_hint, hard_cap),
            past_last_page: false,
        }
    }

    /// Inserts every (title, url) pair whose URL is not yet known
    ///
    /// Returns how many records were new. Titles of already-known URLs are
    /// left untouched.
    pub fn merge(&mut self, extracted: &[(String, String)]) -> usize {
        let mut new_count = 0;
        for (title, url) in extracted {
            if !self.items.contains_key(url) {
                self.items.insert(
                    url.clone(),
                    ItemRecord::new(self.section, title.clone(), url.clone()),
                );
                new_count += 1;
            }
        }
        new_count
    }

    /// Updates the no-growth counter after a page contributed `new_count` records
    pub fn record_growth(&mut self, new_count: usize) {
        if new_count == 0 {
            self.no_growth += 1;
        } else {
            self.no_growth = 0;
        }
    }

    /// True once `limit` consecutive pages have added nothing
    pub fn is_exhausted(&self, limit: u32) -> bool {
        self.no_growth >= limit
    }

    /// True while the current page is within the ceiling
    pub fn has_pages_left(&self) -> bool {
        !self.past_last_page && self.current_page <= self.ceiling
    }

    pub fn advance(&mut self) {
        match self.current_page.checked_add(1) {
            Some(next) => self.current_page = next,
            None => self.past_last_page = true,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn no_growth(&self) -> u32 {
        self.no_growth
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &BTreeMap<String, ItemRecord> {
        &self.items
    }

    pub fn into_items(self) -> BTreeMap<String, ItemRecord> {
        self.items
    }
}
