//! Traversal controller tests with an in-memory page fetcher

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use template_harvest::crawler::{
    resolve_page_control, PageControl, PageFetcher, ResolutionStrategy, ResolvedControl,
    StopReason, TraversalController, TraversalSettings,
};
use template_harvest::{NavigationError, Section};
use url::Url;

const BASE: &str = "https://portal.example";

/// Listing markup with one detail link per id
fn listing(ids: &[u32]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="item"><a href="/View?id={id}">Template {id}</a></div>"#,
                id = id
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="samr-home-list">{}</div></body></html>"#,
        items
    )
}

fn settings() -> TraversalSettings {
    TraversalSettings {
        section: Section::National,
        base_url: Url::parse(BASE).unwrap(),
        detail_marker: "/View?id=".to_string(),
        no_growth_limit: 3,
        initial_delay: Duration::ZERO,
        settle_timeout: Duration::ZERO,
        settle_delay: Duration::ZERO,
        page_delay: Duration::ZERO,
    }
}

/// A fetcher that serves pre-built pages and records every page it is sent to
struct ScriptedFetcher {
    /// Markup of page N at index N - 1; pages past the end are empty listings
    pages: Vec<String>,
    current: u32,
    /// Pages that have no numbered control anywhere
    unlisted: Vec<u32>,
    /// Pages whose numbered control fails when invoked
    broken: Vec<u32>,
    has_next: bool,
    /// Lets the session jump straight to unlisted pages
    direct_jumps: bool,
    /// Every page the controller asked the session to resolve
    resolved: Arc<Mutex<Vec<u32>>>,
    requested: Arc<Mutex<Vec<u32>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedFetcher {
    fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            current: 1,
            unlisted: Vec::new(),
            broken: Vec::new(),
            has_next: true,
            direct_jumps: false,
            resolved: Arc::new(Mutex::new(Vec::new())),
            requested: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn load(&mut self, _url: &str) -> Result<(), NavigationError> {
        self.current = 1;
        Ok(())
    }

    async fn current_content(&mut self) -> Result<String, NavigationError> {
        let index = (self.current - 1) as usize;
        Ok(self.pages.get(index).cloned().unwrap_or_else(|| listing(&[])))
    }

    async fn controls(&mut self) -> Result<Vec<PageControl>, NavigationError> {
        let mut controls: Vec<PageControl> = (1..=self.page_count())
            .filter(|page| !self.unlisted.contains(page))
            .map(|page| PageControl {
                label: page.to_string(),
                own_text: page.to_string(),
                href: Some(format!("{}/National?page={}", BASE, page)),
                in_pagination: true,
                ..PageControl::default()
            })
            .collect();

        if self.has_next {
            controls.push(PageControl {
                label: "下一页".to_string(),
                own_text: "下一页".to_string(),
                in_pagination: true,
                is_next: true,
                ..PageControl::default()
            });
        }
        Ok(controls)
    }

    async fn invoke(&mut self, control: &PageControl) -> Result<(), NavigationError> {
        let target = if control.is_next {
            self.current + 1
        } else {
            let page = control.page_number().ok_or_else(|| {
                NavigationError::NotInvokable(control.describe())
            })?;
            if self.broken.contains(&page) {
                return Err(NavigationError::NotInvokable(control.describe()));
            }
            page
        };

        self.requested.lock().unwrap().push(target);
        self.current = target;
        Ok(())
    }

    async fn resolve_page_control(
        &mut self,
        page: u32,
    ) -> Result<Option<ResolvedControl>, NavigationError> {
        self.resolved.lock().unwrap().push(page);
        if self.direct_jumps && self.unlisted.contains(&page) {
            return Ok(Some(ResolvedControl {
                strategy: ResolutionStrategy::PageAttribute,
                control: PageControl {
                    label: page.to_string(),
                    page_attr: Some(page.to_string()),
                    ..PageControl::default()
                },
            }));
        }
        let controls = self.controls().await?;
        Ok(resolve_page_control(&controls, page))
    }

    async fn await_settled(&mut self, _timeout: Duration) -> bool {
        true
    }

    async fn close(&mut self) -> Result<(), NavigationError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_stops_after_three_pages_without_growth() {
    // Pages 2-4 only repeat what page 1 already showed.
    let pages = vec![listing(&[1, 2]); 50];
    let fetcher = ScriptedFetcher::new(pages.clone());
    let requested = fetcher.requested.clone();

    let mut controller = TraversalController::new(fetcher, settings());
    let outcome = controller.run(&pages[0], None, 50).await;

    assert_eq!(outcome.stop, StopReason::Exhausted);
    assert_eq!(outcome.ceiling, 50);
    assert_eq!(outcome.pages_visited, vec![2, 3, 4]);
    assert_eq!(*requested.lock().unwrap(), vec![2, 3, 4]);
    assert_eq!(outcome.items.len(), 2);
}

#[tokio::test]
async fn test_growth_resets_the_no_growth_counter() {
    let pages = vec![
        listing(&[1]),
        listing(&[1]),
        listing(&[1]),
        listing(&[2]),
        listing(&[2]),
        listing(&[2]),
        listing(&[2]),
    ];
    let mut controller = TraversalController::new(ScriptedFetcher::new(pages.clone()), settings());
    let outcome = controller.run(&pages[0], None, 50).await;

    assert_eq!(outcome.stop, StopReason::Exhausted);
    assert_eq!(outcome.pages_visited, vec![2, 3, 4, 5, 6, 7]);
    assert_eq!(outcome.items.len(), 2);
}

#[tokio::test]
async fn test_page_count_hint_is_the_ceiling() {
    let pages: Vec<String> = (1..=10).map(|page| listing(&[page])).collect();
    let fetcher = ScriptedFetcher::new(pages.clone());
    let requested = fetcher.requested.clone();

    let mut controller = TraversalController::new(fetcher, settings());
    let outcome = controller.run(&pages[0], Some(5), 999).await;

    assert_eq!(outcome.stop, StopReason::CeilingReached);
    assert_eq!(outcome.ceiling, 5);
    assert_eq!(outcome.pages_visited, vec![2, 3, 4, 5]);
    assert!(!requested.lock().unwrap().contains(&6));
    assert_eq!(outcome.items.len(), 5);
}

#[tokio::test]
async fn test_hint_of_one_falls_back_to_hard_cap() {
    let pages: Vec<String> = (1..=10).map(|page| listing(&[page])).collect();
    let mut controller = TraversalController::new(ScriptedFetcher::new(pages.clone()), settings());
    let outcome = controller.run(&pages[0], Some(1), 4).await;

    assert_eq!(outcome.ceiling, 4);
    assert_eq!(outcome.stop, StopReason::CeilingReached);
    assert_eq!(outcome.pages_visited, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_same_page_twice_is_counted_once() {
    let pages = vec![listing(&[1, 2, 3]), listing(&[1, 2, 3])];
    let mut controller = TraversalController::new(ScriptedFetcher::new(pages.clone()), settings());
    let outcome = controller.run(&pages[0], Some(2), 999).await;

    assert_eq!(outcome.items.len(), 3);
    let urls: Vec<&String> = outcome.items.keys().collect();
    assert!(urls.iter().all(|url| url.starts_with(BASE) && url.contains("/View?id=")));
}

#[tokio::test]
async fn test_missing_control_aborts_but_keeps_items() {
    let pages: Vec<String> = (1..=5).map(|page| listing(&[page])).collect();
    let mut fetcher = ScriptedFetcher::new(pages.clone());
    fetcher.unlisted = vec![3];
    fetcher.has_next = false;

    let mut controller = TraversalController::new(fetcher, settings());
    let outcome = controller.run(&pages[0], None, 10).await;

    assert!(matches!(
        outcome.stop,
        StopReason::NavigationAborted { page: 3, .. }
    ));
    assert_eq!(outcome.pages_visited, vec![2]);
    assert_eq!(outcome.items.len(), 2);
}

#[tokio::test]
async fn test_unlisted_page_is_reached_through_next() {
    let pages: Vec<String> = (1..=4).map(|page| listing(&[page])).collect();
    let mut fetcher = ScriptedFetcher::new(pages.clone());
    fetcher.unlisted = vec![3];

    let mut controller = TraversalController::new(fetcher, settings());
    let outcome = controller.run(&pages[0], Some(4), 999).await;

    assert_eq!(outcome.stop, StopReason::CeilingReached);
    assert_eq!(outcome.pages_visited, vec![2, 3, 4]);
    assert_eq!(outcome.items.len(), 4);
}

#[tokio::test]
async fn test_broken_control_falls_back_to_next() {
    let pages: Vec<String> = (1..=3).map(|page| listing(&[page])).collect();
    let mut fetcher = ScriptedFetcher::new(pages.clone());
    fetcher.broken = vec![2];
    let requested = fetcher.requested.clone();

    let mut controller = TraversalController::new(fetcher, settings());
    let outcome = controller.run(&pages[0], Some(3), 999).await;

    assert_eq!(outcome.stop, StopReason::CeilingReached);
    assert_eq!(*requested.lock().unwrap(), vec![2, 3]);
    assert_eq!(outcome.items.len(), 3);
}

#[tokio::test]
async fn test_controls_are_resolved_by_the_session() {
    let pages: Vec<String> = (1..=5).map(|page| listing(&[page])).collect();
    let mut fetcher = ScriptedFetcher::new(pages.clone());
    fetcher.unlisted = vec![3];
    fetcher.has_next = false;
    fetcher.direct_jumps = true;
    let resolved = fetcher.resolved.clone();

    let mut controller = TraversalController::new(fetcher, settings());
    let outcome = controller.run(&pages[0], Some(5), 999).await;

    assert_eq!(outcome.stop, StopReason::CeilingReached);
    assert_eq!(outcome.pages_visited, vec![2, 3, 4, 5]);
    assert_eq!(*resolved.lock().unwrap(), vec![2, 3, 4, 5]);
    assert_eq!(outcome.items.len(), 5);
}

#[tokio::test]
async fn test_crawl_closes_the_fetcher_on_abort() {
    let pages: Vec<String> = (1..=3).map(|page| listing(&[page])).collect();
    let mut fetcher = ScriptedFetcher::new(pages);
    fetcher.unlisted = vec![2, 3];
    fetcher.has_next = false;
    let closed = fetcher.closed.clone();

    let outcome = TraversalController::new(fetcher, settings())
        .crawl(999)
        .await
        .unwrap();

    assert!(!outcome.stop.is_complete());
    assert_eq!(outcome.items.len(), 1);
    assert!(closed.load(Ordering::SeqCst));
}
