//! In-memory browser engine for tests. Sites are registered per URL and
//! served without a network or a Chrome install, with counters for asserting
//! on page lifecycle and concurrency.

use crate::accessibility::AccessibilityNode;
use crate::core::{BrowserEngine, NavigationOutcome, Page};
use crate::errors::{Result, SnapshotError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A page the fake engine can serve.
#[derive(Debug, Clone)]
pub struct FakeSite {
    tree: Option<AccessibilityNode>,
    status: Option<u16>,
    title: String,
    text: String,
    load_delay: Duration,
    panic_on_extract: bool,
}

impl FakeSite {
    pub fn new(tree: AccessibilityNode) -> Self {
        Self {
            tree: Some(tree),
            status: Some(200),
            title: String::new(),
            text: String::new(),
            load_delay: Duration::ZERO,
            panic_on_extract: false,
        }
    }

    /// A document without a body.
    pub fn without_tree() -> Self {
        Self {
            tree: None,
            ..Self::new(AccessibilityNode::new("document"))
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn panicking_extraction(mut self) -> Self {
        self.panic_on_extract = true;
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    launches: AtomicUsize,
    navigations: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    open_pages: AtomicUsize,
    peak_open_pages: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FakeStats {
    pub launches: usize,
    pub navigations: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub open_pages: usize,
    pub peak_open_pages: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    sites: Arc<Mutex<HashMap<String, FakeSite>>>,
    counters: Arc<Counters>,
    running: Arc<AtomicBool>,
    launch_error: Option<String>,
    open_delay: Duration,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose launch always fails with `message`.
    pub fn failing_launch(message: &str) -> Self {
        Self {
            launch_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Make every `new_page` take `delay`, like a cold browser start.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_site(self, url: &str, site: FakeSite) -> Self {
        self.add_site(url, site);
        self
    }

    /// Register or replace a site after construction.
    pub fn add_site(&self, url: &str, site: FakeSite) {
        self.sites.lock().insert(url.to_string(), site);
    }

    pub fn stats(&self) -> FakeStats {
        let c = &self.counters;
        FakeStats {
            launches: c.launches.load(Ordering::SeqCst),
            navigations: c.navigations.load(Ordering::SeqCst),
            pages_opened: c.pages_opened.load(Ordering::SeqCst),
            pages_closed: c.pages_closed.load(Ordering::SeqCst),
            open_pages: c.open_pages.load(Ordering::SeqCst),
            peak_open_pages: c.peak_open_pages.load(Ordering::SeqCst),
        }
    }
}

impl BrowserEngine for FakeEngine {
    type Page = FakePage;

    fn launch(&self) -> Result<()> {
        if let Some(message) = &self.launch_error {
            return Err(SnapshotError::from_engine_error(message));
        }
        if !self.running.swap(true, Ordering::SeqCst) {
            self.counters.launches.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn new_page(&self) -> Result<FakePage> {
        self.launch()?;
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        let c = &self.counters;
        c.pages_opened.fetch_add(1, Ordering::SeqCst);
        let open = c.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        c.peak_open_pages.fetch_max(open, Ordering::SeqCst);

        Ok(FakePage {
            sites: Arc::clone(&self.sites),
            counters: Arc::clone(&self.counters),
            current: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct FakePage {
    sites: Arc<Mutex<HashMap<String, FakeSite>>>,
    counters: Arc<Counters>,
    current: Mutex<Option<FakeSite>>,
    closed: AtomicBool,
}

impl FakePage {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sleep for `delay` in small steps, stopping early if the page is closed.
    fn wait(&self, delay: Duration) -> bool {
        let started = Instant::now();
        while started.elapsed() < delay {
            if self.is_closed() {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL.min(delay.saturating_sub(started.elapsed())));
        }
        !self.is_closed()
    }
}

impl Page for FakePage {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationOutcome> {
        if self.is_closed() {
            return Err(SnapshotError::from_navigation_error(url, "target closed"));
        }
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);

        let site = self.sites.lock().get(url).cloned().ok_or_else(|| {
            SnapshotError::from_navigation_error(url, "net::ERR_NAME_NOT_RESOLVED")
        })?;

        if site.load_delay > timeout {
            self.wait(timeout);
            return Err(SnapshotError::from_navigation_error(
                url,
                "Timeout while waiting for event Page.frameStoppedLoading",
            ));
        }
        if !self.wait(site.load_delay) {
            return Err(SnapshotError::from_navigation_error(url, "target closed"));
        }

        let outcome = NavigationOutcome {
            url: url.to_string(),
            status: site.status,
            title: site.title.clone(),
            text_excerpt: site.text.clone(),
        };
        *self.current.lock() = Some(site);
        Ok(outcome)
    }

    fn accessibility_tree(&self) -> Result<Option<AccessibilityNode>> {
        let current = self.current.lock().clone();
        match current {
            Some(site) if site.panic_on_extract => panic!("accessibility script crashed"),
            Some(site) => Ok(site.tree),
            None => Ok(None),
        }
    }

    fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
            self.counters.open_pages.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_page_lifecycle() {
        let engine = FakeEngine::new().with_site("https://a.test/", FakeSite::new(AccessibilityNode::new("main")));
        let first = engine.new_page().unwrap();
        let second = engine.new_page().unwrap();
        first.close().unwrap();
        first.close().unwrap();

        let stats = engine.stats();
        assert_eq!(stats.launches, 1);
        assert_eq!(stats.pages_opened, 2);
        assert_eq!(stats.pages_closed, 1);
        assert_eq!(stats.open_pages, 1);
        assert_eq!(stats.peak_open_pages, 2);
        drop(second);
    }

    #[test]
    fn unknown_site_is_a_network_failure() {
        let engine = FakeEngine::new();
        let page = engine.new_page().unwrap();
        let err = page.navigate("https://nowhere.test/", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SnapshotError::NavigationFailed(_)));
    }

    #[test]
    fn close_interrupts_a_slow_load() {
        let engine = FakeEngine::new().with_site(
            "https://slow.test/",
            FakeSite::new(AccessibilityNode::new("main")).with_load_delay(Duration::from_secs(30)),
        );
        let page = Arc::new(engine.new_page().unwrap());

        let closer = {
            let page = Arc::clone(&page);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                page.close().unwrap();
            })
        };
        let started = Instant::now();
        assert!(page.navigate("https://slow.test/", Duration::from_secs(60)).is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
        closer.join().unwrap();
    }
}
