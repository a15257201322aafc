//! Time-bounded, pooled access to browser pages.
//!
//! Engine calls block, so every page lives on tokio's blocking thread pool.
//! A fair semaphore caps how many pages are open at once; callers beyond the
//! cap wait in FIFO order. The async side owns the deadline: when it expires
//! the page is closed from outside, the pool slot is released immediately and
//! whatever the worker thread was doing is discarded.

use crate::browser::navigation;
use crate::core::{BrowserEngine, Page};
use crate::errors::{Result, SnapshotError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// The page a worker has opened, shared with the async side so it can be
/// torn down on timeout. `cancelled` is set once the deadline has passed; a
/// worker that finishes opening its page after that closes it unused.
struct SlotState<P> {
    page: Option<Arc<P>>,
    cancelled: bool,
}

type PageSlot<P> = Arc<Mutex<SlotState<P>>>;

pub struct SessionManager<E: BrowserEngine> {
    engine: Arc<E>,
    permits: Arc<Semaphore>,
    pool_size: usize,
    navigation_timeout: Duration,
}

impl<E: BrowserEngine> SessionManager<E> {
    pub fn new(engine: E, pool_size: usize, navigation_timeout: Duration) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            engine: Arc::new(engine),
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            navigation_timeout,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pool slots not currently held by a request.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Launch the browser up front so a broken installation is reported at
    /// startup instead of on the first request.
    pub async fn probe(&self) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.launch()).await??;
        info!("browser engine is ready");
        Ok(())
    }

    pub async fn shutdown(&self) {
        let engine = Arc::clone(&self.engine);
        if let Err(e) = tokio::task::spawn_blocking(move || engine.shutdown()).await {
            warn!("browser shutdown did not complete: {}", e);
        }
    }

    /// Open a page, navigate to `url`, run `f` against the loaded page and
    /// close the page again, all within `timeout`.
    ///
    /// The page is closed on every exit path: success, error, panic inside
    /// `f`, or deadline expiry.
    pub async fn with_page<T, F>(&self, url: &str, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce(&E::Page) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let target = absolute_http_url(url)?;
        let session_id = Uuid::new_v4();
        let started = Instant::now();

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let _permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit
                .map_err(|_| SnapshotError::Internal("browser pool is closed".to_string()))?,
            _ = &mut deadline => {
                warn!(%session_id, url = %target, "timed out waiting for a free browser slot");
                return Err(SnapshotError::NavigationTimeout(format!(
                    "{target}: no browser slot became free within {}ms",
                    timeout.as_millis()
                )));
            }
        };
        debug!(%session_id, url = %target, waited_ms = started.elapsed().as_millis() as u64, "acquired browser slot");

        let slot: PageSlot<E::Page> = Arc::new(Mutex::new(SlotState {
            page: None,
            cancelled: false,
        }));
        let worker = {
            let engine = Arc::clone(&self.engine);
            let slot = Arc::clone(&slot);
            let navigation_timeout = self.navigation_timeout;
            let target = target.to_string();

            tokio::task::spawn_blocking(move || {
                let page = Arc::new(engine.new_page()?);
                let cancelled = {
                    let mut state = slot.lock();
                    if !state.cancelled {
                        state.page = Some(Arc::clone(&page));
                    }
                    state.cancelled
                };
                if cancelled {
                    debug!(%session_id, "page opened after deadline, closing unused");
                    if let Err(e) = page.close() {
                        warn!("failed to close late page: {}", e);
                    }
                    return Err(SnapshotError::NavigationTimeout(format!(
                        "{target}: deadline passed while opening the page"
                    )));
                }
                let _guard = CloseOnDrop { slot };

                let outcome = page.navigate(&target, navigation_timeout)?;
                debug!(%session_id, final_url = %outcome.url, status = ?outcome.status, "navigation settled");
                navigation::ensure_not_blocked(&outcome)?;

                f(&page)
            })
        };

        tokio::select! {
            joined = worker => {
                let result = joined?;
                debug!(%session_id, elapsed_ms = started.elapsed().as_millis() as u64, ok = result.is_ok(), "page session finished");
                result
            }
            _ = &mut deadline => {
                warn!(%session_id, url = %target, "page session exceeded {}ms, tearing down", timeout.as_millis());
                close_from_outside(&slot);
                Err(SnapshotError::NavigationTimeout(format!(
                    "{target}: page did not finish within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

fn absolute_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| SnapshotError::InvalidUrl(format!("{url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(SnapshotError::InvalidUrl(format!(
            "{url:?} is not an absolute http(s) URL"
        ))),
    }
}

/// Closes the page when the worker finishes or unwinds. Whoever takes the
/// page out of the slot first closes it, so it is closed exactly once.
struct CloseOnDrop<P: Page> {
    slot: PageSlot<P>,
}

impl<P: Page> Drop for CloseOnDrop<P> {
    fn drop(&mut self) {
        let page = self.slot.lock().page.take();
        if let Some(page) = page {
            if let Err(e) = page.close() {
                warn!("failed to close page: {}", e);
            }
        }
    }
}

/// Close the page held by a timed-out worker, or mark the slot so a page
/// still being opened is closed as soon as it exists. Closing can block on
/// the engine, so it runs on the blocking pool without being awaited.
fn close_from_outside<P: Page + 'static>(slot: &PageSlot<P>) {
    let page = {
        let mut state = slot.lock();
        state.cancelled = true;
        state.page.take()
    };
    if let Some(page) = page {
        tokio::task::spawn_blocking(move || {
            if let Err(e) = page.close() {
                warn!("failed to close timed-out page: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::AccessibilityNode;
    use crate::testing::{FakeEngine, FakeSite};
    use tokio_test::{assert_err, assert_ok};

    const URL: &str = "https://example.com/";

    fn site() -> FakeSite {
        FakeSite::new(AccessibilityNode::new("main").with_name("Example"))
    }

    fn manager(engine: FakeEngine, pool_size: usize) -> SessionManager<FakeEngine> {
        SessionManager::new(engine, pool_size, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn runs_callback_on_loaded_page_and_closes_it() {
        let sessions = manager(FakeEngine::new().with_site(URL, site()), 2);

        let role = sessions
            .with_page(URL, Duration::from_secs(5), |page| {
                Ok(page.accessibility_tree()?.map(|root| root.role))
            })
            .await;

        assert_eq!(assert_ok!(role), Some("main".to_string()));
        let stats = sessions.engine().stats();
        assert_eq!(stats.pages_opened, 1);
        assert_eq!(stats.pages_closed, 1);
        assert_eq!(sessions.available_slots(), 2);
    }

    #[tokio::test]
    async fn rejects_relative_and_non_http_urls_before_opening_pages() {
        let sessions = manager(FakeEngine::new(), 1);

        for url in ["example.com", "file:///etc/passwd", "about:blank"] {
            let err = sessions
                .with_page(url, Duration::from_secs(1), |_| Ok(()))
                .await
                .unwrap_err();
            assert!(matches!(err, SnapshotError::InvalidUrl(_)), "{url}: {err:?}");
        }
        assert_eq!(sessions.engine().stats().pages_opened, 0);
    }

    #[tokio::test]
    async fn callback_errors_still_close_the_page() {
        let sessions = manager(FakeEngine::new().with_site(URL, site()), 1);

        let result: Result<()> = sessions
            .with_page(URL, Duration::from_secs(5), |_| {
                Err(SnapshotError::ExtractionFailed("boom".into()))
            })
            .await;

        assert!(matches!(assert_err!(result), SnapshotError::ExtractionFailed(_)));
        assert_eq!(sessions.engine().stats().pages_closed, 1);
    }

    #[tokio::test]
    async fn panicking_callback_is_contained_and_page_closed() {
        let sessions = manager(FakeEngine::new().with_site(URL, site()), 1);

        let result: Result<()> = sessions
            .with_page(URL, Duration::from_secs(5), |_| panic!("extractor bug"))
            .await;

        assert!(matches!(result, Err(SnapshotError::Internal(_))));
        assert_eq!(sessions.engine().stats().pages_closed, 1);
        assert_eq!(sessions.available_slots(), 1);
    }

    #[tokio::test]
    async fn deadline_tears_down_page_and_frees_slot() {
        let engine = FakeEngine::new().with_site(URL, site().with_load_delay(Duration::from_secs(10)));
        let sessions = manager(engine, 1);

        let started = Instant::now();
        let result = sessions
            .with_page(URL, Duration::from_millis(100), |_| Ok(()))
            .await;

        assert!(matches!(result, Err(SnapshotError::NavigationTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sessions.available_slots(), 1);

        // The close runs on the blocking pool; give it a moment.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sessions.engine().stats().pages_closed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn deadline_while_opening_page_keeps_pool_bound() {
        let engine = FakeEngine::new()
            .with_open_delay(Duration::from_millis(200))
            .with_site(URL, site());
        let sessions = manager(engine, 1);

        let first = sessions
            .with_page(URL, Duration::from_millis(100), |_| Ok(()))
            .await;
        assert!(matches!(first, Err(SnapshotError::NavigationTimeout(_))));

        let second = sessions.with_page(URL, Duration::from_secs(5), |_| Ok(())).await;
        assert_ok!(second);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let stats = sessions.engine().stats();
        assert_eq!(stats.pages_opened, 2);
        assert_eq!(stats.open_pages, 0);
        assert_eq!(stats.navigations, 1, "late page must not navigate");
        assert!(stats.peak_open_pages <= 1, "peak was {}", stats.peak_open_pages);
    }

    #[tokio::test]
    async fn blocked_navigation_is_classified() {
        let engine = FakeEngine::new().with_site(URL, site().with_status(403));
        let sessions = manager(engine, 1);

        let result = sessions.with_page(URL, Duration::from_secs(5), |_| Ok(())).await;
        assert!(matches!(result, Err(SnapshotError::NavigationBlocked(_))));
        assert_eq!(sessions.engine().stats().pages_closed, 1);
    }

    #[tokio::test]
    async fn launch_failure_surfaces_from_probe() {
        let sessions = manager(FakeEngine::failing_launch("Could not auto detect a chrome executable"), 1);

        let err = sessions.probe().await.unwrap_err();
        assert!(matches!(err, SnapshotError::LaunchFailure(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pages_never_exceed_pool_size() {
        let mut engine = FakeEngine::new();
        for n in 0..6 {
            engine = engine.with_site(
                &format!("https://site{n}.test/"),
                site().with_load_delay(Duration::from_millis(50)),
            );
        }
        let sessions = Arc::new(manager(engine, 2));

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..6 {
            let sessions = Arc::clone(&sessions);
            tasks.spawn(async move {
                sessions
                    .with_page(&format!("https://site{n}.test/"), Duration::from_secs(5), |_| Ok(()))
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            assert_ok!(joined.unwrap());
        }

        let stats = sessions.engine().stats();
        assert_eq!(stats.pages_opened, 6);
        assert_eq!(stats.pages_closed, 6);
        assert!(stats.peak_open_pages <= 2, "peak was {}", stats.peak_open_pages);
    }
}
