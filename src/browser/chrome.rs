use crate::accessibility::{AccessibilityNode, TreePayload};
use crate::core::{BrowserConfig, BrowserEngine, NavigationOutcome, Page};
use crate::errors::{Result, SnapshotError};
use crate::utils::javascript::{
    ACCESSIBILITY_TREE_SCRIPT, NAVIGATION_PROBE_SCRIPT, WAIT_FOR_CONTENT_SCRIPT,
};
use headless_chrome::protocol::cdp::Target;
use headless_chrome::{Browser, LaunchOptions, Tab};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chrome driven over the DevTools protocol. One browser process is shared by
/// all pages; each page gets its own incognito context so cookies and storage
/// never leak between requests.
pub struct ChromeEngine {
    config: BrowserConfig,
    launch_args: Vec<String>,
    browser: Mutex<Option<Browser>>,
}

impl ChromeEngine {
    pub fn new(config: BrowserConfig) -> Self {
        let launch_args = launch_args(&config);
        Self {
            config,
            launch_args,
            browser: Mutex::new(None),
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'_>> {
        let config = &self.config;
        LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .idle_browser_timeout(Duration::from_millis(config.idle_timeout_ms))
            .args(self.launch_args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| SnapshotError::Configuration(e.to_string()))
    }

    /// The running browser, launching one if needed.
    fn browser(&self) -> Result<Browser> {
        let mut slot = self.browser.lock();
        if let Some(browser) = slot.as_ref() {
            return Ok(browser.clone());
        }

        let options = self.launch_options()?;
        let browser = Browser::new(options).map_err(|e| {
            SnapshotError::LaunchFailure(format!(
                "{e}; install Chrome or Chromium, or set CHROME_PATH"
            ))
        })?;
        if let Ok(version) = browser.get_version() {
            info!(product = %version.product, "launched browser");
        }
        *slot = Some(browser.clone());
        Ok(browser)
    }

    fn open_page(&self, browser: &Browser) -> Result<ChromePage> {
        let context = browser
            .new_context()
            .map_err(SnapshotError::from_engine_error)?;
        let context_id = context.get_id().to_string();
        let tab = context
            .new_tab()
            .map_err(SnapshotError::from_engine_error)?;
        debug!(%context_id, "opened page");

        Ok(ChromePage {
            tab,
            browser: browser.clone(),
            context_id,
            closed: AtomicBool::new(false),
        })
    }
}

fn launch_args(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
    ];
    if let Some(ua) = &config.user_agent {
        args.push(format!("--user-agent={}", ua));
    }
    if config.disable_images {
        args.push("--blink-settings=imagesEnabled=false".to_string());
    }
    args.extend(config.args.iter().cloned());
    args
}

impl BrowserEngine for ChromeEngine {
    type Page = ChromePage;

    fn launch(&self) -> Result<()> {
        self.browser().map(|_| ())
    }

    fn new_page(&self) -> Result<ChromePage> {
        let browser = self.browser()?;
        match self.open_page(&browser) {
            Ok(page) => Ok(page),
            Err(e) => {
                // The process may have died or idled out; relaunch once.
                warn!("opening page failed ({}), relaunching browser", e);
                self.shutdown();
                let browser = self.browser()?;
                self.open_page(&browser)
            }
        }
    }

    fn is_running(&self) -> bool {
        self.browser.lock().is_some()
    }

    fn shutdown(&self) {
        if self.browser.lock().take().is_some() {
            info!("browser shut down");
        }
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
    browser: Browser,
    context_id: String,
    closed: AtomicBool,
}

impl ChromePage {
    fn evaluate_json<T: DeserializeOwned>(&self, script: &str, await_promise: bool) -> anyhow::Result<T> {
        let result = self.tab.evaluate(script, await_promise)?;
        let raw = result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| anyhow::anyhow!("script did not return a JSON string"))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl Page for ChromePage {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationOutcome> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .map_err(|e| SnapshotError::from_navigation_error(url, e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| SnapshotError::from_navigation_error(url, e))?;

        // Late scripts still rendering is not fatal; snapshot what is there.
        if let Err(e) = self.tab.evaluate(WAIT_FOR_CONTENT_SCRIPT, true) {
            debug!(%url, "content wait did not finish: {}", e);
        }

        let outcome: NavigationOutcome = self
            .evaluate_json(NAVIGATION_PROBE_SCRIPT, false)
            .map_err(|e| SnapshotError::from_navigation_error(url, e))?;
        Ok(outcome)
    }

    fn accessibility_tree(&self) -> Result<Option<AccessibilityNode>> {
        self.evaluate_json::<TreePayload>(ACCESSIBILITY_TREE_SCRIPT, false)
            .map_err(|e| SnapshotError::ExtractionFailed(e.to_string()))?
            .into_tree()
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.tab.close(false) {
            debug!(context_id = %self.context_id, "tab close failed: {}", e);
        }
        self.browser
            .call_method(Target::DisposeBrowserContext {
                browser_context_id: self.context_id.clone(),
            })
            .map_err(SnapshotError::from_engine_error)?;
        debug!(context_id = %self.context_id, "closed page");
        Ok(())
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to dispose browser context: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::snapshot_text;

    #[test]
    fn launch_options_carry_configuration() {
        let engine = ChromeEngine::new(BrowserConfig {
            args: vec!["--lang=en-US".to_string()],
            ..Default::default()
        });
        let options = engine.launch_options().unwrap();

        assert!(options.headless);
        assert_eq!(options.window_size, Some((1280, 720)));
        let args: Vec<String> = options
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--window-size=1280,720".to_string()));
        assert!(args.contains(&"--lang=en-US".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=")));
        assert!(!engine.is_running());
    }

    #[test]
    #[ignore = "requires a local Chrome installation"]
    fn snapshots_a_data_url() {
        let engine = ChromeEngine::new(BrowserConfig::default());
        let page = engine.new_page().unwrap();
        page.navigate(
            "data:text/html,<main><h1>Hello</h1><button>Login</button></main>",
            Duration::from_secs(10),
        )
        .unwrap();

        let text = snapshot_text(&page).unwrap();
        assert!(text.contains("[button]"));
        assert!(text.contains("Name: Login"));
        page.close().unwrap();
        engine.shutdown();
    }
}
