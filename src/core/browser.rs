use crate::accessibility::AccessibilityNode;
use crate::errors::Result;
use serde::Deserialize;
use std::time::Duration;

/// A live page in an isolated browsing context.
///
/// Methods block the calling thread; the session manager only ever calls them
/// from the blocking worker pool.
pub trait Page: Send + Sync {
    /// Navigate to an absolute http(s) URL and wait until the document has
    /// loaded, failing after `timeout`.
    fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationOutcome>;

    /// Read the page's accessibility tree from the document root. `None` when
    /// the page has no document body.
    fn accessibility_tree(&self) -> Result<Option<AccessibilityNode>>;

    /// Tear down the page and its browsing context. Must be safe to call more
    /// than once and from another thread while a navigation is in flight.
    fn close(&self) -> Result<()>;
}

/// A headless browser able to hand out pages.
pub trait BrowserEngine: Send + Sync + 'static {
    type Page: Page + 'static;

    /// Start the browser process if it is not running yet.
    fn launch(&self) -> Result<()>;

    /// Open a fresh page in a new browsing context, launching the browser
    /// first if needed.
    fn new_page(&self) -> Result<Self::Page>;

    fn is_running(&self) -> bool;

    /// Stop the browser process. Later calls to `new_page` relaunch it.
    fn shutdown(&self);
}

/// What the page reported once navigation settled.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOutcome {
    #[serde(default)]
    pub url: String,
    /// HTTP status of the main document, when the engine exposes it.
    pub status: Option<u16>,
    #[serde(default)]
    pub title: String,
    /// Leading visible text, used to recognise interstitial pages.
    #[serde(default)]
    pub text_excerpt: String,
}
