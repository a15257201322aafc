//! The snapshot orchestrator: URL normalization, cache lookup, browser work
//! and cache storage behind the two public operations.

use crate::accessibility;
use crate::browser::SessionManager;
use crate::cache::SnapshotCache;
use crate::core::{BrowserEngine, Config, SnapshotProvider};
use crate::errors::Result;
use crate::matcher;
use crate::types::{MatchResult, SnapshotResult};
use crate::utils::{cache_key, normalize_url, HotUrls};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Owns the page pool and the cache for the life of the process. Build one at
/// startup and share it (behind an `Arc`) with whatever serves requests.
pub struct SnapshotService<E: BrowserEngine> {
    sessions: SessionManager<E>,
    cache: SnapshotCache,
    hot_urls: HotUrls,
    request_timeout: Duration,
}

impl<E: BrowserEngine> SnapshotService<E> {
    pub fn new(engine: E, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sessions: SessionManager::new(
                engine,
                config.session.pool_size,
                config.session.navigation_timeout(),
            ),
            cache: SnapshotCache::new(config.cache.max_entries),
            hot_urls: HotUrls::new(&config.cache.hot_urls),
            request_timeout: config.session.request_timeout(),
        })
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn sessions(&self) -> &SessionManager<E> {
        &self.sessions
    }

    pub fn hot_urls(&self) -> &HotUrls {
        &self.hot_urls
    }

    pub async fn probe(&self) -> Result<()> {
        self.sessions.probe().await.map_err(|e| {
            error!("browser engine unavailable: {}", e);
            e
        })
    }

    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }

    /// Snapshot `raw_url`.
    ///
    /// With `use_cache`, a stored snapshot is returned without touching the
    /// browser. Fresh snapshots are stored only when `use_cache` is set and
    /// the host is on the hot list.
    pub async fn generate_snapshot(&self, raw_url: &str, use_cache: bool) -> Result<SnapshotResult> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        debug!(%request_id, raw_url, use_cache, "snapshot request received");

        let url = normalize_url(raw_url).map_err(|e| {
            warn!(%request_id, "rejected input: {}", e);
            e
        })?;
        let key = cache_key(&url);
        debug!(%request_id, %key, "normalized");

        if use_cache {
            if let Some(text) = self.cache.get(&key) {
                debug!(%request_id, %key, "cache hit");
                return Ok(SnapshotResult::new(text, key, true));
            }
            debug!(%request_id, %key, "cache miss");
        }

        debug!(%request_id, %key, "acquiring page");
        let text = self
            .sessions
            .with_page(&key, self.request_timeout, move |page| {
                debug!(%request_id, "extracting");
                let root = accessibility::extract(page)?;
                debug!(%request_id, "serializing");
                Ok(accessibility::serialize(&root))
            })
            .await
            .map_err(|e| {
                if e.is_fatal() {
                    error!(%request_id, %key, "snapshot failed: {}", e);
                } else {
                    warn!(%request_id, %key, kind = ?e.kind(), "snapshot failed: {}", e);
                }
                e
            })?;
        let text: Arc<str> = Arc::from(text);

        if use_cache && self.hot_urls.is_hot(&url) {
            debug!(%request_id, %key, "storing");
            if let Some(evicted) = self.cache.put(key.clone(), Arc::clone(&text)) {
                info!(%evicted, "evicted snapshot to make room");
            }
        }

        let result = SnapshotResult::new(text, key, false);
        info!(
            %request_id,
            url = %result.resolved_url,
            tokens = result.token_estimate,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snapshot generated"
        );
        Ok(result)
    }

    pub fn match_prompt(&self, snapshot: &str, prompt: &str) -> MatchResult {
        matcher::match_prompt(snapshot, prompt)
    }

    /// Snapshot every concrete hot URL concurrently, bounded by the page pool,
    /// and return how many are now cached.
    pub async fn warm_hot_urls(self: Arc<Self>) -> usize {
        let mut tasks = JoinSet::new();
        for url in self.hot_urls.seed_urls() {
            let service = Arc::clone(&self);
            tasks.spawn(async move {
                let result = service.generate_snapshot(url.as_str(), true).await;
                (url, result)
            });
        }

        let mut warmed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => warmed += 1,
                Ok((url, Err(e))) => warn!(%url, "could not pre-seed cache: {}", e),
                Err(e) => warn!("pre-seed task failed: {}", e),
            }
        }
        info!(warmed, cached = self.cache.len(), "cache warm-up finished");
        warmed
    }
}

#[cfg(feature = "chrome")]
impl SnapshotService<crate::browser::ChromeEngine> {
    /// A service backed by a local Chrome or Chromium install.
    pub fn with_chrome(config: &Config) -> Result<Self> {
        Self::new(crate::browser::ChromeEngine::new(config.browser.clone()), config)
    }
}

#[async_trait]
impl<E: BrowserEngine> SnapshotProvider for SnapshotService<E> {
    async fn generate_snapshot(&self, url: &str, use_cache: bool) -> Result<SnapshotResult> {
        SnapshotService::generate_snapshot(self, url, use_cache).await
    }

    fn match_prompt(&self, snapshot: &str, prompt: &str) -> MatchResult {
        SnapshotService::match_prompt(self, snapshot, prompt)
    }
}
