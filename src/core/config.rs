use crate::errors::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Hosts whose snapshots are cached when no list is configured.
pub const DEFAULT_HOT_URLS: &[&str] = &["amazon.com", "github.com", "google.com", "stackoverflow.com"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    /// Chrome binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub disable_images: bool,
    pub args: Vec<String>,
    /// How long an unused browser process stays alive before the engine
    /// drops its connection.
    pub idle_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of pages open at once. Further requests queue.
    pub pool_size: usize,
    pub navigation_timeout_ms: u64,
    /// Overall deadline for navigation plus extraction.
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Zero disables caching.
    pub max_entries: usize,
    pub hot_urls: Vec<String>,
    pub prewarm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            chrome_path: None,
            disable_images: false,
            args: vec![],
            idle_timeout_ms: 600_000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            navigation_timeout_ms: 30_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            hot_urls: DEFAULT_HOT_URLS.iter().map(|s| s.to_string()).collect(),
            prewarm: false,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl SessionConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Build a configuration from `SNAPSHOT_*` environment variables on top of
    /// the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Config::default();

        if let Some(headless) = env.get_bool("SNAPSHOT_HEADLESS") {
            config.browser.headless = headless;
        }
        if let Some(user_agent) = env.get("SNAPSHOT_USER_AGENT") {
            config.browser.user_agent = Some(user_agent);
        }
        if let Some(path) = env.get("CHROME_PATH") {
            config.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(pool_size) = env.get_parsed::<usize>("SNAPSHOT_POOL_SIZE")? {
            config.session.pool_size = pool_size;
        }
        if let Some(secs) = env.get_parsed::<u64>("SNAPSHOT_NAVIGATION_TIMEOUT_SECS")? {
            config.session.navigation_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = env.get_parsed::<u64>("SNAPSHOT_REQUEST_TIMEOUT_SECS")? {
            config.session.request_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(max_entries) = env.get_parsed::<usize>("SNAPSHOT_CACHE_MAX_ENTRIES")? {
            config.cache.max_entries = max_entries;
        }
        if let Some(hot_urls) = env.get_csv("SNAPSHOT_HOT_URLS") {
            config.cache.hot_urls = hot_urls;
        }
        if let Some(prewarm) = env.get_bool("SNAPSHOT_PREWARM") {
            config.cache.prewarm = prewarm;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.pool_size == 0 {
            return Err(SnapshotError::Configuration(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.session.navigation_timeout_ms == 0 || self.session.request_timeout_ms == 0 {
            return Err(SnapshotError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.browser.viewport.width == 0 || self.browser.viewport.height == 0 {
            return Err(SnapshotError::Configuration(
                "viewport dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Blank values count as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
    }

    fn get_parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                SnapshotError::Configuration(format!("{name}={raw:?} is not valid: {e}"))
            }),
        }
    }

    fn get_csv(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_service_contract() {
        let config = Config::default();
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.session.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.navigation_timeout(), Duration::from_secs(30));
        assert!(config.cache.hot_urls.iter().any(|h| h == "github.com"));
        assert!(config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SNAPSHOT_POOL_SIZE", "2"),
            ("SNAPSHOT_REQUEST_TIMEOUT_SECS", "45"),
            ("SNAPSHOT_CACHE_MAX_ENTRIES", "10"),
            ("SNAPSHOT_HOT_URLS", " example.com, ,docs.rs "),
            ("SNAPSHOT_HEADLESS", "no"),
            ("SNAPSHOT_PREWARM", "Yes"),
            ("CHROME_PATH", "/usr/bin/chromium"),
        ]))
        .unwrap();

        assert_eq!(config.session.pool_size, 2);
        assert_eq!(config.session.request_timeout_ms, 45_000);
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.cache.hot_urls, vec!["example.com", "docs.rs"]);
        assert!(!config.browser.headless);
        assert!(config.cache.prewarm);
        assert_eq!(config.browser.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = Config::from_lookup(lookup(&[
            ("SNAPSHOT_POOL_SIZE", "   "),
            ("SNAPSHOT_USER_AGENT", ""),
        ]))
        .unwrap();
        assert_eq!(config.session.pool_size, 4);
        assert_eq!(config.browser.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("SNAPSHOT_POOL_SIZE", "many")])).unwrap_err();
        assert!(matches!(err, SnapshotError::Configuration(_)));
        assert!(err.to_string().contains("SNAPSHOT_POOL_SIZE"));
    }

    #[test]
    fn zero_pool_is_invalid() {
        let err = Config::from_lookup(lookup(&[("SNAPSHOT_POOL_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, SnapshotError::Configuration(_)));
    }

    #[test]
    fn zero_capacity_is_allowed() {
        let config = Config::from_lookup(lookup(&[("SNAPSHOT_CACHE_MAX_ENTRIES", "0")])).unwrap();
        assert_eq!(config.cache.max_entries, 0);
    }
}
