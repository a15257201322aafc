pub mod browser;
pub mod config;
pub mod service;

pub use browser::{BrowserEngine, NavigationOutcome, Page};
pub use config::{BrowserConfig, CacheConfig, Config, SessionConfig, Viewport};
pub use service::SnapshotProvider;
