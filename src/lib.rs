//! Compact, line-oriented accessibility-tree snapshots of web pages.
//!
//! [`SnapshotService`] drives a pooled headless browser to load a page, reads
//! its accessibility tree and serializes it as indented text such as
//!
//! ```text
//! [button]
//!   Name: Login
//! [link]
//!   Name: Home
//! ```
//!
//! Snapshots of hot hosts are cached in memory, and [`match_prompt`] runs a
//! lexical search for a free-text prompt over snapshot text.

pub mod accessibility;
pub mod browser;
pub mod cache;
pub mod core;
pub mod errors;
pub mod matcher;
pub mod service;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod utils;

pub use accessibility::{AccessibilityNode, serialize};
pub use browser::SessionManager;
#[cfg(feature = "chrome")]
pub use browser::{ChromeEngine, ChromePage};
pub use cache::SnapshotCache;
pub use crate::core::{BrowserConfig, BrowserEngine, CacheConfig, Config, Page, SessionConfig, SnapshotProvider};
pub use errors::{ErrorKind, Result, SnapshotError};
pub use matcher::match_prompt;
pub use service::SnapshotService;
pub use types::*;
