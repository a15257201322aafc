use crate::errors::Result;
use crate::types::{MatchResult, SnapshotResult};
use async_trait::async_trait;

/// The two operations the request-routing layer consumes.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Snapshot `url`, serving from cache when `use_cache` is set and an entry
    /// exists.
    async fn generate_snapshot(&self, url: &str, use_cache: bool) -> Result<SnapshotResult>;

    /// Lexical prompt search over snapshot text. Never touches the browser.
    fn match_prompt(&self, snapshot: &str, prompt: &str) -> MatchResult;
}
