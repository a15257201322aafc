use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inbound request as decoded by the outer layer from `{url, use_cache}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub url: String,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

/// Result of one `generate_snapshot` call.
///
/// `snapshot_text` is shared with the cache entry that produced it, so cloning
/// a result never copies the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotResult {
    #[serde(rename = "snapshot")]
    pub snapshot_text: Arc<str>,
    #[serde(rename = "url")]
    pub resolved_url: String,
    pub cached: bool,
    /// Rough LLM token cost (four characters per token). Not exact.
    #[serde(rename = "token_count")]
    pub token_estimate: usize,
}

impl SnapshotResult {
    pub fn new(snapshot_text: Arc<str>, resolved_url: String, cached: bool) -> Self {
        let token_estimate = estimate_tokens(&snapshot_text);
        Self {
            snapshot_text,
            resolved_url,
            cached,
            token_estimate,
        }
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMatch {
    /// 1-based line number within the snapshot.
    #[serde(rename = "line")]
    pub line_number: usize,
    #[serde(rename = "content")]
    pub line_content: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub matches: Vec<PromptMatch>,
    pub prompt: String,
    pub total_matches: usize,
}

impl MatchResult {
    /// Keep at most `limit` matches for display; `total_matches` is preserved.
    pub fn limited(mut self, limit: usize) -> Self {
        self.matches.truncate(limit);
        self
    }
}
