//! Bounded in-memory snapshot store keyed by normalized URL.
//!
//! Eviction is first-in-first-out: when a new key would push the cache over
//! capacity, the key inserted longest ago is dropped. Overwriting an existing
//! key replaces its value in place and keeps its slot in the eviction order.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Arc<str>,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct SnapshotCache {
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl SnapshotCache {
    /// A cache holding at most `max_entries` snapshots. Zero disables storage.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| Arc::clone(&entry.value))
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Store `value` under `key`, returning the key evicted to make room.
    pub fn put(&self, key: impl Into<String>, value: Arc<str>) -> Option<String> {
        if self.max_entries == 0 {
            return None;
        }

        let key = key.into();
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = Utc::now();
            debug!(key = %key, "cache entry overwritten");
            return None;
        }

        let mut evicted = None;
        if state.entries.len() >= self.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                debug!(key = %oldest, "cache entry evicted");
                evicted = Some(oldest);
            }
        }

        state.order.push_back(key.clone());
        state.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                inserted_at: Utc::now(),
            },
        );
        evicted
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Keys from oldest to newest insertion.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().order.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}
