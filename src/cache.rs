//! In-memory response cache for explanations.
//!
//! DESIGN
//! ======
//! A pure time-to-live map keyed by `"{text}-{model}"`. No size bound and no
//! LRU: entries live until a sweep finds them older than the TTL. Sweeps run
//! after every `put`, so growth is bounded by traffic rather than a timer.
//!
//! A stale entry is a miss on `get` but stays stored until the next sweep.
//! The cache is process-local and starts empty on every launch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    created_at: Instant,
}

/// Cache key for a selection explained by a given model. Exact match only.
#[must_use]
pub fn cache_key(text: &str, model: &str) -> String {
    format!("{text}-{model}")
}

#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached explanation for `(text, model)`, unless absent or expired.
    #[must_use]
    pub fn get(&self, text: &str, model: &str) -> Option<String> {
        self.get_at(text, model, Instant::now())
    }

    fn get_at(&self, text: &str, model: &str, now: Instant) -> Option<String> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = entries.get(&cache_key(text, model))?;
        if now.saturating_duration_since(entry.created_at) >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store an explanation, replacing any previous entry, then sweep.
    pub fn put(&self, text: &str, model: &str, explanation: impl Into<String>) {
        self.put_at(text, model, explanation.into(), Instant::now());
    }

    fn put_at(&self, text: &str, model: &str, value: String, now: Instant) {
        {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            entries.insert(cache_key(text, model), CacheEntry { value, created_at: now });
        }
        self.sweep_at(now);
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| now.saturating_duration_since(entry.created_at) <= ttl);
        before - entries.len()
    }

    /// Number of stored entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
