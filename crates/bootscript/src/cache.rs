//! Boot script result cache
//!
//! Rendered scripts keyed by the raw identifier and the effective profile,
//! each valid for a fixed TTL. Entries live in a [`DashMap`] so concurrent
//! boot requests only contend on a shard, not on the whole cache.
//!
//! Time comes from [`tokio::time::Instant`], which tests can pause and
//! advance.
//!
//! There is no invalidation when configurations change; a stale script can be
//! served for up to one TTL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::matcher::normalize_profile;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default capacity
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    identifier: String,
    profile: String,
}

impl CacheKey {
    fn new(identifier: &str, profile: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            profile: normalize_profile(profile).to_string(),
        }
    }
}

/// One cached script
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub script: String,
    pub node: String,
    pub config: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    /// An empty script is a corrupt entry and never served.
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at && !self.script.is_empty()
    }
}

/// Counters reported by [`ScriptCache::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// TTL cache of rendered boot scripts
#[derive(Debug)]
pub struct ScriptCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ScriptCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl ScriptCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached script for `identifier` and `profile`, if still valid
    pub fn get(&self, identifier: &str, profile: &str) -> Option<String> {
        let key = CacheKey::new(identifier, profile);
        let now = Instant::now();

        let hit = self
            .entries
            .get(&key)
            .and_then(|entry| entry.is_live(now).then(|| entry.script.clone()));

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            // Drop whatever dead entry sits under the key
            self.entries.remove_if(&key, |_, entry| !entry.is_live(now));
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Store a rendered script, replacing any entry under the same key
    pub fn set(&self, identifier: &str, profile: &str, script: &str, node: &str, config: &str) {
        if script.is_empty() {
            return;
        }
        let key = CacheKey::new(identifier, profile);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.make_room();
        }

        let entry = CacheEntry {
            script: script.to_string(),
            node: node.to_string(),
            config: config.to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    fn make_room(&self) {
        let purged = self.purge_expired();
        if self.entries.len() < self.max_entries {
            debug!("Script cache full, purged {} expired entries", purged);
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!("Script cache full, evicting {}", key.identifier);
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get() {
        let cache = ScriptCache::default();
        cache.set("x1000c0s0b0n0", "default", "#!ipxe\nboot\n", "x1000c0s0b0n0", "compute");

        assert_eq!(cache.get("x1000c0s0b0n0", "default").as_deref(), Some("#!ipxe\nboot\n"));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 0, entries: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ScriptCache::new(Duration::from_secs(300), 16);
        cache.set("5", "default", "#!ipxe\n", "x1000c0s0b0n0", "compute");

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("5", "default").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("5", "default").is_none());
        // The dead entry is removed on the miss
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_profile_shares_default_key() {
        let cache = ScriptCache::default();
        cache.set("5", "", "#!ipxe\n", "x1000c0s0b0n0", "compute");

        assert!(cache.get("5", "default").is_some());
        assert!(cache.get("5", "burn-in").is_none());
        assert!(cache.get("x1000c0s0b0n0", "default").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_same_key() {
        let cache = ScriptCache::default();
        cache.set("5", "default", "#!ipxe\nold\n", "x1000c0s0b0n0", "a");
        cache.set("5", "default", "#!ipxe\nnew\n", "x1000c0s0b0n0", "b");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("5", "default").as_deref(), Some("#!ipxe\nnew\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_script_never_cached() {
        let cache = ScriptCache::default();
        cache.set("5", "default", "", "x1000c0s0b0n0", "compute");
        assert!(cache.get("5", "default").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_evicts_oldest() {
        let cache = ScriptCache::new(Duration::from_secs(300), 2);
        cache.set("1", "default", "#!ipxe\n1\n", "n1", "c");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("2", "default", "#!ipxe\n2\n", "n2", "c");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("3", "default", "#!ipxe\n3\n", "n3", "c");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("1", "default").is_none());
        assert!(cache.get("2", "default").is_some());
        assert!(cache.get("3", "default").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_overwrite_keeps_other_entries() {
        let cache = ScriptCache::new(Duration::from_secs(300), 2);
        cache.set("1", "default", "#!ipxe\n1\n", "n1", "c");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("2", "default", "#!ipxe\n2\n", "n2", "c");

        cache.set("2", "", "#!ipxe\n2b\n", "n2", "c");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("1", "default").is_some());
        assert_eq!(cache.get("2", "default").as_deref(), Some("#!ipxe\n2b\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_prefers_purging_expired() {
        let cache = ScriptCache::new(Duration::from_secs(10), 2);
        cache.set("1", "default", "#!ipxe\n1\n", "n1", "c");
        cache.set("2", "default", "#!ipxe\n2\n", "n2", "c");
        tokio::time::advance(Duration::from_secs(11)).await;

        cache.set("3", "default", "#!ipxe\n3\n", "n3", "c");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 0);
    }
}
