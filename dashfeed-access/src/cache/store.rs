//! In-memory TTL cache keyed by resource key.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use super::freshness::CacheRead;
use super::ttl::TtlPolicy;

/// Last fetched value for one key.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// Monotonic fetch time; drives expiry.
    fetched_at: Instant,
    /// Wall-clock fetch time; reported to callers.
    fetched_wall: DateTime<Utc>,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries evicted because a read found them past their TTL.
    pub expirations: u64,
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTL cache with lazy expiry.
///
/// An entry is fresh while `age < ttl(key)`. Only successful payloads are
/// ever written; a failed fetch leaves whatever was here untouched.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    policy: TtlPolicy,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// Fresh value for `key`, or `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.read(key).map(CacheRead::into_value)
    }

    /// Fresh value for `key` with its age and TTL.
    ///
    /// Discovering an expired entry evicts it.
    pub fn read(&self, key: &str) -> Option<CacheRead<V>> {
        let ttl = self.policy.ttl_for(key);
        let mut entries = self.entries();

        let Some(entry) = entries.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key, "cache miss");
            return None;
        };

        let age = Instant::now().saturating_duration_since(entry.fetched_at);
        if age >= ttl {
            entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, age_ms = age.as_millis() as u64, "cache entry expired");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, age_ms = age.as_millis() as u64, "cache hit");
        Some(CacheRead::new(
            entry.value.clone(),
            entry.fetched_wall,
            age,
            ttl,
        ))
    }

    /// Store `value`, stamping it with the current time.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        tracing::debug!(key = %key, "cache set");
        self.entries().insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                fetched_wall: Utc::now(),
            },
        );
    }

    /// Whether a fresh entry exists. Does not evict and does not count as a hit or miss.
    pub fn has(&self, key: &str) -> bool {
        let ttl = self.policy.ttl_for(key);
        self.entries()
            .get(key)
            .map(|entry| Instant::now().saturating_duration_since(entry.fetched_at) < ttl)
            .unwrap_or(false)
    }

    /// Remove every entry whose key contains `pattern`, or everything when
    /// `pattern` is `None`. Returns the number of entries removed.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        match pattern {
            Some(pattern) => entries.retain(|key, _| !key.contains(pattern)),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        tracing::debug!(pattern = pattern.unwrap_or("*"), removed, "cache cleared");
        removed
    }

    /// Number of stored entries, expired ones included until a read evicts them.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
        }
    }

    // Entries are plain values replaced wholesale, so a poisoned lock cannot
    // expose a half-written entry.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn cache() -> TtlCache<&'static str> {
        TtlCache::new(
            TtlPolicy::new(Duration::from_secs(30))
                .with_ttl("/api/last-token", Duration::from_secs(10)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_served_until_ttl_then_absent() {
        let cache = cache();
        cache.set("stats", "active:3");

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get("stats"), Some("active:3"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("stats"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_exclusive_at_ttl() {
        let cache = cache();
        cache.set("/api/last-token", "tok");
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!cache.has("/api/last-token"));
        assert_eq!(cache.get("/api/last-token"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_read_evicts() {
        let cache = cache();
        cache.set("/api/last-token", "tok");
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/api/last-token"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_does_not_evict() {
        let cache = cache();
        cache.set("/api/last-token", "tok");
        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(!cache.has("/api/last-token"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_and_restarts_clock() {
        let cache = cache();
        cache.set("stats", "old");
        tokio::time::advance(Duration::from_secs(25)).await;
        cache.set("stats", "new");
        tokio::time::advance(Duration::from_secs(25)).await;

        let read = cache.read("stats").unwrap();
        assert_eq!(*read.value(), "new");
        assert_eq!(read.age(), Duration::from_secs(25));
        assert_eq!(read.remaining(), Duration::from_secs(5));
    }

    #[test]
    fn test_clear_by_substring() {
        let cache = cache();
        cache.set("/api/trades/active", "a");
        cache.set(r#"/api/trades/sold_{"query":{"limit":"50"}}"#, "b");
        cache.set("/api/stats", "c");

        assert_eq!(cache.clear(Some("/api/trades")), 2);
        assert!(cache.has("/api/stats"));
        assert!(!cache.has("/api/trades/active"));
    }

    #[test]
    fn test_clear_all() {
        let cache = cache();
        cache.set("a", "1");
        cache.set("b", "2");
        assert_eq!(cache.clear(None), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_hit_rate() {
        let cache = cache();
        cache.set("a", "1");
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    proptest! {
        #[test]
        fn fresh_iff_younger_than_ttl(ttl_ms in 1u64..120_000, elapsed_ms in 0u64..240_000) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            rt.block_on(async {
                let cache = TtlCache::new(TtlPolicy::new(Duration::from_millis(ttl_ms)));
                cache.set("k", 7u32);
                tokio::time::advance(Duration::from_millis(elapsed_ms)).await;
                let got = cache.get("k");
                if elapsed_ms < ttl_ms {
                    prop_assert_eq!(got, Some(7));
                } else {
                    prop_assert_eq!(got, None);
                }
                Ok(())
            })?;
        }
    }
}
