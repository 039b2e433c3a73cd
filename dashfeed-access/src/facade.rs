//! Data access facade.
//!
//! The one entry point rendering code calls. Composes the TTL cache, the
//! deduplicator and the rate-limited queue:
//!
//! ```text
//! fetch(key) ─► cache hit? ──yes──► value
//!                   │ no (or forced)
//!                   ▼
//!             deduplicator ──joined──► shared result
//!                   │ new
//!                   ▼
//!             queue.enqueue(operation) ─► cache.set ─► every waiter
//! ```

use dashfeed_core::{
    ApiRequest, FeedConfig, FeedResult, Payload, Renderer, Resource, Transport,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheRead, CacheStats, TtlCache, TtlPolicy};
use crate::dedup::Deduplicator;
use crate::queue::{QueueStats, RateLimitedQueue};

/// Combined counters for the whole access layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessStats {
    pub cache: CacheStats,
    pub queue: QueueStats,
    /// Keys with a pending or grace-window request.
    pub in_flight: usize,
}

/// Cache-first, deduplicated, rate-limited access to the backend.
pub struct DataAccess {
    cache: Arc<TtlCache<Payload>>,
    dedup: Deduplicator<Payload>,
    queue: RateLimitedQueue,
    transport: Arc<dyn Transport>,
    renderer: Arc<dyn Renderer>,
    /// Bumped by every invalidation and by `close`. A request that settles
    /// under a newer count than it started with does not write the cache.
    invalidations: Arc<AtomicU64>,
}

impl DataAccess {
    /// Assemble the facade from its parts. Must be called from within a Tokio runtime.
    pub fn new(
        policy: TtlPolicy,
        grace: Duration,
        spacing: Duration,
        transport: Arc<dyn Transport>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            cache: Arc::new(TtlCache::new(policy)),
            dedup: Deduplicator::new(grace),
            queue: RateLimitedQueue::new(spacing),
            transport,
            renderer,
            invalidations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(
        config: &FeedConfig,
        transport: Arc<dyn Transport>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self::new(
            TtlPolicy::from(&config.cache),
            config.dedup.grace(),
            config.queue.spacing(),
            transport,
            renderer,
        )
    }

    /// Return the value for `key`, running `operation` only when needed.
    ///
    /// Without `force_refresh` a fresh cache entry is returned with no network
    /// activity. Otherwise the call joins any pending request for `key` or
    /// queues `operation` as a new one. A successful result is written to the
    /// cache before any caller sees it; a failure reaches every joined caller
    /// and is never cached.
    ///
    /// `force_refresh` skips the cache read only. Concurrent forced refreshes
    /// of one key still share a single call.
    ///
    /// A request still in flight when [`invalidate`](Self::invalidate) or
    /// [`close`](Self::close) runs hands its result to its callers but leaves
    /// the cache alone.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        operation: F,
        force_refresh: bool,
    ) -> FeedResult<Payload>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FeedResult<Payload>> + Send + 'static,
    {
        if !force_refresh {
            if let Some(hit) = self.cache.get(key) {
                return Ok(hit);
            }
        }

        let queue = self.queue.clone();
        let cache = Arc::clone(&self.cache);
        let invalidations = Arc::clone(&self.invalidations);
        let started_under = invalidations.load(Ordering::SeqCst);
        let owned_key = key.to_string();
        self.dedup
            .fetch(key, move || async move {
                let value = queue.enqueue(owned_key.clone(), operation).await?;
                if invalidations.load(Ordering::SeqCst) == started_under {
                    cache.set(owned_key, value.clone());
                } else {
                    tracing::debug!(key = %owned_key, "result settled after invalidation; not cached");
                }
                Ok(value)
            })
            .await
    }

    /// [`fetch`](Self::fetch) with the request's cache key and the transport as the operation.
    pub async fn get(&self, request: ApiRequest, force_refresh: bool) -> FeedResult<Payload> {
        let key = request.cache_key();
        let transport = Arc::clone(&self.transport);
        self.fetch(
            &key,
            move || async move { transport.request(&request).await },
            force_refresh,
        )
        .await
    }

    /// Fetch a known resource and hand the result to the renderer.
    pub async fn load(&self, resource: Resource, force_refresh: bool) -> FeedResult<Payload> {
        let data = self.get(resource.request(), force_refresh).await?;
        self.renderer.render(resource, &data);
        Ok(data)
    }

    /// Send a request through the queue without caching or deduplication.
    ///
    /// For mutating calls whose effect must not be folded into another caller's.
    pub async fn send(&self, request: ApiRequest) -> FeedResult<Payload> {
        let transport = Arc::clone(&self.transport);
        let label = format!("{} {}", request.method, request.path);
        self.queue
            .enqueue(label, move || async move { transport.request(&request).await })
            .await
    }

    /// Fresh cached value for `resource` with its age, without touching the network.
    pub fn peek(&self, resource: Resource) -> Option<CacheRead<Payload>> {
        self.cache.read(resource.path())
    }

    /// Drop cache lines whose key contains `pattern`, or all of them.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        self.cache.clear(pattern)
    }

    /// Drop matching cache lines along with any pending or grace-window
    /// request for them, so the next fetch goes to the network.
    ///
    /// Requests already in flight still resolve for their callers but no
    /// longer write the cache. Returns the number of cache lines removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        let released = self.dedup.clear_matching(pattern);
        let cleared = self.cache.clear(pattern);
        tracing::debug!(pattern, cleared, released, "invalidated");
        cleared
    }

    /// Stop accepting network work. Cached values stay readable, but nothing
    /// settling after this point is written to the cache and later callers
    /// cannot join a request started before it.
    pub fn close(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.queue.close();
        self.dedup.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn cache(&self) -> &TtlCache<Payload> {
        &self.cache
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn stats(&self) -> AccessStats {
        AccessStats {
            cache: self.cache.stats(),
            queue: self.queue.stats(),
            in_flight: self.dedup.in_flight(),
        }
    }
}

impl std::fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccess")
            .field("cache_entries", &self.cache.len())
            .field("in_flight", &self.dedup.in_flight())
            .field("queue_closed", &self.queue.is_closed())
            .finish()
    }
}
