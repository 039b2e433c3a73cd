//! Request deduplication.
//!
//! At most one pending request exists per key. Callers arriving while it is
//! outstanding, or within the grace window after it settles, receive a clone
//! of the same shared result instead of starting another call.

use dashfeed_core::FeedResult;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Eventual result shared by every caller folded into one request.
pub type SharedResult<V> = Shared<BoxFuture<'static, FeedResult<V>>>;

type PendingTable<V> = Arc<Mutex<HashMap<String, PendingRequest<V>>>>;

struct PendingRequest<V> {
    /// Distinguishes this request from a later one registered under the same key.
    generation: u64,
    result: SharedResult<V>,
}

/// Collapses concurrent identical requests into one underlying operation.
pub struct Deduplicator<V> {
    pending: PendingTable<V>,
    grace: Duration,
    next_generation: AtomicU64,
}

impl<V> Deduplicator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(grace: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            grace,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Join the pending request for `key`, or start `operation` as the new one.
    ///
    /// The operation is driven on its own task, so it runs to completion even
    /// if every caller drops the returned future. Once it settles the entry
    /// lingers for the grace window and is then removed; failures are never
    /// replayed past that point.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn fetch<F, Fut>(&self, key: &str, operation: F) -> SharedResult<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FeedResult<V>> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        if let Some(existing) = pending.get(key) {
            tracing::debug!(key, "joining in-flight request");
            return existing.result.clone();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let table = Arc::clone(&self.pending);
        let owned_key = key.to_string();
        let grace = self.grace;

        let result = async move {
            let outcome = operation().await;
            release_after_grace(table, owned_key, generation, grace);
            outcome
        }
        .boxed()
        .shared();

        pending.insert(
            key.to_string(),
            PendingRequest {
                generation,
                result: result.clone(),
            },
        );
        drop(pending);

        tracing::debug!(key, generation, "registered new request");
        tokio::spawn(result.clone());
        result
    }

    /// Number of keys with a pending or grace-window entry.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.pending).contains_key(key)
    }

    /// Forget every entry. Operations already started still run to completion.
    pub fn clear(&self) {
        lock(&self.pending).clear();
    }

    /// Forget entries whose key contains `pattern`, or all of them.
    /// Returns the number removed.
    pub fn clear_matching(&self, pattern: Option<&str>) -> usize {
        let mut pending = lock(&self.pending);
        let before = pending.len();
        match pattern {
            Some(pattern) => pending.retain(|key, _| !key.contains(pattern)),
            None => pending.clear(),
        }
        before - pending.len()
    }
}

fn release_after_grace<V>(table: PendingTable<V>, key: String, generation: u64, grace: Duration)
where
    V: Send + Sync + 'static,
{
    if grace.is_zero() {
        remove_generation(&table, &key, generation);
        return;
    }
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        remove_generation(&table, &key, generation);
    });
}

fn remove_generation<V>(table: &PendingTable<V>, key: &str, generation: u64) {
    let mut pending = lock(table);
    if pending.get(key).map(|p| p.generation) == Some(generation) {
        pending.remove(key);
        tracing::trace!(key, generation, "released request");
    }
}

fn lock<V>(table: &PendingTable<V>) -> MutexGuard<'_, HashMap<String, PendingRequest<V>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}
