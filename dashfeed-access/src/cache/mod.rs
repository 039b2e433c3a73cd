//! Time-to-live cache for backend payloads.
//!
//! One entry per resource key. An entry older than its TTL is treated as
//! absent, never as stale-but-usable, and is evicted lazily on the read that
//! discovers it; there is no background sweep.
//!
//! TTLs come from an injected [`TtlPolicy`] so the table can be tuned
//! without touching the cache itself.
//!
//! # Example
//!
//! ```ignore
//! let policy = TtlPolicy::new(Duration::from_secs(30))
//!     .with_ttl("/api/last-token", Duration::from_secs(10));
//! let cache = TtlCache::new(policy);
//!
//! cache.set("/api/last-token", payload);
//! if let Some(read) = cache.read("/api/last-token") {
//!     tracing::debug!(age_ms = read.age().as_millis() as u64, "served from cache");
//! }
//! ```

pub mod freshness;
pub mod store;
pub mod ttl;

pub use freshness::CacheRead;
pub use store::{CacheStats, TtlCache};
pub use ttl::TtlPolicy;
