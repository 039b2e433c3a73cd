//! Dashfeed Access - Client-Side Data Access Layer
//!
//! Keeps many independent consumers from flooding the backend with duplicate
//! and redundant polling:
//!
//! - [`cache`]: TTL cache keyed by resource key, with lazy expiry
//! - [`dedup`]: folds concurrent identical requests into one call
//! - [`queue`]: single-lane FIFO with fixed spacing between dispatches
//! - [`scheduler`]: per-tier refresh timing on a periodic tick
//! - [`facade`]: [`DataAccess`], the cache-first entry point composing the above
//!
//! Every component takes its timings by injection, so tests run them on
//! tokio's paused clock.

pub mod cache;
pub mod dedup;
pub mod facade;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use cache::{CacheRead, CacheStats, TtlCache, TtlPolicy};
pub use dedup::{Deduplicator, SharedResult};
pub use facade::{AccessStats, DataAccess};
pub use queue::{QueueStats, RateLimitedQueue};
pub use scheduler::{action_fn, TierAction, TierSnapshot, TieredScheduler};
pub use task::{schedule_repeating, TaskHandle};
