//! Freshness metadata for cache reads.
//!
//! A plain `get` answers "is there a fresh copy"; a [`CacheRead`] also says
//! how old that copy is and how long it stays servable.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a cache hit, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    /// The cached value.
    value: T,
    /// Wall-clock time the value was fetched.
    fetched_at: DateTime<Utc>,
    /// Age of the value at the moment of the read.
    age: Duration,
    /// TTL that applied to the key at the moment of the read.
    ttl: Duration,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, age: Duration, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at,
            age,
            ttl,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// How old the data was when it was read.
    pub fn age(&self) -> Duration {
        self.age
    }

    /// Time left before the entry stops being served.
    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age)
    }
}
