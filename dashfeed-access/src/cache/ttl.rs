//! TTL lookup policy.

use dashfeed_core::CacheSettings;
use std::collections::BTreeMap;
use std::time::Duration;

/// Maps resource keys to their time-to-live.
///
/// Lookup order: exact key, then the longest configured prefix of the key,
/// then the default. The prefix step lets option variants such as
/// `/api/trades/sold_{"query":{"limit":"50"}}` inherit the TTL of their
/// endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlPolicy {
    default_ttl: Duration,
    table: BTreeMap<String, Duration>,
}

impl TtlPolicy {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            table: BTreeMap::new(),
        }
    }

    /// Set the TTL for a key or key prefix.
    pub fn with_ttl(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.table.insert(key.into(), ttl);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn ttl_for(&self, key: &str) -> Duration {
        if let Some(ttl) = self.table.get(key) {
            return *ttl;
        }
        self.table
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, ttl)| *ttl)
            .unwrap_or(self.default_ttl)
    }
}

impl From<&CacheSettings> for TtlPolicy {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            default_ttl: settings.default_ttl(),
            table: settings
                .ttl_ms
                .iter()
                .map(|(key, ms)| (key.clone(), Duration::from_millis(*ms)))
                .collect(),
        }
    }
}
