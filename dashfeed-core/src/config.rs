//! Configuration types
//!
//! Every timing constant of the data-access layer lives here so it can be
//! injected rather than hard-coded. Durations are stored as milliseconds in
//! the serialized form and exposed as [`Duration`] accessors.

use crate::error::ConfigError;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const TIER_CRITICAL: &str = "critical";
pub const TIER_NORMAL: &str = "normal";
pub const TIER_SLOW: &str = "slow";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_TTL_MS: u64 = 30_000;
const DEFAULT_GRACE_MS: u64 = 100;
const DEFAULT_SPACING_MS: u64 = 100;
const DEFAULT_TICK_MS: u64 = 5_000;

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub dedup: DedupSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

/// Credentials attached to every outbound request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

/// TTL table. Keys are resource keys or key prefixes.
///
/// Supplying `ttl_ms` replaces the whole table, not individual entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub default_ttl_ms: u64,
    pub ttl_ms: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupSettings {
    /// How long a settled request stays joinable.
    pub grace_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSettings {
    /// Pause between one request settling and the next one starting.
    pub spacing_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSettings {
    pub tick_ms: u64,
    /// Tier name -> refresh interval.
    pub tiers: BTreeMap<String, u64>,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for CacheSettings {
    fn default() -> Self {
        let ttl_ms = [
            (Resource::Stats, 30_000),
            (Resource::ActiveTrades, 15_000),
            (Resource::SoldTrades, 60_000),
            (Resource::WalletBalance, 45_000),
            (Resource::LastToken, 10_000),
            (Resource::BotState, 30_000),
            (Resource::SolPrice, 120_000),
            (Resource::DailyStats, 60_000),
            (Resource::Consolidated, 10_000),
        ]
        .into_iter()
        .map(|(resource, ms)| (resource.path().to_string(), ms))
        .collect();

        Self {
            default_ttl_ms: DEFAULT_TTL_MS,
            ttl_ms,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_GRACE_MS,
        }
    }
}

impl DedupSettings {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            spacing_ms: DEFAULT_SPACING_MS,
        }
    }
}

impl QueueSettings {
    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_ms)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        let tiers = [(TIER_CRITICAL, 10_000), (TIER_NORMAL, 30_000), (TIER_SLOW, 60_000)]
            .into_iter()
            .map(|(name, ms)| (name.to_string(), ms))
            .collect();
        Self {
            tick_ms: DEFAULT_TICK_MS,
            tiers,
        }
    }
}

impl SchedulerSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn tier_interval(&self, name: &str) -> Option<Duration> {
        self.tiers.get(name).copied().map(Duration::from_millis)
    }
}

impl FeedConfig {
    /// Configuration with the dashboard's stock timings for the given API.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            auth: AuthConfig::default(),
            cache: CacheSettings::default(),
            dedup: DedupSettings::default(),
            queue: QueueSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// The grace window may be zero (settled requests become evictable at
    /// once); every other duration must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_base_url".to_string(),
            });
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "api_base_url",
                "must start with http:// or https://",
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("request_timeout_ms", "must be > 0"));
        }
        if self.cache.default_ttl_ms == 0 {
            return Err(ConfigError::invalid("cache.default_ttl_ms", "must be > 0"));
        }
        if let Some((key, _)) = self.cache.ttl_ms.iter().find(|(_, ms)| **ms == 0) {
            return Err(ConfigError::invalid(
                format!("cache.ttl_ms.{}", key),
                "must be > 0",
            ));
        }
        if self.queue.spacing_ms == 0 {
            return Err(ConfigError::invalid("queue.spacing_ms", "must be > 0"));
        }
        if self.scheduler.tick_ms == 0 {
            return Err(ConfigError::invalid("scheduler.tick_ms", "must be > 0"));
        }
        for tier in [TIER_CRITICAL, TIER_NORMAL, TIER_SLOW] {
            match self.scheduler.tiers.get(tier).copied() {
                None => {
                    return Err(ConfigError::MissingRequired {
                        field: format!("scheduler.tiers.{}", tier),
                    })
                }
                Some(0) => {
                    return Err(ConfigError::invalid(
                        format!("scheduler.tiers.{}", tier),
                        "must be > 0",
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
