//! Dashfeed Core - Shared Vocabulary
//!
//! Plain data types used by every other dashfeed crate: the error model,
//! the injected configuration, the catalogue of backend resources and the
//! description of a single API call together with its cache key.
//!
//! This crate performs no I/O and owns no runtime state.

pub mod config;
pub mod error;
pub mod identity;
pub mod request;
pub mod resource;
pub mod traits;

pub use config::{
    AuthConfig, CacheSettings, DedupSettings, FeedConfig, QueueSettings, SchedulerSettings,
    TIER_CRITICAL, TIER_NORMAL, TIER_SLOW,
};
pub use error::{ConfigError, FeedError, FeedResult};
pub use identity::RequestId;
pub use request::{ApiRequest, Method};
pub use resource::Resource;
pub use traits::{NoopRenderer, Renderer, Transport};

/// JSON payload returned by the backend. The data-access layer never looks inside it.
pub type Payload = serde_json::Value;
