//! Dashfeed client library exports.
//!
//! Wires the access layer to the real world: an HTTP transport for the bot
//! API, the [`Dashboard`](dashboard::Dashboard) context that owns the resource
//! loaders and tier schedule, config-file loading and logging setup.

pub mod api_client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api_client::HttpTransport;
pub use dashboard::{Dashboard, EssentialData, TIER_RESOURCES};
pub use error::ClientError;
pub use render::SummaryRenderer;
