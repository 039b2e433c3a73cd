//! Error types for the dashfeed client.

use crate::config::ConfigLoadError;
use dashfeed_core::FeedError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}
