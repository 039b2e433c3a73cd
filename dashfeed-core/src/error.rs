//! Error types for dashfeed operations

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Master error type for fetches flowing through the data-access layer.
///
/// Every variant is `Clone` because one failed network call is handed to
/// every caller that was folded into the same deduplicated request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("HTTP {status} from {path}: {body}")]
    Http {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Transport failure for {path}: {reason}")]
    Transport { path: String, reason: String },

    #[error("Invalid response from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Request queue is closed")]
    QueueClosed,

    #[error("Request for {key} was abandoned before it settled")]
    Abandoned { key: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl FeedError {
    /// True for failures reported by the remote side rather than the local plumbing.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Transport { .. } | Self::Decode { .. })
    }
}

/// Result type alias for dashfeed operations.
pub type FeedResult<T> = Result<T, FeedError>;

// =============================================================================
// TESTS
// =============================================================================
