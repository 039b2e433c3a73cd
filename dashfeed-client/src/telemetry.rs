//! Logging setup for the dashfeed binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ClientError;

pub const LOG_ENV_VAR: &str = "DASHFEED_LOG";
pub const LOG_FORMAT_ENV_VAR: &str = "DASHFEED_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Filter directive: `DASHFEED_LOG`, else `RUST_LOG`, else `info`.
pub fn filter_directive(dashfeed_log: Option<String>, rust_log: Option<String>) -> String {
    let set = |v: &String| !v.trim().is_empty();
    dashfeed_log
        .filter(set)
        .or(rust_log.filter(set))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging() -> Result<(), ClientError> {
    let directive = filter_directive(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let env_filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV_VAR).ok().as_deref());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    tracing::debug!(filter = %directive, format = ?format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        assert_eq!(
            filter_directive(Some("dashfeed_access=debug".into()), Some("warn".into())),
            "dashfeed_access=debug"
        );
        assert_eq!(filter_directive(None, Some("warn".into())), "warn");
        assert_eq!(filter_directive(None, None), "info");
        assert_eq!(filter_directive(Some(" ".into()), None), "info");
    }

    #[test]
    fn test_second_init_is_typed_error() {
        // the first call may lose to another test's subscriber; the second never wins
        let _ = init_logging();
        assert!(matches!(init_logging(), Err(ClientError::Logging(_))));
    }

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Text);
    }
}
