//! Configuration loading for the dashfeed binary.
//!
//! The file is TOML and maps onto [`FeedConfig`]. Only `api_base_url` is
//! required; every timing falls back to the dashboard's stock value.

use dashfeed_core::{ConfigError, FeedConfig};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "DASHFEED_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Missing configuration file path (use --config or DASHFEED_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Locate, read and validate the configuration.
pub fn load() -> Result<FeedConfig, ConfigLoadError> {
    let path = resolve_config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV_VAR).ok())
        .ok_or(ConfigLoadError::MissingConfigPath)?;
    let config = from_path(&path)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), api_base_url = %config.api_base_url, "config loaded");
    Ok(config)
}

/// Read and parse a config file without validating it.
pub fn from_path(path: &Path) -> Result<FeedConfig, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml(&contents)
}

pub fn from_toml(contents: &str) -> Result<FeedConfig, ConfigLoadError> {
    Ok(toml::from_str(contents)?)
}

/// `--config <path>` wins over the environment variable.
pub fn resolve_config_path<I>(args: I, env_value: Option<String>) -> Option<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return Some(PathBuf::from(path));
            }
        }
    }
    env_value.filter(|v| !v.trim().is_empty()).map(PathBuf::from)
}
