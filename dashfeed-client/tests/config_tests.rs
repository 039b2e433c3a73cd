//! Config file loading.

use dashfeed_client::config::{from_path, ConfigLoadError};
use dashfeed_core::{ConfigError, TIER_CRITICAL};
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_round_trips_from_file() {
    let file = write_config(
        r#"
        api_base_url = "https://bot.example:5000"
        request_timeout_ms = 4000

        [auth]
        api_key = "secret"

        [queue]
        spacing_ms = 250

        [dedup]
        grace_ms = 0

        [scheduler]
        tick_ms = 1000

        [scheduler.tiers]
        critical = 2000
        normal = 6000
        slow = 12000
        "#,
    );

    let config = from_path(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
    assert_eq!(config.request_timeout(), Duration::from_secs(4));
    assert_eq!(config.queue.spacing(), Duration::from_millis(250));
    assert_eq!(config.dedup.grace(), Duration::ZERO);
    assert_eq!(
        config.scheduler.tier_interval(TIER_CRITICAL),
        Some(Duration::from_secs(2))
    );
    // untouched sections keep the stock TTL table
    assert_eq!(config.cache.ttl_ms["/api/sol-price"], 120_000);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    match from_path(&path) {
        Err(ConfigLoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn malformed_toml_is_parse_error() {
    let file = write_config("api_base_url = ");
    assert!(matches!(from_path(file.path()), Err(ConfigLoadError::Parse(_))));
}

#[test]
fn zero_tier_interval_fails_validation() {
    let file = write_config(
        r#"
        api_base_url = "http://bot:5000"

        [scheduler.tiers]
        critical = 0
        normal = 30000
        slow = 60000
        "#,
    );
    let config = from_path(file.path()).unwrap();
    let err: ConfigLoadError = config.validate().unwrap_err().into();
    assert!(matches!(
        err,
        ConfigLoadError::Invalid(ConfigError::InvalidValue { .. })
    ));
}
