//! Dashfeed entry point: poll a bot API and log what changes.

use dashfeed_client::config;
use dashfeed_client::telemetry;
use dashfeed_client::{ClientError, Dashboard, HttpTransport, SummaryRenderer};
use dashfeed_core::Resource;
use std::sync::Arc;
use std::time::Duration;

const STATS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    if let Err(err) = telemetry::init_logging() {
        eprintln!("{}", err);
    }

    let config = config::load()?;
    tracing::info!(api_base_url = %config.api_base_url, "dashfeed starting");

    let transport = Arc::new(HttpTransport::new(&config)?);
    let dashboard = Dashboard::new(&config, transport, Arc::new(SummaryRenderer))?;
    dashboard.init().await;

    let mut stats_ticker = tokio::time::interval(STATS_LOG_INTERVAL);
    stats_ticker.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal?;
                tracing::info!("shutdown requested");
                break;
            }
            _ = stats_ticker.tick() => {
                let stats = dashboard.stats();
                if let Some(read) = dashboard.access().peek(Resource::Stats) {
                    tracing::debug!(
                        age_ms = read.age().as_millis() as u64,
                        expires_in_ms = read.remaining().as_millis() as u64,
                        "cached stats"
                    );
                }
                tracing::info!(
                    cache_entries = stats.cache.entry_count,
                    cache_hit_rate = stats.cache.hit_rate(),
                    requests_sent = stats.queue.dispatched,
                    requests_failed = stats.queue.failed,
                    backlog = stats.queue.backlog(),
                    in_flight = stats.in_flight,
                    "access layer stats"
                );
            }
        }
    }

    dashboard.dispose();
    Ok(())
}
