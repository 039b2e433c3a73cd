//! Dashboard context: resource loaders, tier wiring and lifecycle.
//!
//! Explicitly constructed and passed around; several independent instances
//! can live side by side (tests do this).
//!
//! Lifecycle: [`Dashboard::new`] → [`init`](Dashboard::init) (first load, then
//! polling) → [`stop`](Dashboard::stop) / [`start`](Dashboard::start) →
//! [`dispose`](Dashboard::dispose).

use dashfeed_access::{action_fn, AccessStats, DataAccess, TierAction, TierSnapshot, TieredScheduler};
use dashfeed_core::{
    ApiRequest, ConfigError, FeedConfig, FeedResult, Payload, Renderer, Resource, Transport,
    TIER_CRITICAL, TIER_NORMAL, TIER_SLOW,
};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which resources each tier refreshes.
pub const TIER_RESOURCES: [(&str, &[Resource]); 3] = [
    (TIER_CRITICAL, &[Resource::ActiveTrades, Resource::LastToken]),
    (TIER_NORMAL, &[Resource::Stats]),
    (TIER_SLOW, &[Resource::WalletBalance, Resource::BotState]),
];

/// Result of the first-paint load.
#[derive(Debug, Clone, PartialEq)]
pub struct EssentialData {
    pub stats: Payload,
    pub active_trades: Payload,
    pub last_token: Payload,
}

pub struct Dashboard {
    access: Arc<DataAccess>,
    scheduler: TieredScheduler,
    initialized: AtomicBool,
    disposed: AtomicBool,
}

impl Dashboard {
    /// Build the access layer and the tier table from `config`.
    ///
    /// Nothing is fetched and no timer runs until [`init`](Self::init) or
    /// [`start`](Self::start). Must be called from within a Tokio runtime.
    pub fn new(
        config: &FeedConfig,
        transport: Arc<dyn Transport>,
        renderer: Arc<dyn Renderer>,
    ) -> FeedResult<Self> {
        config.validate()?;
        let access = Arc::new(DataAccess::from_config(config, transport, renderer));

        let scheduler = TieredScheduler::new(config.scheduler.tick());
        for (tier, resources) in TIER_RESOURCES {
            let interval = config.scheduler.tier_interval(tier).ok_or_else(|| {
                ConfigError::MissingRequired {
                    field: format!("scheduler.tiers.{}", tier),
                }
            })?;
            scheduler.add_tier(tier, interval, tier_action(&access, tier, resources));
        }

        Ok(Self {
            access,
            scheduler,
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        })
    }

    // ------------------------------------------------------------------------
    // Loaders
    // ------------------------------------------------------------------------

    /// Fetch `resource` through the access layer and render it.
    ///
    /// Failures are logged here and returned; there is no retry.
    pub async fn load(&self, resource: Resource, force_refresh: bool) -> FeedResult<Payload> {
        load_logged(&self.access, resource, force_refresh).await
    }

    pub async fn load_active_trades(&self, force_refresh: bool) -> FeedResult<Payload> {
        self.load(Resource::ActiveTrades, force_refresh).await
    }

    pub async fn load_stats(&self, force_refresh: bool) -> FeedResult<Payload> {
        self.load(Resource::Stats, force_refresh).await
    }

    pub async fn load_last_token(&self, force_refresh: bool) -> FeedResult<Payload> {
        self.load(Resource::LastToken, force_refresh).await
    }

    pub async fn load_wallet_balance(&self, force_refresh: bool) -> FeedResult<Payload> {
        self.load(Resource::WalletBalance, force_refresh).await
    }

    pub async fn load_bot_state(&self, force_refresh: bool) -> FeedResult<Payload> {
        self.load(Resource::BotState, force_refresh).await
    }

    pub async fn load_sold_trades(&self, force_refresh: bool) -> FeedResult<Payload> {
        self.load(Resource::SoldTrades, force_refresh).await
    }

    /// Stats, active trades and last token together; fails if any of them fails.
    pub async fn load_essential(&self, force_refresh: bool) -> FeedResult<EssentialData> {
        let (stats, active_trades, last_token) = tokio::try_join!(
            self.load_stats(force_refresh),
            self.load_active_trades(force_refresh),
            self.load_last_token(force_refresh),
        )?;
        Ok(EssentialData {
            stats,
            active_trades,
            last_token,
        })
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// First load followed by polling. Only the first call does anything.
    ///
    /// A failed first load is logged and polling starts anyway, since the
    /// next tier tick retries it. Returns whether this call initialized.
    pub async fn init(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::info!("dashboard initializing");
        match self.load_essential(false).await {
            Ok(_) => tracing::info!("essential data loaded"),
            Err(err) => tracing::error!(error = %err, "essential data load failed"),
        }
        self.start();
        tracing::info!("dashboard initialized");
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Start tier polling. No-op while running or after disposal.
    pub fn start(&self) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            tracing::warn!("start ignored: dashboard disposed");
            return false;
        }
        self.scheduler.start()
    }

    /// Stop tier polling. Loads already dispatched still complete.
    pub fn stop(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop polling, close the request queue and drop every cache line.
    ///
    /// Afterwards every load that needs the network fails with
    /// `FeedError::QueueClosed`. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scheduler.stop();
        self.access.close();
        let cleared = self.access.clear_cache(None);
        tracing::info!(cleared, "dashboard disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Cache control
    // ------------------------------------------------------------------------

    /// Drop cache lines containing `pattern`, or all of them.
    ///
    /// Pending requests for those lines are released too, so the next load
    /// goes to the network instead of joining one started before the clear.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        self.access.invalidate(pattern)
    }

    /// Clear everything, then force a fresh essential load.
    pub async fn refresh_all(&self) -> FeedResult<EssentialData> {
        tracing::info!("forcing refresh of all data");
        self.clear_cache(None);
        self.load_essential(true).await
    }

    /// When the cached copy of `resource` was fetched, if one is still fresh.
    pub fn last_updated(&self, resource: Resource) -> Option<DateTime<Utc>> {
        self.access.peek(resource).map(|read| read.fetched_at())
    }

    /// Send a mutating request, then invalidate the cache lines it affects.
    ///
    /// The request goes through the queue but is never cached or joined with
    /// another caller's. Lines containing `invalidate` are cleared whatever
    /// the outcome, since a failed mutation may still have been applied.
    /// A GET for those lines that is still in flight resolves for its callers
    /// with pre-action data but is not written back to the cache.
    pub async fn invalidate_after_action(
        &self,
        request: ApiRequest,
        invalidate: &str,
    ) -> FeedResult<Payload> {
        let path = request.path.clone();
        let result = self.access.send(request).await;
        let cleared = self.clear_cache(Some(invalidate));
        match &result {
            Ok(_) => tracing::info!(path = %path, invalidate, cleared, "action applied"),
            Err(err) => {
                tracing::warn!(path = %path, invalidate, cleared, error = %err, "action failed")
            }
        }
        result
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub fn access(&self) -> &DataAccess {
        &self.access
    }

    pub fn stats(&self) -> AccessStats {
        self.access.stats()
    }

    pub fn tiers(&self) -> Vec<TierSnapshot> {
        self.scheduler.snapshot()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}

async fn load_logged(
    access: &DataAccess,
    resource: Resource,
    force_refresh: bool,
) -> FeedResult<Payload> {
    let result = access.load(resource, force_refresh).await;
    if let Err(err) = &result {
        tracing::error!(resource = %resource, force_refresh, error = %err, "load failed");
    }
    result
}

/// Refresh every resource of a tier concurrently. Failures are logged by the loads.
fn tier_action(
    access: &Arc<DataAccess>,
    tier: &'static str,
    resources: &'static [Resource],
) -> Arc<dyn TierAction> {
    let access = Arc::clone(access);
    action_fn(move || {
        let access = Arc::clone(&access);
        async move {
            let results =
                join_all(resources.iter().map(|r| load_logged(&access, *r, false))).await;
            let failed = results.iter().filter(|r| r.is_err()).count();
            if failed > 0 {
                tracing::warn!(tier, failed, total = resources.len(), "tier refresh incomplete");
            } else {
                tracing::debug!(tier, "tier refreshed");
            }
        }
    })
}
