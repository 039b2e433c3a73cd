//! Tiered refresh scheduler.
//!
//! Resources are grouped into freshness tiers, each with its own interval.
//! A single periodic tick evaluates every tier and fires the ones that are
//! due. Actions run on their own tasks: a slow or failing tier never holds up
//! the tick loop or another tier.

use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::task::{schedule_repeating, TaskHandle, MIN_PERIOD};

/// Refresh work performed when a tier comes due.
///
/// Fire-and-forget: implementations log their own failures.
#[async_trait]
pub trait TierAction: Send + Sync {
    async fn refresh(&self);
}

struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> TierAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn refresh(&self) {
        (self.0)().await
    }
}

/// Wrap a closure as a [`TierAction`].
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn TierAction>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnAction(f))
}

struct TierState {
    name: String,
    interval: Duration,
    action: Arc<dyn TierAction>,
    /// `None` until the first run, so every tier is due on the first tick.
    last_run_at: Option<Instant>,
    runs: u64,
}

impl TierState {
    fn is_due(&self, now: Instant) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }
}

/// Point-in-time view of one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSnapshot {
    pub name: String,
    pub interval: Duration,
    pub last_run_at: Option<Instant>,
    pub runs: u64,
}

/// Decides when each tier refreshes. Starts stopped.
pub struct TieredScheduler {
    tiers: Arc<Mutex<Vec<TierState>>>,
    tick: Duration,
    task: Mutex<Option<TaskHandle>>,
}

impl TieredScheduler {
    /// A `tick` below one millisecond is raised to it.
    pub fn new(tick: Duration) -> Self {
        Self {
            tiers: Arc::new(Mutex::new(Vec::new())),
            tick: tick.max(MIN_PERIOD),
            task: Mutex::new(None),
        }
    }

    /// Builder form of [`add_tier`](Self::add_tier).
    pub fn with_tier(
        self,
        name: impl Into<String>,
        interval: Duration,
        action: Arc<dyn TierAction>,
    ) -> Self {
        self.add_tier(name, interval, action);
        self
    }

    /// Register a tier. A tier with the same name is replaced, history included.
    pub fn add_tier(&self, name: impl Into<String>, interval: Duration, action: Arc<dyn TierAction>) {
        let name = name.into();
        let mut tiers = lock(&self.tiers);
        tiers.retain(|tier| tier.name != name);
        tracing::debug!(tier = %name, interval_ms = interval.as_millis() as u64, "tier registered");
        tiers.push(TierState {
            name,
            interval,
            action,
            last_run_at: None,
            runs: 0,
        });
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Begin ticking. Returns `false` if already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut task = self.task();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        let tiers = Arc::clone(&self.tiers);
        *task = Some(schedule_repeating("tier_scheduler", self.tick, move || {
            let tiers = Arc::clone(&tiers);
            async move {
                fire_due(&tiers, Instant::now());
            }
        }));
        tracing::info!(tick_ms = self.tick.as_millis() as u64, "scheduler started");
        true
    }

    /// Stop ticking. Returns `false` if already stopped.
    ///
    /// Refreshes already dispatched keep running.
    pub fn stop(&self) -> bool {
        match self.task().take() {
            Some(handle) => {
                handle.cancel();
                tracing::info!("scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// True while the tick loop is alive.
    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Evaluate every tier against `now` and fire the due ones.
    ///
    /// Returns the names of the tiers fired. This is what each tick does;
    /// it is public so callers can force an evaluation.
    pub fn run_due(&self, now: Instant) -> Vec<String> {
        fire_due(&self.tiers, now)
    }

    pub fn snapshot(&self) -> Vec<TierSnapshot> {
        lock(&self.tiers)
            .iter()
            .map(|tier| TierSnapshot {
                name: tier.name.clone(),
                interval: tier.interval,
                last_run_at: tier.last_run_at,
                runs: tier.runs,
            })
            .collect()
    }

    fn task(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TieredScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Stamp each due tier and spawn its action.
///
/// `last_run_at` is set before the action runs, so a refresh that is slow or
/// fails cannot make its tier fire again on the next tick.
fn fire_due(tiers: &Mutex<Vec<TierState>>, now: Instant) -> Vec<String> {
    let due: Vec<(String, Arc<dyn TierAction>)> = {
        let mut tiers = tiers.lock().unwrap_or_else(PoisonError::into_inner);
        tiers
            .iter_mut()
            .filter(|tier| tier.is_due(now))
            .map(|tier| {
                tier.last_run_at = Some(now);
                tier.runs += 1;
                (tier.name.clone(), Arc::clone(&tier.action))
            })
            .collect()
    };

    for (name, action) in &due {
        tracing::debug!(tier = %name, "tier due");
        let action = Arc::clone(action);
        tokio::spawn(async move { action.refresh().await });
    }
    due.into_iter().map(|(name, _)| name).collect()
}

fn lock(tiers: &Arc<Mutex<Vec<TierState>>>) -> MutexGuard<'_, Vec<TierState>> {
    tiers.lock().unwrap_or_else(PoisonError::into_inner)
}
