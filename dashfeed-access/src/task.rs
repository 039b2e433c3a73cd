//! Cancellable repeating background task.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shortest period a repeating task runs at; zero is raised to this.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a repeating task. Dropping it cancels the task.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Signal the task to stop. Does not wait for an in-progress run.
    pub fn cancel(&self) {
        if !*self.shutdown.borrow() {
            let _ = self.shutdown.send(true);
            tracing::debug!(task = self.name, "repeating task cancelled");
        }
    }

    /// True once the loop has exited, whether cancelled or panicked.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Run `f` every `period`, first firing one period from now.
///
/// Missed ticks are skipped rather than bunched up, and a run is awaited
/// before the next tick is considered. A period below [`MIN_PERIOD`] is
/// raised to it.
pub fn schedule_repeating<F, Fut>(name: &'static str, period: Duration, mut f: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period < MIN_PERIOD {
        tracing::warn!(task = name, period_ms = period.as_millis() as u64, "period too short; using minimum");
    }
    let period = period.max(MIN_PERIOD);
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let first_tick = Instant::now() + period;

    let join = tokio::spawn(async move {
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "repeating task started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => f().await,
            }
        }
        tracing::debug!(task = name, "repeating task stopped");
    });

    TaskHandle {
        name,
        shutdown,
        join,
    }
}
