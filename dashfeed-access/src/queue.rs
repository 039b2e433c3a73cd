//! Single-lane, rate-limited request queue.
//!
//! Every network-bound operation goes through one worker task that runs
//! them strictly in arrival order, one at a time, pausing for a fixed
//! spacing after each one settles. A burst of N requests degrades to N
//! sequential calls at the rate limit instead of N simultaneous ones.

use dashfeed_core::{FeedError, FeedResult, RequestId};
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

/// Type-erased operation; resolves to whether it succeeded.
type Job = Box<dyn FnOnce() -> BoxFuture<'static, bool> + Send>;

struct QueuedJob {
    id: RequestId,
    label: String,
    job: Job,
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
struct QueueMetrics {
    enqueued: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of queue activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl QueueStats {
    /// Operations accepted but not yet started.
    pub fn backlog(&self) -> u64 {
        self.enqueued.saturating_sub(self.dispatched)
    }
}

// ============================================================================
// QUEUE
// ============================================================================

/// Handle to the request queue. Clones share the same worker.
#[derive(Clone)]
pub struct RateLimitedQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    spacing: Duration,
    metrics: Arc<QueueMetrics>,
}

impl RateLimitedQueue {
    /// Create the queue and spawn its worker. Must be called from within a Tokio runtime.
    pub fn new(spacing: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let metrics = Arc::new(QueueMetrics::default());
        tokio::spawn(run_worker(receiver, spacing, Arc::clone(&metrics)));
        Self {
            inner: Arc::new(QueueInner {
                sender: Mutex::new(Some(sender)),
                spacing,
                metrics,
            }),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.inner.spacing
    }

    /// Append `operation` to the queue.
    ///
    /// The position in the queue is taken when this is called, not when the
    /// returned future is first polled. The operation runs even if the caller
    /// drops the future; its failure is handed back and never retried.
    pub fn enqueue<T, F, Fut>(
        &self,
        label: impl Into<String>,
        operation: F,
    ) -> impl Future<Output = FeedResult<T>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FeedResult<T>> + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let outcome = operation().await;
                let ok = outcome.is_ok();
                let _ = tx.send(outcome);
                ok
            }
            .boxed()
        });

        let submitted = self.submit(QueuedJob {
            id: RequestId::new(),
            label: label.clone(),
            job,
        });

        async move {
            submitted?;
            rx.await
                .map_err(|_| FeedError::Abandoned { key: label })?
        }
    }

    /// Stop accepting work. Operations already queued still run.
    pub fn close(&self) {
        if self.sender().take().is_some() {
            tracing::info!("request queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    pub fn stats(&self) -> QueueStats {
        let metrics = &self.inner.metrics;
        QueueStats {
            enqueued: metrics.enqueued.load(Ordering::Relaxed),
            dispatched: metrics.dispatched.load(Ordering::Relaxed),
            succeeded: metrics.succeeded.load(Ordering::Relaxed),
            failed: metrics.failed.load(Ordering::Relaxed),
        }
    }

    fn submit(&self, job: QueuedJob) -> FeedResult<()> {
        let sender = self.sender();
        let sender = sender.as_ref().ok_or(FeedError::QueueClosed)?;
        let (id, label) = (job.id, job.label.clone());
        sender.send(job).map_err(|_| FeedError::QueueClosed)?;
        self.inner.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(request_id = %id, key = %label, "request queued");
        Ok(())
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<QueuedJob>>> {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Worker loop: one job at a time, `spacing` after each settles.
///
/// Parks on the channel while the queue is empty and exits once every
/// handle has been closed or dropped and the backlog is drained.
async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<QueuedJob>,
    spacing: Duration,
    metrics: Arc<QueueMetrics>,
) {
    while let Some(QueuedJob { id, label, job }) = receiver.recv().await {
        metrics.dispatched.fetch_add(1, Ordering::Relaxed);
        let span = tracing::debug_span!("queued_request", request_id = %id, key = %label);
        let started = tokio::time::Instant::now();

        let ok = job().instrument(span).await;
        if ok {
            metrics.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            metrics.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(request_id = %id, key = %label, "queued request failed");
        }
        tracing::debug!(
            request_id = %id,
            key = %label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "queued request settled"
        );

        tokio::time::sleep(spacing).await;
    }
    tracing::debug!("request queue worker stopped");
}
