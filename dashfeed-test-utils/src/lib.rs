//! Dashfeed Test Utilities
//!
//! Shared test infrastructure for the dashfeed workspace:
//! - A scripted [`MockTransport`] that records every call it serves
//! - A [`RecordingRenderer`] that captures what loaders render
//! - Proptest generators for resources, cache keys and requests
//! - Fixtures for configuration and backend payloads
//! - Assertions over recorded call timelines

pub use dashfeed_core::{
    ApiRequest, FeedConfig, FeedError, FeedResult, Method, Payload, Renderer, Resource, Transport,
};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// One request served by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub method: Method,
    pub path: String,
    pub cache_key: String,
    pub started_at: Instant,
    pub finished_at: Instant,
}

#[derive(Default)]
struct MockState {
    /// One-shot responses, consumed in order before falling back to `sticky`.
    scripted: HashMap<String, VecDeque<FeedResult<Payload>>>,
    sticky: HashMap<String, FeedResult<Payload>>,
    calls: Vec<CallRecord>,
}

/// Transport answering from a per-path script.
///
/// Paths with no response configured fail with HTTP 404. Every call is
/// recorded with its start and finish instants on tokio's clock, so tests
/// running on a paused clock can assert exact spacing.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    latency: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call takes `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer `path` with `value` on every call.
    pub fn respond(self, path: &str, value: Payload) -> Self {
        lock(&self.state).sticky.insert(path.to_string(), Ok(value));
        self
    }

    /// Fail every call to `path` with `error`.
    pub fn fail(self, path: &str, error: FeedError) -> Self {
        lock(&self.state).sticky.insert(path.to_string(), Err(error));
        self
    }

    /// Queue a one-shot response for the next call to `path`.
    pub fn push_response(&self, path: &str, response: FeedResult<Payload>) {
        lock(&self.state)
            .scripted
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_response(&self, path: &str, response: FeedResult<Payload>) {
        lock(&self.state).sticky.insert(path.to_string(), response);
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.state).calls.len()
    }

    /// Highest number of calls that were in progress at the same moment.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next_response(&self, path: &str) -> FeedResult<Payload> {
        let mut state = lock(&self.state);
        if let Some(response) = state.scripted.get_mut(path).and_then(VecDeque::pop_front) {
            return response;
        }
        state.sticky.get(path).cloned().unwrap_or_else(|| {
            Err(FeedError::Http {
                path: path.to_string(),
                status: 404,
                body: "not found".to_string(),
            })
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: &ApiRequest) -> FeedResult<Payload> {
        let started_at = Instant::now();
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.next_response(&request.path);

        self.active.fetch_sub(1, Ordering::SeqCst);
        lock(&self.state).calls.push(CallRecord {
            method: request.method,
            path: request.path.clone(),
            cache_key: request.cache_key(),
            started_at,
            finished_at: Instant::now(),
        });
        response
    }
}

// ============================================================================
// RECORDING RENDERER
// ============================================================================

/// Renderer that keeps everything it is asked to draw.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    rendered: Mutex<Vec<(Resource, Payload)>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<(Resource, Payload)> {
        lock(&self.rendered).clone()
    }

    pub fn count_for(&self, resource: Resource) -> usize {
        lock(&self.rendered)
            .iter()
            .filter(|(r, _)| *r == resource)
            .count()
    }

    pub fn last(&self, resource: Resource) -> Option<Payload> {
        lock(&self.rendered)
            .iter()
            .rev()
            .find(|(r, _)| *r == resource)
            .map(|(_, data)| data.clone())
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, resource: Resource, data: &Payload) {
        lock(&self.rendered).push((resource, data.clone()));
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for dashfeed types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_resource() -> impl Strategy<Value = Resource> {
        proptest::sample::select(Resource::ALL.to_vec())
    }

    /// Small alphanumeric token, safe in paths and query values.
    pub fn arb_token() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,8}"
    }

    /// GET request for a known resource, optionally carrying query options.
    pub fn arb_request() -> impl Strategy<Value = ApiRequest> {
        (
            arb_resource(),
            proptest::collection::btree_map(arb_token(), arb_token(), 0..3),
        )
            .prop_map(|(resource, query)| {
                query
                    .into_iter()
                    .fold(resource.request(), |req, (k, v)| req.with_query(k, v))
            })
    }

    pub fn arb_cache_key() -> impl Strategy<Value = String> {
        arb_request().prop_map(|req| req.cache_key())
    }

    /// TTL in milliseconds within the range the dashboard uses.
    pub fn arb_ttl_ms() -> impl Strategy<Value = u64> {
        1_000u64..=120_000
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built configuration and backend payloads.

    use super::*;
    use serde_json::json;

    pub const TEST_API_BASE: &str = "http://bot.test:5000";

    /// Stock configuration pointing at a non-routable test host.
    pub fn test_config() -> FeedConfig {
        FeedConfig::new(TEST_API_BASE)
    }

    pub fn stats_payload(active: u64) -> Payload {
        json!({
            "active": active,
            "total_trades": 42,
            "win_rate": 0.61,
            "total_profit_sol": 3.25
        })
    }

    pub fn active_trades_payload(count: usize) -> Payload {
        Payload::Array(
            (0..count)
                .map(|i| {
                    json!({
                        "token_address": format!("Tok{:04}", i),
                        "entry_price": 0.0012,
                        "current_price": 0.0015,
                        "pnl_percent": 25.0
                    })
                })
                .collect(),
        )
    }

    pub fn last_token_payload(symbol: &str) -> Payload {
        json!({ "symbol": symbol, "address": format!("{}Mint", symbol), "detected_at": "2026-01-01T00:00:00Z" })
    }

    pub fn wallet_payload(sol: f64) -> Payload {
        json!({ "sol": sol, "usd": sol * 150.0 })
    }

    pub fn bot_state_payload(running: bool) -> Payload {
        json!({ "running": running, "mode": "live" })
    }

    /// Transport answering every resource the dashboard wires into tiers.
    pub fn dashboard_transport() -> MockTransport {
        MockTransport::new()
            .respond(Resource::Stats.path(), stats_payload(3))
            .respond(Resource::ActiveTrades.path(), active_trades_payload(2))
            .respond(Resource::LastToken.path(), last_token_payload("BONK"))
            .respond(Resource::WalletBalance.path(), wallet_payload(1.5))
            .respond(Resource::BotState.path(), bot_state_payload(true))
            .respond(Resource::SoldTrades.path(), active_trades_payload(5))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over recorded transport activity.

    use super::*;

    /// Assert that no two calls overlapped and consecutive starts are at least `spacing` apart.
    #[track_caller]
    pub fn assert_serialized(calls: &[CallRecord], spacing: Duration) {
        for pair in calls.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(
                next.started_at >= prev.finished_at,
                "call to {} started before call to {} finished",
                next.path,
                prev.path
            );
            assert!(
                next.started_at - prev.started_at >= spacing,
                "calls to {} and {} only {:?} apart, expected at least {:?}",
                prev.path,
                next.path,
                next.started_at - prev.started_at,
                spacing
            );
        }
    }

    #[track_caller]
    pub fn assert_remote_failure<T: std::fmt::Debug>(result: &FeedResult<T>) {
        match result {
            Err(err) if err.is_remote() => {}
            other => panic!("Expected remote failure, got {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_valid(config: &FeedConfig) {
        if let Err(e) = config.validate() {
            panic!("Config validation failed: {:?}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
