//! End-to-end behaviour of the data access layer against a scripted transport.

use dashfeed_access::{action_fn, DataAccess, TieredScheduler};
use dashfeed_core::{FeedError, Payload, Renderer, Resource, Transport};
use dashfeed_test_utils::assertions::{assert_remote_failure, assert_serialized};
use dashfeed_test_utils::fixtures::{self, test_config};
use dashfeed_test_utils::{MockTransport, RecordingRenderer};
use futures_util::future::join_all;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    access: DataAccess,
    transport: Arc<MockTransport>,
    renderer: Arc<RecordingRenderer>,
}

fn harness(transport: MockTransport) -> Harness {
    let transport = Arc::new(transport);
    let renderer = Arc::new(RecordingRenderer::new());
    let access = DataAccess::from_config(
        &test_config(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&renderer) as Arc<dyn Renderer>,
    );
    Harness {
        access,
        transport,
        renderer,
    }
}

fn counting_op(
    calls: &Arc<AtomicUsize>,
    value: Payload,
) -> impl FnOnce() -> futures_util::future::Ready<Result<Payload, FeedError>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        futures_util::future::ready(Ok(value))
    }
}

#[tokio::test(start_paused = true)]
async fn stats_example_scenario() {
    let h = harness(MockTransport::new());

    h.access.cache().set("stats", json!({"active": 3}));
    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(h.access.cache().get("stats"), Some(json!({"active": 3})));
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(h.access.cache().get("stats"), None);

    h.access.clear_cache(None);
    let calls = Arc::new(AtomicUsize::new(0));
    let (a, b) = futures_util::join!(
        h.access.fetch("stats", counting_op(&calls, json!({"active": 4})), false),
        h.access.fetch("stats", counting_op(&calls, json!({"active": 5})), false),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, Ok(json!({"active": 4})));
    assert_eq!(a, b);
}

#[tokio::test(start_paused = true)]
async fn fresh_cache_hit_makes_no_call() {
    let h = harness(fixtures::dashboard_transport());

    let first = h.access.load(Resource::Stats, false).await.unwrap();
    let second = h.access.load(Resource::Stats, false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.transport.call_count("/api/stats"), 1);
    assert_eq!(h.renderer.count_for(Resource::Stats), 2);
    assert_eq!(h.access.stats().cache.hits, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_triggers_new_call() {
    let h = harness(fixtures::dashboard_transport());

    h.access.load(Resource::Stats, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(29)).await;
    h.access.load(Resource::Stats, false).await.unwrap();
    assert_eq!(h.transport.call_count("/api/stats"), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    h.access.load(Resource::Stats, false).await.unwrap();
    assert_eq!(h.transport.call_count("/api/stats"), 2);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_bypasses_and_overwrites_cache() {
    let h = harness(fixtures::dashboard_transport());

    h.access.load(Resource::Stats, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    h.transport
        .set_response("/api/stats", Ok(fixtures::stats_payload(7)));

    let forced = h.access.load(Resource::Stats, true).await.unwrap();
    assert_eq!(forced, fixtures::stats_payload(7));
    assert_eq!(h.transport.call_count("/api/stats"), 2);

    let cached = h.access.load(Resource::Stats, false).await.unwrap();
    assert_eq!(cached, fixtures::stats_payload(7));
    assert_eq!(h.transport.call_count("/api/stats"), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_forced_refreshes_share_one_call() {
    let h = harness(fixtures::dashboard_transport().with_latency(Duration::from_millis(50)));

    let loads = (0..4).map(|_| h.access.load(Resource::ActiveTrades, true));
    let results = join_all(loads).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(h.transport.call_count("/api/trades/active"), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_reaches_every_waiter_and_is_not_cached() {
    let h = harness(MockTransport::new().with_latency(Duration::from_millis(20)).fail(
        "/api/wallet-balance",
        FeedError::Http {
            path: "/api/wallet-balance".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        },
    ));

    let (a, b) = futures_util::join!(
        h.access.load(Resource::WalletBalance, false),
        h.access.load(Resource::WalletBalance, false),
    );
    assert_remote_failure(&a);
    assert_eq!(a, b);
    assert_eq!(h.transport.call_count("/api/wallet-balance"), 1);
    assert!(!h.access.cache().has("/api/wallet-balance"));
    assert_eq!(h.renderer.count_for(Resource::WalletBalance), 0);

    // the failure is not replayed once the grace window has passed
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.access.load(Resource::WalletBalance, false).await.is_err());
    assert_eq!(h.transport.call_count("/api/wallet-balance"), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_entry() {
    let h = harness(fixtures::dashboard_transport());

    h.access.load(Resource::BotState, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    h.transport.set_response(
        "/api/bot/state",
        Err(FeedError::Transport {
            path: "/api/bot/state".to_string(),
            reason: "connection reset".to_string(),
        }),
    );

    assert!(h.access.load(Resource::BotState, true).await.is_err());
    assert_eq!(
        h.access.cache().get("/api/bot/state"),
        Some(fixtures::bot_state_payload(true))
    );
}

#[tokio::test(start_paused = true)]
async fn burst_of_resources_is_serialized_and_spaced() {
    let h = harness(fixtures::dashboard_transport().with_latency(Duration::from_millis(20)));
    let spacing = test_config().queue.spacing();

    let burst = [
        Resource::Stats,
        Resource::ActiveTrades,
        Resource::LastToken,
        Resource::WalletBalance,
        Resource::BotState,
    ];
    let results = join_all(burst.iter().map(|r| h.access.load(*r, false))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    let calls = h.transport.calls();
    assert_eq!(calls.len(), burst.len());
    assert_eq!(h.transport.max_concurrency(), 1);
    assert_serialized(&calls, spacing);
}

#[tokio::test(start_paused = true)]
async fn option_variants_are_separate_cache_lines() {
    let h = harness(fixtures::dashboard_transport());

    let recent = Resource::SoldTrades.request().with_query("limit", "10");
    let all = Resource::SoldTrades.request();
    h.access.get(recent.clone(), false).await.unwrap();
    h.access.get(all, false).await.unwrap();
    h.access.get(recent, false).await.unwrap();

    assert_eq!(h.transport.call_count("/api/trades/sold"), 2);
    assert_eq!(h.access.clear_cache(Some("/api/trades/sold")), 2);
}

#[tokio::test(start_paused = true)]
async fn send_is_neither_cached_nor_deduplicated() {
    let h = harness(MockTransport::new().respond("/api/bot/start", json!({"ok": true})));
    let request = dashfeed_core::ApiRequest::post("/api/bot/start", json!({}));

    let (a, b) = futures_util::join!(h.access.send(request.clone()), h.access.send(request));

    assert_eq!(a, Ok(json!({"ok": true})));
    assert_eq!(b, Ok(json!({"ok": true})));
    assert_eq!(h.transport.call_count("/api/bot/start"), 2);
    assert!(h.access.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closed_access_serves_cache_but_rejects_network() {
    let h = harness(fixtures::dashboard_transport());

    h.access.load(Resource::Stats, false).await.unwrap();
    h.access.close();

    assert!(h.access.is_closed());
    assert!(h.access.load(Resource::Stats, false).await.is_ok());
    assert_eq!(
        h.access.load(Resource::BotState, false).await,
        Err(FeedError::QueueClosed)
    );
}

#[tokio::test(start_paused = true)]
async fn failing_tier_keeps_firing_and_others_are_unaffected() {
    let h = harness(
        fixtures::dashboard_transport().fail(
            "/api/wallet-balance",
            FeedError::Http {
                path: "/api/wallet-balance".to_string(),
                status: 500,
                body: "boom".to_string(),
            },
        ),
    );
    let access = Arc::new(h.access);

    let slow_access = Arc::clone(&access);
    let critical_access = Arc::clone(&access);
    let scheduler = TieredScheduler::new(Duration::from_secs(5))
        .with_tier(
            "slow",
            Duration::from_secs(10),
            action_fn(move || {
                let access = Arc::clone(&slow_access);
                async move {
                    let _ = access.load(Resource::WalletBalance, false).await;
                }
            }),
        )
        .with_tier(
            "critical",
            Duration::from_secs(10),
            action_fn(move || {
                let access = Arc::clone(&critical_access);
                async move {
                    let _ = access.load(Resource::ActiveTrades, false).await;
                }
            }),
        );

    scheduler.start();
    // ticks fire both tiers at 5s, 15s and 25s
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    scheduler.stop();

    assert_eq!(h.transport.call_count("/api/wallet-balance"), 3);
    // active trades live 15s: fetched at 5s, cached at 15s, refetched at 25s
    assert_eq!(h.transport.call_count("/api/trades/active"), 2);
    assert!(scheduler.snapshot().iter().all(|tier| tier.runs == 3));
}

#[tokio::test(start_paused = true)]
async fn close_during_in_flight_fetch_leaves_cache_empty() {
    let h = harness(fixtures::dashboard_transport().with_latency(Duration::from_millis(200)));

    let (first, ()) = tokio::join!(h.access.load(Resource::Stats, false), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.access.close();
    });

    assert_eq!(first, Ok(fixtures::stats_payload(3)));
    assert!(h.access.cache().is_empty());
    assert!(h.access.peek(Resource::Stats).is_none());
    assert_eq!(
        h.access.load(Resource::Stats, false).await,
        Err(FeedError::QueueClosed)
    );
}

#[tokio::test(start_paused = true)]
async fn invalidate_releases_grace_window_request() {
    let h = harness(fixtures::dashboard_transport());

    h.access.load(Resource::Stats, false).await.unwrap();
    assert_eq!(h.access.invalidate(Some("/api/stats")), 1);
    assert_eq!(h.access.stats().in_flight, 0);

    h.transport.set_response("/api/stats", Ok(fixtures::stats_payload(9)));
    let fresh = h.access.load(Resource::Stats, true).await.unwrap();
    assert_eq!(fresh, fixtures::stats_payload(9));
    assert_eq!(h.transport.call_count("/api/stats"), 2);
}
