//! HTTP surface tests against a real orchestrator with scripted collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use entrant_gateway_auth::mocks::MockOAuth2Provider;
use entrant_gateway_auth::{AuthError, Token, TokenStore};
use entrant_gateway_core::{EntrantProjector, FetchError, OrderId};
use entrant_gateway_runtime::{
    OrchestratorConfig, SyncError, SyncHandle, SyncOrchestrator, SyncOutcome, SyncReport, SyncRunner,
    SyncTrigger,
};
use entrant_gateway_testing::{FixedClock, InMemoryRosterStore, MockTicketSource, fixtures, test_clock};
use entrant_gateway_web::{AppState, router};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;

type Orchestrator = SyncOrchestrator<MockOAuth2Provider, MockTicketSource, InMemoryRosterStore, FixedClock>;

// ============================================================================
// Harness
// ============================================================================

struct Gateway {
    server: TestServer,
    triggers: mpsc::Receiver<SyncTrigger>,
    provider: MockOAuth2Provider,
    source: MockTicketSource,
    store: InMemoryRosterStore,
}

fn gateway_with(provider: MockOAuth2Provider, authorized: bool) -> Gateway {
    let tokens = TokenStore::new(provider.clone(), test_clock());
    let tokens = Arc::new(if authorized {
        tokens.with_token(Token::new("initial".into(), Some("refresh-0".into()), None))
    } else {
        tokens
    });

    let source = MockTicketSource::with_tickets(vec![
        fixtures::ticket("T1", "GT3-1", "Ann", "Lee", "S1"),
        fixtures::ticket("T2", "GT3-2", "Bo", "Kim", "S2"),
    ]);
    let store = InMemoryRosterStore::new(fixtures::roster_layout(3));
    let orchestrator: Arc<Orchestrator> = Arc::new(SyncOrchestrator::new(
        OrchestratorConfig::new("E1"),
        Arc::clone(&tokens),
        source.clone(),
        store.clone(),
        EntrantProjector::new(fixtures::metadata_ids()),
        fixtures::mapping(3),
        test_clock(),
    ));

    let (handle, triggers) = SyncHandle::channel();
    let server = TestServer::new(router(AppState::new(orchestrator, tokens, handle))).unwrap();
    Gateway {
        server,
        triggers,
        provider,
        source,
        store,
    }
}

fn gateway() -> Gateway {
    gateway_with(MockOAuth2Provider::new(), true)
}

/// Runner that always reports another pass in progress.
struct BusyRunner;

impl SyncRunner for BusyRunner {
    async fn run_sync(&self, trigger: SyncTrigger) -> SyncReport {
        let mut report = SyncReport::started("E1".into(), trigger, chrono::Utc::now());
        report.outcome = SyncOutcome::Failed(SyncError::SyncInProgress);
        report
    }
}

fn tokens() -> Arc<TokenStore<MockOAuth2Provider, FixedClock>> {
    Arc::new(TokenStore::new(MockOAuth2Provider::new(), test_clock()))
}

async fn begin_authorization(server: &TestServer) -> String {
    let response = server.get("/oauth2/authorize").await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    let location = response.header("location");
    let location = location.to_str().unwrap();
    assert!(location.starts_with("https://mock.example/authorize"));
    location.split_once("state=").unwrap().1.to_string()
}

// ============================================================================
// Health and metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let g = gateway();
    let response = g.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_metrics_disabled_by_default() {
    let g = gateway();
    let response = g.server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_rendered_when_enabled() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let (triggers, _receiver) = SyncHandle::channel();
    let state = AppState::new(Arc::new(BusyRunner), tokens(), triggers).with_metrics(handle);
    let server = TestServer::new(router(state)).unwrap();

    server.get("/metrics").await.assert_status_ok();
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_callback_installs_token_and_triggers_sync() {
    let mut g = gateway_with(MockOAuth2Provider::new(), false);
    let state = begin_authorization(&g.server).await;

    let response = g
        .server
        .get("/oauth2/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", &state)
        .await;

    response.assert_status_ok();
    assert_eq!(g.provider.exchange_calls(), 1);
    assert_eq!(g.triggers.try_recv().unwrap(), SyncTrigger::Authorized);

    g.server.post("/sync").await.assert_status_ok();
    assert_eq!(g.source.tokens_seen(), vec!["access-abc"]);
}

#[tokio::test]
async fn test_callback_rejects_wrong_state() {
    let mut g = gateway_with(MockOAuth2Provider::new(), false);
    begin_authorization(&g.server).await;

    let response = g
        .server
        .get("/oauth2/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", "forged")
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");
    assert_eq!(g.provider.exchange_calls(), 0);
    assert!(g.triggers.try_recv().is_err());
}

#[tokio::test]
async fn test_callback_accepts_state_once() {
    let g = gateway_with(MockOAuth2Provider::new(), false);
    let state = begin_authorization(&g.server).await;

    let first = g
        .server
        .get("/oauth2/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", &state)
        .await;
    let replay = g
        .server
        .get("/oauth2/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", &state)
        .await;

    first.assert_status_ok();
    assert_eq!(replay.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(g.provider.exchange_calls(), 1);
}

#[tokio::test]
async fn test_callback_exchange_failure_is_bad_gateway() {
    let provider = MockOAuth2Provider::new().failing_exchange(AuthError::CodeExchangeFailed("invalid_grant".into()));
    let mut g = gateway_with(provider, false);
    let state = begin_authorization(&g.server).await;

    let response = g
        .server
        .get("/oauth2/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", &state)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert!(g.triggers.try_recv().is_err());
}

#[tokio::test]
async fn test_callback_with_platform_error_is_bad_request() {
    let g = gateway_with(MockOAuth2Provider::new(), false);

    let response = g
        .server
        .get("/oauth2/callback")
        .add_query_param("error", "access_denied")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(g.provider.exchange_calls(), 0);
}

// ============================================================================
// Manual sync
// ============================================================================

#[tokio::test]
async fn test_manual_sync_returns_report() {
    let g = gateway();

    let response = g.server.post("/sync").await;

    response.assert_status_ok();
    let report = response.json::<Value>();
    assert_eq!(report["outcome"]["status"], "committed");
    assert_eq!(report["trigger"]["kind"], "manual");
    assert_eq!(report["added"], json!(["T1", "T2"]));
    assert_eq!(g.store.commits(), 1);
}

#[tokio::test]
async fn test_manual_sync_remote_failure() {
    let g = gateway();
    g.source.push_response(Err(FetchError::Timeout));

    let response = g.server.post("/sync").await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let report = response.json::<Value>();
    assert_eq!(report["outcome"]["status"], "failed");
    assert_eq!(report["outcome"]["kind"], "remote");
    assert_eq!(g.store.commit_attempts(), 0);
}

#[tokio::test]
async fn test_manual_sync_without_authorization() {
    let g = gateway_with(MockOAuth2Provider::new(), false);

    let response = g.server.post("/sync").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["outcome"]["kind"], "auth");
    assert_eq!(g.source.calls(), 0);
}

#[tokio::test]
async fn test_manual_sync_in_progress_is_conflict() {
    let (triggers, _receiver) = SyncHandle::channel();
    let server = TestServer::new(router(AppState::new(Arc::new(BusyRunner), tokens(), triggers))).unwrap();

    let response = server.post("/sync").await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["outcome"]["kind"], "sync_in_progress");
}

// ============================================================================
// Webhook
// ============================================================================

#[tokio::test]
async fn test_order_paid_enqueues_sync() {
    let mut g = gateway();

    let response = g
        .server
        .post("/webhooks/order-paid")
        .json(&json!({
            "event": "order-paid",
            "guid": "O1",
            "eventKey": "E1",
            "dateTime": "2024-05-01T10:00:00+02:00",
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert_eq!(
        g.triggers.try_recv().unwrap(),
        SyncTrigger::OrderPaid {
            order_id: OrderId::new("O1")
        }
    );
    assert_eq!(g.source.calls(), 0);
}

#[tokio::test]
async fn test_other_webhook_event_is_rejected() {
    let mut g = gateway();

    let response = g
        .server
        .post("/webhooks/order-paid")
        .json(&json!({"event": "order-refunded", "guid": "O1"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");
    assert!(g.triggers.try_recv().is_err());
}

#[tokio::test]
async fn test_webhook_after_trigger_loop_stopped() {
    let Gateway { server, triggers, .. } = gateway();
    drop(triggers);

    let response = server
        .post("/webhooks/order-paid")
        .json(&json!({"event": "order-paid", "guid": "O1"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}
