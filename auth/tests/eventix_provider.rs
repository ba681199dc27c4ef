//! OAuth2 provider tests against a mocked token endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use entrant_gateway_auth::{
    AuthError, EventixOAuthProvider, OAuth2Provider, OAuthConfig, Token, TokenStore,
};
use entrant_gateway_testing::test_clock;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> EventixOAuthProvider {
    let config = OAuthConfig::new(
        "client".into(),
        "secret".into(),
        format!("{}/tokens/authorize", server.uri()),
        format!("{}/tokens", server.uri()),
        "https://gateway.example.com/oauth2/callback".into(),
    );
    EventixOAuthProvider::new(&config).unwrap()
}

fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    body
}

fn state_of(url: &str) -> String {
    url.split("state=").nth(1).unwrap().split('&').next().unwrap().to_string()
}

// ============================================================================
// Refresh grant
// ============================================================================

#[tokio::test]
async fn test_refresh_returns_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", Some("refresh-1"))))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server).refresh_token("refresh-0").await.unwrap();

    assert_eq!(response.access_token, "access-1");
    assert_eq!(response.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(response.expires_in, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn test_invalid_grant_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let result = provider(&server).refresh_token("refresh-0").await;

    assert_eq!(result, Err(AuthError::RefreshRejected("invalid_grant".into())));
}

#[tokio::test]
async fn test_server_failure_is_endpoint_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = provider(&server).refresh_token("refresh-0").await;

    assert!(matches!(result, Err(AuthError::TokenEndpoint(_))));
}

#[tokio::test]
async fn test_unavailable_endpoint_keeps_refresh_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "temporarily_unavailable"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .and(body_string_contains("refresh_token=refresh-0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", None)))
        .expect(1)
        .mount(&server)
        .await;

    let store = TokenStore::new(provider(&server), test_clock())
        .with_token(Token::new("access-0".into(), Some("refresh-0".into()), None));

    let first = store.force_refresh("access-0").await;
    assert!(matches!(first, Err(AuthError::TokenEndpoint(_))));
    assert!(store.is_authorized().await);

    assert_eq!(store.force_refresh("access-0").await.unwrap(), "access-1");
}

// ============================================================================
// Authorization code grant
// ============================================================================

#[tokio::test]
async fn test_code_exchange_through_token_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-a", Some("refresh-a"))))
        .expect(1)
        .mount(&server)
        .await;

    let store = TokenStore::new(provider(&server), test_clock());
    let url = store.begin_authorization().await;
    assert!(url.starts_with(&format!("{}/tokens/authorize?", server.uri())));
    let state = state_of(&url);

    store.complete_authorization("the-code", &state).await.unwrap();

    assert!(store.is_authorized().await);
    assert_eq!(store.get_valid_token().await.unwrap(), "access-a");
}

#[tokio::test]
async fn test_failed_code_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_request"})))
        .mount(&server)
        .await;

    let result = provider(&server).exchange_code("stale").await;

    assert!(matches!(result, Err(AuthError::CodeExchangeFailed(_))));
}

#[tokio::test]
async fn test_slow_endpoint_is_bounded_by_store_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("access-a", None))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let store = TokenStore::new(provider(&server), test_clock()).with_timeout(Duration::from_millis(200));
    let url = store.begin_authorization().await;
    let state = state_of(&url);

    assert_eq!(
        store.complete_authorization("the-code", &state).await,
        Err(AuthError::Timeout)
    );
}
