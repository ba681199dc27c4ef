//! The token store.
//!
//! Single owner of the platform access token. Readers of a still-valid token
//! take a shared read lock and never contend with each other. Refreshes are
//! serialized by an async mutex and versioned by a generation counter: a
//! caller that waited for the mutex while someone else refreshed gets that
//! refresh's outcome instead of issuing a second request.
//!
//! ```text
//! get_valid_token ──▶ read lock ──▶ fresh? ──yes──▶ access token
//!                                     │ no (generation g)
//!                                     ▼
//!                              refresh mutex ──▶ generation still g?
//!                                     │ yes                │ no
//!                                     ▼                    ▼
//!                              token endpoint        outcome of the
//!                              (bounded by timeout)  refresh that won
//! ```

use crate::error::{AuthError, Result};
use crate::providers::OAuth2Provider;
use crate::token::Token;
use chrono::TimeDelta;
use constant_time_eq::constant_time_eq;
use entrant_gateway_core::{Clock, SystemClock};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct TokenState {
    token: Option<Token>,
    generation: u64,
    outcome: Option<Result<String>>,
}

/// Owns the access token and coordinates refreshes.
#[derive(Debug)]
pub struct TokenStore<P, C = SystemClock> {
    provider: P,
    clock: C,
    timeout: Duration,
    refresh_margin: TimeDelta,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<()>,
    pending_state: Mutex<Option<String>>,
}

impl<P: OAuth2Provider, C: Clock> TokenStore<P, C> {
    /// Create an empty store. Until an authorization completes every token
    /// request fails with [`AuthError::NotAuthorized`].
    #[must_use]
    pub fn new(provider: P, clock: C) -> Self {
        Self {
            provider,
            clock,
            timeout: Duration::from_secs(30),
            refresh_margin: TimeDelta::seconds(60),
            state: RwLock::new(TokenState::default()),
            refresh_lock: Mutex::new(()),
            pending_state: Mutex::new(None),
        }
    }

    /// Bound every token endpoint call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Refresh tokens that expire within `margin`.
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = TimeDelta::from_std(margin).unwrap_or(TimeDelta::zero());
        self
    }

    /// Start with a token already installed.
    #[must_use]
    pub fn with_token(self, token: Token) -> Self {
        Self {
            state: RwLock::new(TokenState {
                token: Some(token),
                ..TokenState::default()
            }),
            ..self
        }
    }

    /// Returns `true` if a token is held, fresh or not.
    pub async fn is_authorized(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    /// Return a token valid for at least the refresh margin, refreshing it
    /// first if needed. Concurrent callers share a single refresh.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No token was ever obtained, or it has no refresh credential
    /// - The refresh is rejected, fails, or times out
    pub async fn get_valid_token(&self) -> Result<String> {
        let observed = {
            let state = self.state.read().await;
            match &state.token {
                None => return Err(AuthError::NotAuthorized),
                Some(token) if token.is_fresh(self.clock.now(), self.refresh_margin) => {
                    return Ok(token.access_token().to_string());
                }
                Some(_) => state.generation,
            }
        };
        self.refresh_after(observed).await
    }

    /// Replace a token the platform rejected.
    ///
    /// If the held token already differs from `rejected` and is fresh, it is
    /// returned without a new request. Otherwise the token is refreshed
    /// regardless of its expiry, with the same single-flight guarantee as
    /// [`get_valid_token`](Self::get_valid_token).
    ///
    /// # Errors
    ///
    /// Same as [`get_valid_token`](Self::get_valid_token).
    pub async fn force_refresh(&self, rejected: &str) -> Result<String> {
        let observed = {
            let state = self.state.read().await;
            match &state.token {
                None => return Err(AuthError::NotAuthorized),
                Some(token)
                    if token.access_token() != rejected
                        && token.is_fresh(self.clock.now(), self.refresh_margin) =>
                {
                    return Ok(token.access_token().to_string());
                }
                Some(_) => state.generation,
            }
        };
        self.refresh_after(observed).await
    }

    /// Start an authorization-code flow.
    ///
    /// Returns the URL the operator must visit. A fresh CSRF state is
    /// remembered; starting again replaces it.
    pub async fn begin_authorization(&self) -> String {
        let state = Uuid::new_v4().simple().to_string();
        let url = self.provider.authorization_url(&state);
        *self.pending_state.lock().await = Some(state);
        info!("Authorization started");
        url
    }

    /// Finish an authorization-code flow with the callback parameters.
    ///
    /// The pending state is consumed on match, so a code is accepted at most
    /// once per [`begin_authorization`](Self::begin_authorization).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No authorization is pending or `state` does not match
    /// - The code exchange fails or times out
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<()> {
        {
            let mut pending = self.pending_state.lock().await;
            match pending.as_deref() {
                Some(expected) if constant_time_eq(expected.as_bytes(), state.as_bytes()) => {
                    *pending = None;
                }
                _ => {
                    warn!("Authorization callback with unexpected state");
                    return Err(AuthError::StateMismatch);
                }
            }
        }

        let _guard = self.refresh_lock.lock().await;
        let response = self.bounded(self.provider.exchange_code(code)).await?;

        let token = Token::from_response(response, None, self.clock.now());
        info!(
            expires_at = ?token.expires_at(),
            has_refresh = token.refresh_token().is_some(),
            "Authorization complete"
        );

        let mut state = self.state.write().await;
        state.generation += 1;
        state.outcome = Some(Ok(token.access_token().to_string()));
        state.token = Some(token);
        Ok(())
    }

    async fn refresh_after(&self, observed: u64) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let refresh_token = {
            let state = self.state.read().await;
            if state.generation != observed {
                debug!(generation = state.generation, "Token refreshed by a concurrent caller");
                return state.outcome.clone().unwrap_or(Err(AuthError::NotAuthorized));
            }
            match state.token.as_ref().and_then(Token::refresh_token) {
                Some(refresh_token) => refresh_token.to_string(),
                None => {
                    warn!("Access token expired and no refresh credential is held");
                    return Err(AuthError::NotAuthorized);
                }
            }
        };

        debug!("Refreshing access token");
        let result = self.bounded(self.provider.refresh_token(&refresh_token)).await;

        let mut state = self.state.write().await;
        state.generation += 1;
        let outcome = match result {
            Ok(response) => {
                let token = Token::from_response(response, Some(refresh_token), self.clock.now());
                info!(expires_at = ?token.expires_at(), "Access token refreshed");
                let access = token.access_token().to_string();
                state.token = Some(token);
                metrics::counter!("token_refreshes_total", "outcome" => "success").increment(1);
                Ok(access)
            }
            Err(error) => {
                warn!(%error, "Access token refresh failed");
                if matches!(error, AuthError::RefreshRejected(_)) {
                    state.token = None;
                }
                metrics::counter!("token_refreshes_total", "outcome" => "failure").increment(1);
                Err(error)
            }
        };
        state.outcome = Some(outcome.clone());
        outcome
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(AuthError::Timeout))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::MockOAuth2Provider;
    use chrono::{DateTime, Utc};
    use entrant_gateway_testing::ManualClock;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn expiring(access: &str, secs: i64) -> Token {
        Token::new(access.into(), Some("refresh-0".into()), Some(at(secs)))
    }

    #[tokio::test]
    async fn test_empty_store_is_not_authorized() {
        let store = TokenStore::new(MockOAuth2Provider::new(), ManualClock::at(at(0)));

        assert_eq!(store.get_valid_token().await, Err(AuthError::NotAuthorized));
        assert!(!store.is_authorized().await);
    }

    #[tokio::test]
    async fn test_fresh_token_needs_no_refresh() {
        let provider = MockOAuth2Provider::new();
        let store = TokenStore::new(provider.clone(), ManualClock::at(at(0)))
            .with_token(expiring("access-0", 3_600));

        assert_eq!(store.get_valid_token().await.unwrap(), "access-0");
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        let provider = MockOAuth2Provider::new();
        let clock = ManualClock::at(at(0));
        let store = TokenStore::new(provider.clone(), clock.clone())
            .with_token(expiring("access-0", 3_600));

        clock.advance(chrono::Duration::seconds(3_550));
        let token = store.get_valid_token().await.unwrap();

        assert_eq!(token, "access-1");
        assert_eq!(provider.refresh_calls(), 1);
        assert_eq!(provider.last_refresh_token().as_deref(), Some("refresh-0"));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let provider = MockOAuth2Provider::new().with_delay(Duration::from_millis(50));
        let store = Arc::new(
            TokenStore::new(provider.clone(), ManualClock::at(at(10_000)))
                .with_token(expiring("access-0", 0)),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_valid_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "access-1");
        }
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_waiters_receive_refresh_failure() {
        let provider = MockOAuth2Provider::new()
            .with_delay(Duration::from_millis(50))
            .failing_refresh(AuthError::TokenEndpoint("503".into()));
        let store = Arc::new(
            TokenStore::new(provider.clone(), ManualClock::at(at(10_000)))
                .with_token(expiring("access-0", 0)),
        );

        let first = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_valid_token().await }
        });
        let second = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_valid_token().await }
        });

        let expected = Err(AuthError::TokenEndpoint("503".into()));
        assert_eq!(first.await.unwrap(), expected);
        assert_eq!(second.await.unwrap(), expected);
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_drops_token() {
        let provider = MockOAuth2Provider::new()
            .failing_refresh(AuthError::RefreshRejected("invalid_grant".into()));
        let store = TokenStore::new(provider, ManualClock::at(at(10_000)))
            .with_token(expiring("access-0", 0));

        assert!(matches!(
            store.get_valid_token().await,
            Err(AuthError::RefreshRejected(_))
        ));
        assert_eq!(store.get_valid_token().await, Err(AuthError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_force_refresh_skips_when_token_already_replaced() {
        let provider = MockOAuth2Provider::new();
        let store = TokenStore::new(provider.clone(), ManualClock::at(at(0)))
            .with_token(expiring("access-0", 3_600));

        let replaced = store.force_refresh("access-0").await.unwrap();
        assert_eq!(replaced, "access-1");

        let again = store.force_refresh("access-0").await.unwrap();
        assert_eq!(again, "access-1");
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_is_bounded_by_timeout() {
        let provider = MockOAuth2Provider::new().with_delay(Duration::from_secs(120));
        let store = TokenStore::new(provider, ManualClock::at(at(10_000)))
            .with_token(expiring("access-0", 0))
            .with_timeout(Duration::from_secs(5));

        assert_eq!(store.get_valid_token().await, Err(AuthError::Timeout));
    }

    #[tokio::test]
    async fn test_authorization_code_flow() {
        let provider = MockOAuth2Provider::new();
        let store = TokenStore::new(provider.clone(), ManualClock::at(at(0)));

        let url = store.begin_authorization().await;
        let state = url.split("state=").nth(1).unwrap().to_string();

        assert_eq!(
            store.complete_authorization("code", "forged").await,
            Err(AuthError::StateMismatch)
        );
        store.complete_authorization("code", &state).await.unwrap();
        assert_eq!(store.get_valid_token().await.unwrap(), "access-code");

        // The state is consumed: replaying the callback fails.
        assert_eq!(
            store.complete_authorization("code", &state).await,
            Err(AuthError::StateMismatch)
        );
        assert_eq!(provider.exchange_calls(), 1);
    }

    #[tokio::test]
    async fn test_callback_without_pending_authorization() {
        let store = TokenStore::new(MockOAuth2Provider::new(), ManualClock::at(at(0)));

        assert_eq!(
            store.complete_authorization("code", "anything").await,
            Err(AuthError::StateMismatch)
        );
    }
}
