//! Mock OAuth2 provider for testing.

use crate::error::{AuthError, Result};
use crate::providers::OAuth2Provider;
use crate::token::OAuthTokenResponse;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock `OAuth2` provider.
///
/// Issues numbered tokens (`access-1`, `refresh-1`, ...) and counts calls.
/// Clones share counters, so a test can keep a handle after moving the
/// provider into a token store.
#[derive(Debug, Clone)]
pub struct MockOAuth2Provider {
    delay: Duration,
    expires_in: Option<Duration>,
    refresh_error: Option<AuthError>,
    exchange_error: Option<AuthError>,
    refresh_calls: Arc<AtomicUsize>,
    exchange_calls: Arc<AtomicUsize>,
    last_refresh_token: Arc<Mutex<Option<String>>>,
}

impl MockOAuth2Provider {
    /// Create a mock that succeeds immediately with one-hour tokens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            expires_in: Some(Duration::from_secs(3600)),
            refresh_error: None,
            exchange_error: None,
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            exchange_calls: Arc::new(AtomicUsize::new(0)),
            last_refresh_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Delay every token endpoint call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Lifetime of issued tokens; `None` issues tokens without expiry.
    #[must_use]
    pub const fn with_expires_in(mut self, expires_in: Option<Duration>) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Fail every refresh with `error`.
    #[must_use]
    pub fn failing_refresh(mut self, error: AuthError) -> Self {
        self.refresh_error = Some(error);
        self
    }

    /// Fail every code exchange with `error`.
    #[must_use]
    pub fn failing_exchange(mut self, error: AuthError) -> Self {
        self.exchange_error = Some(error);
        self
    }

    /// Number of refresh requests received.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of code exchanges received.
    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Refresh credential presented by the latest refresh request.
    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for MockOAuth2Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuth2Provider for MockOAuth2Provider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://mock.example/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(error) = &self.exchange_error {
            return Err(error.clone());
        }

        Ok(OAuthTokenResponse {
            access_token: format!("access-{code}"),
            refresh_token: Some("refresh-0".to_string()),
            expires_in: self.expires_in,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokenResponse> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut last) = self.last_refresh_token.lock() {
            *last = Some(refresh_token.to_string());
        }
        self.pause().await;

        if let Some(error) = &self.refresh_error {
            return Err(error.clone());
        }

        Ok(OAuthTokenResponse {
            access_token: format!("access-{n}"),
            refresh_token: Some(format!("refresh-{n}")),
            expires_in: self.expires_in,
        })
    }
}
