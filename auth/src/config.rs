//! OAuth2 client configuration.
//!
//! Values are supplied by the application at startup, never hardcoded.

use std::time::Duration;

/// OAuth2 client registration and token store tuning.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Client identifier issued by the platform.
    pub client_id: String,

    /// Client secret issued by the platform.
    pub client_secret: String,

    /// Authorization endpoint.
    pub auth_url: String,

    /// Token endpoint.
    pub token_url: String,

    /// Callback URL registered with the platform.
    pub redirect_url: String,

    /// Bound for every token endpoint call.
    ///
    /// Default: 30 seconds
    pub timeout: Duration,

    /// Tokens closer than this to expiry are refreshed before use.
    ///
    /// Default: 60 seconds
    pub refresh_margin: Duration,
}

impl OAuthConfig {
    /// Create a new OAuth2 configuration with default timeouts.
    #[must_use]
    pub const fn new(
        client_id: String,
        client_secret: String,
        auth_url: String,
        token_url: String,
        redirect_url: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            auth_url,
            token_url,
            redirect_url,
            timeout: Duration::from_secs(30),
            refresh_margin: Duration::from_secs(60),
        }
    }

    /// Set the token endpoint timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the refresh margin.
    #[must_use]
    pub const fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_url", &self.redirect_url)
            .field("timeout", &self.timeout)
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}
