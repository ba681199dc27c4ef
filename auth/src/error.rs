//! Error types for the token store and OAuth2 flows.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures obtaining or refreshing an access token.
///
/// Every variant is fatal for the sync pass that hit it and never for the
/// process.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Token Lifecycle
    // ═══════════════════════════════════════════════════════════

    /// No token has been obtained yet, or it can no longer be refreshed.
    #[error("not authorized with the ticketing platform")]
    NotAuthorized,

    /// The token endpoint refused the refresh credential.
    #[error("refresh credential rejected: {0}")]
    RefreshRejected(String),

    /// The token endpoint could not be reached or answered garbage.
    #[error("token endpoint request failed: {0}")]
    TokenEndpoint(String),

    /// A token endpoint call did not complete in time.
    #[error("token endpoint request timed out")]
    Timeout,

    /// The ticketing platform refused a freshly refreshed access token.
    #[error("ticketing platform rejected the refreshed access token")]
    TokenRejected,

    // ═══════════════════════════════════════════════════════════
    // Authorization Code Flow
    // ═══════════════════════════════════════════════════════════

    /// The callback state does not match a pending authorization.
    #[error("authorization state mismatch")]
    StateMismatch,

    /// The authorization code could not be exchanged.
    #[error("authorization code exchange failed: {0}")]
    CodeExchangeFailed(String),

    // ═══════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════

    /// The OAuth2 client configuration is unusable.
    #[error("invalid OAuth2 configuration: {0}")]
    InvalidConfiguration(String),
}

impl AuthError {
    /// Returns `true` if the operator must authorize again before syncing
    /// can resume.
    ///
    /// # Examples
    ///
    /// ```
    /// # use entrant_gateway_auth::AuthError;
    /// assert!(AuthError::NotAuthorized.requires_authorization());
    /// assert!(!AuthError::Timeout.requires_authorization());
    /// ```
    #[must_use]
    pub const fn requires_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized | Self::RefreshRejected(_) | Self::TokenRejected
        )
    }
}
