//! OAuth2 provider trait.

use crate::error::Result;
use crate::token::OAuthTokenResponse;

/// OAuth2 provider.
///
/// Abstracts the authorization endpoint and the two token endpoint grants
/// the gateway uses. The token store adds timeouts and single-flight
/// serialization on top.
pub trait OAuth2Provider: Send + Sync {
    /// Build the authorization URL carrying `state` as CSRF token.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails
    /// - Provider rejects the code
    /// - Response is malformed
    fn exchange_code(
        &self,
        code: &str,
    ) -> impl std::future::Future<Output = Result<OAuthTokenResponse>> + Send;

    /// Obtain a new access token with a refresh credential.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails
    /// - Refresh credential is rejected
    /// - Response is malformed
    fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<OAuthTokenResponse>> + Send;
}
