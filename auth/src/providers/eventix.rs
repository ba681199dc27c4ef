//! Eventix OAuth2 provider implementation.

use crate::config::OAuthConfig;
use crate::error::{AuthError, Result};
use crate::providers::OAuth2Provider;
use crate::token::OAuthTokenResponse;
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    RequestTokenError, TokenResponse, TokenUrl,
};

/// Eventix OAuth2 provider.
///
/// Implements the authorization-code and refresh grants with the `oauth2`
/// crate's basic client.
///
/// # Example
///
/// ```no_run
/// use entrant_gateway_auth::{OAuthConfig, providers::EventixOAuthProvider};
///
/// let config = OAuthConfig::new(
///     "client-id".to_string(),
///     "client-secret".to_string(),
///     "https://auth.openticket.tech/tokens/authorize".to_string(),
///     "https://auth.openticket.tech/tokens".to_string(),
///     "https://gateway.example.com/oauth2/callback".to_string(),
/// );
/// let provider = EventixOAuthProvider::new(&config).unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct EventixOAuthProvider {
    client: BasicClient,
}

impl EventixOAuthProvider {
    /// Create a provider from client configuration.
    ///
    /// # Errors
    ///
    /// Returns error if one of the configured URLs does not parse.
    pub fn new(config: &OAuthConfig) -> Result<Self> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| AuthError::InvalidConfiguration(format!("authorize URL: {e}")))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| AuthError::InvalidConfiguration(format!("token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| AuthError::InvalidConfiguration(format!("redirect URL: {e}")))?;

        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        Ok(Self { client })
    }
}

impl OAuth2Provider for EventixOAuthProvider {
    fn authorization_url(&self, state: &str) -> String {
        let state = state.to_string();
        let (url, _) = self.client.authorize_url(move || CsrfToken::new(state)).url();
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokenResponse> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Authorization code exchange failed");
                AuthError::CodeExchangeFailed(e.to_string())
            })?;

        Ok(convert(&response))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokenResponse> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(refresh_error)?;

        Ok(convert(&response))
    }
}

/// Only a refused credential drops the token; any other error response is
/// treated like an unreachable endpoint and retried on the next pass.
fn refresh_error<RE>(error: RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    match error {
        RequestTokenError::ServerResponse(response) => match response.error() {
            BasicErrorResponseType::InvalidGrant
            | BasicErrorResponseType::InvalidClient
            | BasicErrorResponseType::UnauthorizedClient => {
                AuthError::RefreshRejected(response.error().to_string())
            }
            other => AuthError::TokenEndpoint(other.to_string()),
        },
        other => AuthError::TokenEndpoint(other.to_string()),
    }
}

fn convert(response: &BasicTokenResponse) -> OAuthTokenResponse {
    OAuthTokenResponse {
        access_token: response.access_token().secret().clone(),
        refresh_token: response.refresh_token().map(|token| token.secret().clone()),
        expires_in: response.expires_in(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig::new(
            "client".into(),
            "secret".into(),
            "https://auth.example.com/authorize".into(),
            "https://auth.example.com/token".into(),
            "https://gateway.example.com/oauth2/callback".into(),
        )
    }

    #[test]
    fn test_authorization_url_carries_state_and_client() {
        let provider = EventixOAuthProvider::new(&config()).unwrap();
        let url = provider.authorization_url("csrf-123");

        assert!(url.starts_with("https://auth.example.com/authorize?"));
        assert!(url.contains("state=csrf-123"));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_only_refused_credentials_are_rejections() {
        let server_error = |kind: BasicErrorResponseType| {
            refresh_error::<std::io::Error>(RequestTokenError::ServerResponse(BasicErrorResponse::new(
                kind, None, None,
            )))
        };

        assert_eq!(
            server_error(BasicErrorResponseType::InvalidGrant),
            AuthError::RefreshRejected("invalid_grant".into())
        );
        assert!(matches!(
            server_error(BasicErrorResponseType::UnauthorizedClient),
            AuthError::RefreshRejected(_)
        ));
        assert_eq!(
            server_error(BasicErrorResponseType::Extension("temporarily_unavailable".into())),
            AuthError::TokenEndpoint("temporarily_unavailable".into())
        );
        assert!(matches!(
            server_error(BasicErrorResponseType::InvalidRequest),
            AuthError::TokenEndpoint(_)
        ));
    }

    #[test]
    fn test_rejects_invalid_urls() {
        let mut config = config();
        config.token_url = "not a url".into();

        assert!(matches!(
            EventixOAuthProvider::new(&config),
            Err(AuthError::InvalidConfiguration(_))
        ));
    }
}
