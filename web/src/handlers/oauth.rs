//! OAuth2 authorization-code flow with the ticketing platform.
//!
//! The operator visits `/oauth2/authorize` once; the platform redirects back
//! to `/oauth2/callback`, which installs the token and starts the first sync.

use crate::WebResult;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use entrant_gateway_auth::OAuth2Provider;
use entrant_gateway_core::Clock;
use entrant_gateway_runtime::{SyncRunner, SyncTrigger};
use serde::Deserialize;
use tracing::{info, warn};

/// Callback query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code from the platform.
    pub code: Option<String>,

    /// State parameter (`CSRF` protection).
    pub state: Option<String>,

    /// Error reported by the platform instead of a code.
    pub error: Option<String>,

    /// Optional error description from the platform.
    pub error_description: Option<String>,
}

/// Start authorization.
///
/// # Endpoint
///
/// ```text
/// GET /oauth2/authorize
/// ```
///
/// # Response
///
/// HTTP 303 redirect to the platform's authorization page.
pub async fn authorize<R, P, C>(State(state): State<AppState<R, P, C>>) -> Redirect
where
    P: OAuth2Provider,
    C: Clock,
{
    Redirect::to(&state.tokens.begin_authorization().await)
}

/// Complete authorization with the code the platform sent back.
///
/// # Endpoint
///
/// ```text
/// GET /oauth2/callback?code=...&state=...
/// ```
///
/// # Errors
///
/// - 400 if the platform reported an error or a parameter is missing
/// - 401 if `state` does not match the pending authorization
/// - 502 if the code exchange fails
pub async fn callback<R, P, C>(
    State(state): State<AppState<R, P, C>>,
    Query(query): Query<CallbackQuery>,
) -> WebResult<(StatusCode, &'static str)>
where
    R: SyncRunner,
    P: OAuth2Provider,
    C: Clock,
{
    if let Some(error) = query.error {
        warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Platform refused authorization"
        );
        return Err(AppError::bad_request(format!("authorization refused: {error}")));
    }
    let (Some(code), Some(csrf_state)) = (query.code, query.state) else {
        return Err(AppError::bad_request("missing code or state"));
    };

    state.tokens.complete_authorization(&code, &csrf_state).await?;

    if let Err(e) = state.triggers.trigger(SyncTrigger::Authorized) {
        warn!(error = %e, "Could not trigger sync after authorization");
    }
    info!("Gateway authorized with the ticketing platform");
    Ok((StatusCode::OK, "authorized"))
}
