//! Router composition.

use crate::handlers::{authorize, callback, health_check, order_paid, render_metrics, run_sync};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use entrant_gateway_auth::OAuth2Provider;
use entrant_gateway_core::Clock;
use entrant_gateway_runtime::SyncRunner;
use tower_http::trace::TraceLayer;

/// Create the gateway router.
///
/// # Routes
///
/// - `GET /oauth2/authorize` - Redirect to the platform's authorize page
/// - `GET /oauth2/callback` - Complete authorization
/// - `POST /sync` - Run a pass and return its report
/// - `POST /webhooks/order-paid` - Enqueue a pass for a paid order
/// - `GET /health` - Liveness
/// - `GET /metrics` - Prometheus metrics
pub fn router<R, P, C>(state: AppState<R, P, C>) -> Router
where
    R: SyncRunner,
    P: OAuth2Provider + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/oauth2/authorize", get(authorize::<R, P, C>))
        .route("/oauth2/callback", get(callback::<R, P, C>))
        .route("/sync", post(run_sync::<R, P, C>))
        .route("/webhooks/order-paid", post(order_paid::<R, P, C>))
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics::<R, P, C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
