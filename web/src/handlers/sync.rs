//! Manual sync trigger and order-paid webhook.

use crate::WebResult;
use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use entrant_gateway_core::OrderId;
use entrant_gateway_runtime::{SyncError, SyncOutcome, SyncReport, SyncRunner, SyncTrigger};
use serde::Deserialize;
use tracing::{debug, warn};

/// Event name the order-paid webhook must carry.
pub const ORDER_PAID_EVENT: &str = "order-paid";

/// Run one pass and return its report.
///
/// # Endpoint
///
/// ```text
/// POST /sync
/// ```
///
/// # Status Codes
///
/// - 200 OK: committed or unchanged
/// - 409 Conflict: another pass is running
/// - 502 Bad Gateway: the ticket fetch failed
/// - 503 Service Unavailable: authorization, roster or shutdown failure
///
/// The body is always the [`SyncReport`].
pub async fn run_sync<R, P, C>(State(state): State<AppState<R, P, C>>) -> (StatusCode, Json<SyncReport>)
where
    R: SyncRunner,
{
    let report = state.runner.run_sync(SyncTrigger::Manual).await;
    (status_for(&report.outcome), Json(report))
}

const fn status_for(outcome: &SyncOutcome) -> StatusCode {
    match outcome {
        SyncOutcome::Committed | SyncOutcome::Unchanged => StatusCode::OK,
        SyncOutcome::Failed(SyncError::SyncInProgress) => StatusCode::CONFLICT,
        SyncOutcome::Failed(SyncError::Remote(_)) => StatusCode::BAD_GATEWAY,
        SyncOutcome::Failed(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Webhook payload sent by the ticketing platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Event name, `order-paid` for this endpoint.
    pub event: String,
    /// The order.
    pub guid: String,
    /// Event key on the platform.
    #[serde(default)]
    pub event_key: String,
    /// When the event happened, as sent.
    #[serde(default)]
    pub date_time: String,
}

/// Enqueue a pass for a paid order.
///
/// # Endpoint
///
/// ```text
/// POST /webhooks/order-paid
/// ```
///
/// # Errors
///
/// - 400 if the payload is not an `order-paid` event
/// - 503 if the trigger queue is full or stopped
pub async fn order_paid<R, P, C>(
    State(state): State<AppState<R, P, C>>,
    Json(payload): Json<WebhookPayload>,
) -> WebResult<StatusCode> {
    debug!(
        order_id = %payload.guid,
        event = %payload.event,
        event_key = %payload.event_key,
        date_time = %payload.date_time,
        "Webhook received"
    );
    if payload.event != ORDER_PAID_EVENT {
        warn!(event = %payload.event, "Unexpected webhook event");
        return Err(AppError::bad_request(format!(
            "expected event {ORDER_PAID_EVENT}, got {}",
            payload.event
        )));
    }

    state.triggers.trigger(SyncTrigger::OrderPaid {
        order_id: OrderId::new(payload.guid),
    })?;
    Ok(StatusCode::ACCEPTED)
}
