//! What a sync pass did.

use chrono::{DateTime, Utc};
use entrant_gateway_auth::AuthError;
use entrant_gateway_core::{EventId, Exclusion, FetchError, OrderId, RosterError, SlotAddress, TicketId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What asked for a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncTrigger {
    /// The periodic scheduler.
    Scheduled,
    /// An operator request.
    Manual,
    /// Authorization with the ticketing platform just completed.
    Authorized,
    /// The platform reported a paid order.
    OrderPaid {
        /// The paid order.
        order_id: OrderId,
    },
}

impl SyncTrigger {
    /// Short, stable label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
            Self::Authorized => "authorized",
            Self::OrderPaid { .. } => "order_paid",
        }
    }
}

/// Why a sync pass failed. Nothing was committed.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SyncError {
    /// No usable access token.
    #[error("authorization failed: {0}")]
    Auth(AuthError),

    /// The ticket fetch failed.
    #[error("ticket fetch failed: {0}")]
    Remote(FetchError),

    /// Another pass holds the reconciliation guard.
    #[error("a sync pass is already running")]
    SyncInProgress,

    /// Loading or committing the roster failed.
    #[error("roster update failed: {0}")]
    Roster(RosterError),

    /// The process is shutting down.
    #[error("sync pass cancelled by shutdown")]
    Cancelled,
}

impl SyncError {
    /// Short, stable label used for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth_error",
            Self::Remote(_) => "remote_error",
            Self::SyncInProgress => "in_progress",
            Self::Roster(_) => "roster_error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(error: AuthError) -> Self {
        Self::Auth(error)
    }
}

impl From<FetchError> for SyncError {
    fn from(error: FetchError) -> Self {
        Self::Remote(error)
    }
}

impl From<RosterError> for SyncError {
    fn from(error: RosterError) -> Self {
        Self::Roster(error)
    }
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The roster was updated.
    Committed,
    /// The roster already matched the tickets; nothing was written.
    Unchanged,
    /// The pass aborted without touching the roster.
    Failed(SyncError),
}

impl SyncOutcome {
    /// Short, stable label used for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Unchanged => "unchanged",
            Self::Failed(error) => error.label(),
        }
    }
}

/// Report of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Event that was synced.
    pub event_id: EventId,
    /// What started the pass.
    pub trigger: SyncTrigger,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    pub finished_at: DateTime<Utc>,
    /// How the pass ended.
    pub outcome: SyncOutcome,
    /// Tickets that gained an entry.
    pub added: Vec<TicketId>,
    /// Tickets whose entry changed or moved.
    pub updated: Vec<TicketId>,
    /// Tickets whose entry was removed.
    pub removed: Vec<TicketId>,
    /// Slots cleared because they duplicated another entry's ticket.
    pub repaired: Vec<SlotAddress>,
    /// Entries left as they were.
    pub unchanged: usize,
    /// Live tickets whose entries were kept in place this pass.
    pub held: Vec<TicketId>,
    /// Tickets excluded this pass, with reasons.
    pub excluded: Vec<Exclusion>,
}

impl SyncReport {
    /// An empty report for a pass that has not run yet.
    #[must_use]
    pub const fn started(event_id: EventId, trigger: SyncTrigger, started_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            trigger,
            started_at,
            finished_at: started_at,
            outcome: SyncOutcome::Unchanged,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            repaired: Vec::new(),
            unchanged: 0,
            held: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Returns `true` unless the pass failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self.outcome, SyncOutcome::Failed(_))
    }

    /// The failure, if the pass failed.
    #[must_use]
    pub const fn error(&self) -> Option<&SyncError> {
        match &self.outcome {
            SyncOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}
