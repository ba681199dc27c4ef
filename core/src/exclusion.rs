//! Per-ticket exclusions.
//!
//! A ticket that cannot become an entrant this pass is excluded with a
//! reason. Exclusions never abort a sync pass; they are collected and
//! returned in the sync report.

use crate::ids::{TicketId, TicketTypeId};
use crate::roster::SlotAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the projector refused a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The ticket carries no simulator identity.
    #[error("missing simulator id")]
    MissingSimulatorId,

    /// Neither first nor last name is present.
    #[error("missing driver name")]
    MissingName,
}

/// Reason a ticket was excluded from a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The ticket type has no car mapping.
    #[error("ticket type {ticket_type_id} is not mapped to a car")]
    NotMapped {
        /// The unmapped ticket type.
        ticket_type_id: TicketTypeId,
    },

    /// The projector refused the ticket.
    #[error("rejected: {reason}")]
    Rejected {
        /// Projector rejection reason.
        reason: RejectReason,
    },

    /// Several live tickets map to the same slot.
    #[error("slot {slot} is claimed by {} tickets", .tickets.len())]
    SlotConflict {
        /// The contested slot.
        slot: SlotAddress,
        /// Every ticket claiming the slot.
        tickets: Vec<TicketId>,
    },

    /// The slot holds an entry this ticket does not own.
    #[error("slot {slot} is occupied by another entrant")]
    SlotOccupied {
        /// The occupied slot.
        slot: SlotAddress,
    },

    /// The championship has no such slot.
    #[error("slot {slot} does not exist in the championship")]
    UnknownSlot {
        /// The missing slot.
        slot: SlotAddress,
    },
}

impl ExclusionReason {
    /// Short, stable label used for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotMapped { .. } => "not_mapped",
            Self::Rejected { .. } => "rejected",
            Self::SlotConflict { .. } => "slot_conflict",
            Self::SlotOccupied { .. } => "slot_occupied",
            Self::UnknownSlot { .. } => "unknown_slot",
        }
    }
}

/// A ticket excluded from a pass, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// The excluded ticket.
    pub ticket_id: TicketId,
    /// Why it was excluded.
    pub reason: ExclusionReason,
}

impl Exclusion {
    /// Create a new exclusion.
    #[must_use]
    pub const fn new(ticket_id: TicketId, reason: ExclusionReason) -> Self {
        Self { ticket_id, reason }
    }
}
