//! Error types for the gateway's collaborators.

use crate::ids::TicketTypeId;
use crate::roster::SlotAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from validating the ticket-type to car mapping table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The table has no entries.
    #[error("car mapping is empty")]
    Empty,

    /// An entry is not of the form `type:car:slot`.
    #[error("malformed car mapping entry {entry:?}, expected type:car:slot")]
    Malformed {
        /// The offending entry.
        entry: String,
    },

    /// A ticket type appears twice.
    #[error("ticket type {0} is mapped more than once")]
    DuplicateTicketType(TicketTypeId),

    /// Two ticket types share a slot.
    #[error("slot {slot} is assigned to both {first} and {second}")]
    DuplicateSlot {
        /// The shared slot.
        slot: SlotAddress,
        /// First ticket type mapped to it.
        first: TicketTypeId,
        /// Second ticket type mapped to it.
        second: TicketTypeId,
    },
}

/// Errors from fetching tickets.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    /// The platform rejected the bearer token.
    #[error("ticketing platform rejected the access token")]
    Unauthorized,

    /// Transport failure or non-success response.
    #[error("ticketing platform request failed: {0}")]
    Remote(String),

    /// The request did not complete in time.
    #[error("ticketing platform request timed out")]
    Timeout,

    /// The response could not be decoded.
    #[error("ticketing platform returned a malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Returns `true` if a fresh token might make the request succeed.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Errors from loading or committing the roster.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RosterError {
    /// Filesystem or storage failure.
    #[error("roster storage failure: {0}")]
    Io(String),

    /// The stored roster could not be interpreted.
    #[error("roster is malformed: {0}")]
    Malformed(String),

    /// The roster changed between load and commit.
    #[error("roster was modified by another writer")]
    ConcurrentModification,

    /// A roster entry targets a slot that does not exist in storage.
    #[error("slot {0} does not exist in the stored roster")]
    UnknownSlot(SlotAddress),
}

impl RosterError {
    /// Returns `true` if reloading and recomputing may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}
