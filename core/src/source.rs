//! Collaborator traits.
//!
//! The orchestrator is generic over where tickets come from and where the
//! roster lives. Production implementations talk HTTP and the filesystem;
//! tests plug in scripted and in-memory versions.

use crate::error::{FetchError, RosterError};
use crate::ids::EventId;
use crate::roster::Roster;
use crate::ticket::Ticket;
use std::future::Future;

/// Reads the tickets of an event from the ticketing platform.
pub trait TicketSource: Send + Sync {
    /// Fetch every ticket of the event, following pagination to the end.
    ///
    /// A pass must see the complete ticket set, so implementations return
    /// an error rather than a partial list.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The platform rejects the access token
    /// - The request fails or times out
    /// - A response cannot be decoded
    fn fetch_tickets(
        &self,
        event_id: &EventId,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<Ticket>, FetchError>> + Send;
}

/// Opaque version marker of a stored roster, used to detect writes made by
/// someone else between load and commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RosterRevision(pub u128);

/// A roster together with the revision it was loaded at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    /// The loaded roster.
    pub roster: Roster,
    /// Revision at load time.
    pub revision: RosterRevision,
}

/// Persistent roster storage.
pub trait RosterStore: Send + Sync {
    /// Load the current roster.
    ///
    /// # Errors
    ///
    /// Returns error if the roster cannot be read or interpreted.
    fn load(&self) -> impl Future<Output = Result<RosterSnapshot, RosterError>> + Send;

    /// Atomically replace the stored roster.
    ///
    /// Either the whole roster is persisted or nothing is. The commit is
    /// refused if the stored revision no longer matches `base`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The roster changed since `base` was loaded
    /// - The roster references a slot storage does not know
    /// - Writing fails
    fn commit(
        &self,
        base: RosterRevision,
        roster: &Roster,
    ) -> impl Future<Output = Result<RosterRevision, RosterError>> + Send;
}
