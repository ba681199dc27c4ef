//! # Entrant Gateway Core
//!
//! Domain types and pure logic for reconciling ticket purchases with a
//! championship entrant roster.
//!
//! ## Core Concepts
//!
//! - **Ticket**: a purchased unit carrying buyer metadata and a ticket type
//! - **Car mapping**: static table from ticket type to a car and slot
//! - **Entrant**: a ticket projected onto its car and slot
//! - **Roster**: the persisted championship entrant collection
//! - **Reconciliation**: three-way diff of the projected entrants against the
//!   roster, keyed by source ticket id
//!
//! ## Data Flow
//!
//! ```text
//! TicketSource ──▶ Vec<Ticket> ──▶ EntrantProjector (+ CarMapping)
//!                                        │
//!                                        ▼
//!              RosterStore::load ──▶ reconcile() ──▶ RosterStore::commit
//! ```
//!
//! Nothing in this crate performs I/O. The traits in [`source`] are the seams
//! where the ticketing platform and the championship manager plug in.
//!
//! ## Example
//!
//! ```
//! use entrant_gateway_core::{
//!     CarMapping, EntrantProjector, MetadataFieldIds, Roster, SlotAddress, Ticket,
//!     reconcile,
//! };
//! use std::collections::BTreeSet;
//!
//! let ids = MetadataFieldIds::new("first", "last", "team", "steam");
//! let mapping: CarMapping = "GT3:porsche_992_gt3:1".parse().unwrap();
//! let ticket = Ticket::builder("T1", "GT3")
//!     .metadata("first", "Ann")
//!     .metadata("last", "Lee")
//!     .metadata("steam", "S123")
//!     .build();
//!
//! let projection = EntrantProjector::new(ids).project_all(&[ticket], &mapping);
//! let roster = Roster::with_slots([SlotAddress::new("porsche_992_gt3", "1")]);
//! let result = reconcile(&roster, &projection.entrants, &BTreeSet::new());
//!
//! assert_eq!(result.diff.added.len(), 1);
//! ```

pub mod environment;
pub mod error;
pub mod exclusion;
pub mod ids;
pub mod mapping;
pub mod projector;
pub mod reconcile;
pub mod roster;
pub mod source;
pub mod ticket;

// Re-export main types for convenience
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use error::{FetchError, MappingError, RosterError};
pub use exclusion::{Exclusion, ExclusionReason, RejectReason};
pub use ids::{CarId, EventId, OrderId, SimulatorId, SlotId, TicketId, TicketTypeId};
pub use mapping::CarMapping;
pub use projector::{Entrant, EntrantProjector, Projection};
pub use reconcile::{Reconciliation, RosterDiff, reconcile};
pub use roster::{Roster, RosterEntry, SlotAddress};
pub use source::{RosterRevision, RosterSnapshot, RosterStore, TicketSource};
pub use ticket::{
    IncompleteTicket, MetadataField, MetadataFieldIds, MetadataValue, Ticket, TicketBuilder,
    TicketStatus,
};
