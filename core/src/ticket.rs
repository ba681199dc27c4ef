//! Canonical ticket records.
//!
//! The ticketing platform returns metadata as a list of `(field id, value)`
//! pairs whose shape depends on how the event's checkout form was built.
//! The fetcher normalizes that into a [`Ticket`]: trimmed, non-empty values
//! keyed by the platform's metadata field id. Field lookups go through
//! [`MetadataFieldIds`] and produce a tagged [`MetadataValue`] instead of
//! assuming a field exists.

use crate::ids::{OrderId, TicketId, TicketTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The buyer metadata fields the gateway reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    /// Driver first name.
    FirstName,
    /// Driver last name.
    LastName,
    /// Team name.
    TeamName,
    /// Simulator identity (Steam id).
    SimulatorId,
}

impl MetadataField {
    /// All fields, in display order.
    pub const ALL: [Self; 4] = [
        Self::FirstName,
        Self::LastName,
        Self::TeamName,
        Self::SimulatorId,
    ];
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::TeamName => "team_name",
            Self::SimulatorId => "simulator_id",
        })
    }
}

/// Platform metadata field identifiers, configured per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFieldIds {
    /// Field id carrying the first name.
    pub first_name: String,
    /// Field id carrying the last name.
    pub last_name: String,
    /// Field id carrying the team name.
    pub team_name: String,
    /// Field id carrying the simulator identity.
    pub simulator_id: String,
}

impl MetadataFieldIds {
    /// Create a new field id table.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        team_name: impl Into<String>,
        simulator_id: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            team_name: team_name.into(),
            simulator_id: simulator_id.into(),
        }
    }

    /// Platform field id for a metadata field.
    #[must_use]
    pub fn id_of(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::FirstName => &self.first_name,
            MetadataField::LastName => &self.last_name,
            MetadataField::TeamName => &self.team_name,
            MetadataField::SimulatorId => &self.simulator_id,
        }
    }

    /// Which metadata field, if any, a platform field id refers to.
    #[must_use]
    pub fn field_for(&self, id: &str) -> Option<MetadataField> {
        MetadataField::ALL
            .into_iter()
            .find(|field| self.id_of(*field) == id)
    }
}

/// Result of looking up a metadata field on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataValue<'a> {
    /// The field is present with a non-empty value.
    Present(&'a str),
    /// The field is absent or blank.
    Missing,
}

impl<'a> MetadataValue<'a> {
    /// Convert into an `Option`.
    #[must_use]
    pub const fn present(self) -> Option<&'a str> {
        match self {
            Self::Present(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Returns `true` if the field is missing.
    #[must_use]
    pub const fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Whether the ticket still entitles its holder to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Paid and not invalidated.
    #[default]
    Valid,
    /// Refunded, cancelled or invalidated. Treated like a ticket that
    /// disappeared from the platform.
    Cancelled,
}

/// Flag raised on a ticket that lacks one or more configured metadata fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteTicket {
    /// Fields that are absent or blank.
    pub missing: Vec<MetadataField>,
}

/// A ticket as fetched for one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier, the join key to roster entries.
    pub ticket_id: TicketId,
    /// Ticket-type identifier.
    pub ticket_type_id: TicketTypeId,
    /// Order the ticket was bought in.
    pub order_id: OrderId,
    /// Validity of the ticket.
    pub status: TicketStatus,
    /// Metadata values keyed by platform field id. Values are trimmed and
    /// never empty.
    pub metadata: BTreeMap<String, String>,
}

impl Ticket {
    /// Start building a valid ticket.
    #[must_use]
    pub fn builder(ticket_id: impl Into<TicketId>, ticket_type_id: impl Into<TicketTypeId>) -> TicketBuilder {
        TicketBuilder::new(ticket_id.into(), ticket_type_id.into())
    }

    /// Look up a metadata field.
    #[must_use]
    pub fn field(&self, ids: &MetadataFieldIds, field: MetadataField) -> MetadataValue<'_> {
        match self.metadata.get(ids.id_of(field)) {
            Some(value) if !value.trim().is_empty() => MetadataValue::Present(value.trim()),
            _ => MetadataValue::Missing,
        }
    }

    /// The incomplete-ticket flag, if any configured field is missing.
    #[must_use]
    pub fn incomplete(&self, ids: &MetadataFieldIds) -> Option<IncompleteTicket> {
        let missing: Vec<_> = MetadataField::ALL
            .into_iter()
            .filter(|field| self.field(ids, *field).is_missing())
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(IncompleteTicket { missing })
        }
    }

    /// Returns `true` if the ticket still entitles its holder to a slot.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.status, TicketStatus::Valid)
    }
}

/// Builder for [`Ticket`].
#[derive(Debug, Clone)]
pub struct TicketBuilder {
    ticket: Ticket,
}

impl TicketBuilder {
    fn new(ticket_id: TicketId, ticket_type_id: TicketTypeId) -> Self {
        let order_id = OrderId::new(format!("order-{ticket_id}"));
        Self {
            ticket: Ticket {
                ticket_id,
                ticket_type_id,
                order_id,
                status: TicketStatus::Valid,
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Set the order id.
    #[must_use]
    pub fn order(mut self, order_id: impl Into<OrderId>) -> Self {
        self.ticket.order_id = order_id.into();
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: TicketStatus) -> Self {
        self.ticket.status = status;
        self
    }

    /// Add a metadata value. Blank values are dropped, others trimmed.
    #[must_use]
    pub fn metadata(mut self, field_id: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.ticket.metadata.insert(field_id.into(), value.to_string());
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Ticket {
        self.ticket
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn ids() -> MetadataFieldIds {
        MetadataFieldIds::new("md-first", "md-last", "md-team", "md-steam")
    }

    #[test]
    fn test_field_lookup_is_tagged() {
        let ticket = Ticket::builder("T1", "GT3")
            .metadata("md-first", "  Ann ")
            .metadata("md-team", "   ")
            .build();

        assert_eq!(ticket.field(&ids(), MetadataField::FirstName), MetadataValue::Present("Ann"));
        assert_eq!(ticket.field(&ids(), MetadataField::TeamName), MetadataValue::Missing);
        assert_eq!(ticket.field(&ids(), MetadataField::SimulatorId), MetadataValue::Missing);
    }

    #[test]
    fn test_incomplete_flag_lists_missing_fields() {
        let ticket = Ticket::builder("T1", "GT3")
            .metadata("md-first", "Ann")
            .metadata("md-steam", "S123")
            .build();

        let flag = ticket.incomplete(&ids()).unwrap();
        assert_eq!(flag.missing, vec![MetadataField::LastName, MetadataField::TeamName]);
    }

    #[test]
    fn test_complete_ticket_has_no_flag() {
        let ticket = Ticket::builder("T1", "GT3")
            .metadata("md-first", "Ann")
            .metadata("md-last", "Lee")
            .metadata("md-team", "Lee Racing")
            .metadata("md-steam", "S123")
            .build();

        assert!(ticket.incomplete(&ids()).is_none());
        assert!(ticket.is_live());
    }

    #[test]
    fn test_field_for_reverse_lookup() {
        assert_eq!(ids().field_for("md-steam"), Some(MetadataField::SimulatorId));
        assert_eq!(ids().field_for("other"), None);
    }
}
