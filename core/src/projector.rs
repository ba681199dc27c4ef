//! Entrant projection.
//!
//! Turns fetched tickets into entrants placed on their configured car and
//! slot. Projection is pure and per-pass: it never looks at the roster.

use crate::exclusion::{Exclusion, ExclusionReason, RejectReason};
use crate::ids::{CarId, SimulatorId, SlotId, TicketId};
use crate::mapping::CarMapping;
use crate::roster::SlotAddress;
use crate::ticket::{MetadataField, MetadataFieldIds, Ticket};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A ticket projected onto its car and slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    /// Ticket this entrant was created from.
    pub source_ticket_id: TicketId,
    /// Driver first name, empty when only a last name was given.
    pub first_name: String,
    /// Driver last name, empty when only a first name was given.
    pub last_name: String,
    /// Team name, empty when none.
    pub team_name: String,
    /// Simulator identity.
    pub simulator_id: SimulatorId,
    /// Car the entrant drives.
    pub car_id: CarId,
    /// Slot within the car's class.
    pub slot_id: SlotId,
}

impl Entrant {
    /// Name as shown in the championship: first and last name separated by
    /// a space, a missing part omitted.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, _) => self.last_name.clone(),
        }
    }

    /// Slot address of this entrant.
    #[must_use]
    pub fn address(&self) -> SlotAddress {
        SlotAddress {
            car_id: self.car_id.clone(),
            slot_id: self.slot_id.clone(),
        }
    }
}

/// Outcome of projecting every ticket of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Entrants in ticket-id order.
    pub entrants: Vec<Entrant>,
    /// Live tickets that were excluded. Their existing roster entries must
    /// be left alone.
    pub held: BTreeSet<TicketId>,
    /// Per-ticket exclusions.
    pub excluded: Vec<Exclusion>,
    /// Number of cancelled tickets skipped.
    pub cancelled: usize,
}

/// Projects tickets into entrants using configured metadata field ids.
#[derive(Debug, Clone)]
pub struct EntrantProjector {
    field_ids: MetadataFieldIds,
}

impl EntrantProjector {
    /// Create a projector.
    #[must_use]
    pub const fn new(field_ids: MetadataFieldIds) -> Self {
        Self { field_ids }
    }

    /// Metadata field ids this projector reads.
    #[must_use]
    pub const fn field_ids(&self) -> &MetadataFieldIds {
        &self.field_ids
    }

    /// Project one ticket onto a slot.
    ///
    /// # Errors
    ///
    /// Returns error if the simulator id is missing, or if both name fields
    /// are missing.
    pub fn project(&self, ticket: &Ticket, address: &SlotAddress) -> Result<Entrant, RejectReason> {
        let value = |field| {
            ticket
                .field(&self.field_ids, field)
                .present()
                .map(str::to_string)
        };

        let simulator_id = value(MetadataField::SimulatorId).ok_or(RejectReason::MissingSimulatorId)?;
        let first_name = value(MetadataField::FirstName);
        let last_name = value(MetadataField::LastName);
        if first_name.is_none() && last_name.is_none() {
            return Err(RejectReason::MissingName);
        }

        Ok(Entrant {
            source_ticket_id: ticket.ticket_id.clone(),
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            team_name: value(MetadataField::TeamName).unwrap_or_default(),
            simulator_id: SimulatorId::new(simulator_id),
            car_id: address.car_id.clone(),
            slot_id: address.slot_id.clone(),
        })
    }

    /// Project every ticket of a pass.
    ///
    /// Cancelled tickets are skipped. Live tickets that are unmapped,
    /// rejected, or that compete for a slot with another live ticket are
    /// excluded and reported as held. Duplicate ticket ids keep the first
    /// occurrence.
    #[must_use]
    pub fn project_all(&self, tickets: &[Ticket], mapping: &CarMapping) -> Projection {
        let mut projection = Projection::default();
        let mut seen = BTreeSet::new();
        let mut by_slot: BTreeMap<SlotAddress, Vec<Entrant>> = BTreeMap::new();

        let mut ordered: Vec<&Ticket> = tickets.iter().collect();
        ordered.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));

        for ticket in ordered {
            if !seen.insert(&ticket.ticket_id) {
                continue;
            }
            if !ticket.is_live() {
                projection.cancelled += 1;
                continue;
            }

            let outcome = mapping.resolve(&ticket.ticket_type_id).and_then(|address| {
                self.project(ticket, address)
                    .map_err(|reason| ExclusionReason::Rejected { reason })
            });

            match outcome {
                Ok(entrant) => by_slot.entry(entrant.address()).or_default().push(entrant),
                Err(reason) => projection.exclude(ticket.ticket_id.clone(), reason),
            }
        }

        for (slot, mut claimants) in by_slot {
            if claimants.len() == 1 {
                projection.entrants.extend(claimants.pop());
                continue;
            }
            let tickets: Vec<TicketId> = claimants
                .iter()
                .map(|entrant| entrant.source_ticket_id.clone())
                .collect();
            for ticket_id in &tickets {
                projection.exclude(
                    ticket_id.clone(),
                    ExclusionReason::SlotConflict {
                        slot: slot.clone(),
                        tickets: tickets.clone(),
                    },
                );
            }
        }

        projection
            .entrants
            .sort_by(|a, b| a.source_ticket_id.cmp(&b.source_ticket_id));
        projection
            .excluded
            .sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));
        projection
    }
}

impl Projection {
    fn exclude(&mut self, ticket_id: TicketId, reason: ExclusionReason) {
        self.held.insert(ticket_id.clone());
        self.excluded.push(Exclusion::new(ticket_id, reason));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ticket::TicketStatus;

    fn ids() -> MetadataFieldIds {
        MetadataFieldIds::new("first", "last", "team", "steam")
    }

    fn mapping() -> CarMapping {
        "GT3:porsche_992_gt3:1,GT4:bmw_m4_gt4:1".parse().unwrap()
    }

    fn ticket(id: &str, ticket_type: &str, steam: &str) -> Ticket {
        Ticket::builder(id, ticket_type)
            .metadata("first", "Ann")
            .metadata("last", "Lee")
            .metadata("steam", steam)
            .build()
    }

    #[test]
    fn test_projects_example_ticket() {
        let projector = EntrantProjector::new(ids());
        let entrant = projector
            .project(&ticket("T1", "GT3", "S123"), &SlotAddress::new("porsche_992_gt3", "1"))
            .unwrap();

        assert_eq!(entrant.car_id.as_str(), "porsche_992_gt3");
        assert_eq!(entrant.slot_id.as_str(), "1");
        assert_eq!(entrant.simulator_id.as_str(), "S123");
        assert_eq!(entrant.display_name(), "Ann Lee");
        assert_eq!(entrant.team_name, "");
    }

    #[test]
    fn test_rejects_missing_simulator_id() {
        let projector = EntrantProjector::new(ids());
        let ticket = Ticket::builder("T1", "GT3").metadata("first", "Ann").build();

        assert_eq!(
            projector.project(&ticket, &SlotAddress::new("c", "1")),
            Err(RejectReason::MissingSimulatorId)
        );
    }

    #[test]
    fn test_rejects_missing_both_names() {
        let projector = EntrantProjector::new(ids());
        let ticket = Ticket::builder("T1", "GT3")
            .metadata("team", "Lee Racing")
            .metadata("steam", "S1")
            .build();

        assert_eq!(
            projector.project(&ticket, &SlotAddress::new("c", "1")),
            Err(RejectReason::MissingName)
        );
    }

    #[test]
    fn test_single_name_is_enough() {
        let projector = EntrantProjector::new(ids());
        let ticket = Ticket::builder("T1", "GT3")
            .metadata("last", "Lee")
            .metadata("steam", "S1")
            .build();

        let entrant = projector.project(&ticket, &SlotAddress::new("c", "1")).unwrap();
        assert_eq!(entrant.display_name(), "Lee");
    }

    #[test]
    fn test_project_all_collects_exclusions() {
        let projector = EntrantProjector::new(ids());
        let tickets = vec![
            ticket("T3", "LMP2", "S3"),
            ticket("T1", "GT3", "S1"),
            Ticket::builder("T2", "GT4").metadata("first", "Bo").build(),
        ];

        let projection = projector.project_all(&tickets, &mapping());

        assert_eq!(projection.entrants.len(), 1);
        assert_eq!(projection.entrants[0].source_ticket_id.as_str(), "T1");
        assert_eq!(projection.excluded.len(), 2);
        assert_eq!(projection.excluded[0].ticket_id.as_str(), "T2");
        assert!(matches!(
            projection.excluded[1].reason,
            ExclusionReason::NotMapped { .. }
        ));
        let held: Vec<_> = projection.held.iter().map(TicketId::as_str).collect();
        assert_eq!(held, vec!["T2", "T3"]);
    }

    #[test]
    fn test_slot_conflict_excludes_every_claimant() {
        let projector = EntrantProjector::new(ids());
        let tickets = vec![ticket("T1", "GT3", "S1"), ticket("T2", "GT3", "S2")];

        let projection = projector.project_all(&tickets, &mapping());

        assert!(projection.entrants.is_empty());
        assert_eq!(projection.excluded.len(), 2);
        for exclusion in &projection.excluded {
            let ExclusionReason::SlotConflict { tickets, .. } = &exclusion.reason else {
                panic!("expected slot conflict, got {:?}", exclusion.reason);
            };
            assert_eq!(tickets.len(), 2);
        }
        assert_eq!(projection.held.len(), 2);
    }

    #[test]
    fn test_cancelled_tickets_are_not_projected_or_held() {
        let projector = EntrantProjector::new(ids());
        let cancelled = Ticket::builder("T1", "GT3")
            .metadata("first", "Ann")
            .metadata("steam", "S1")
            .status(TicketStatus::Cancelled)
            .build();
        let live = ticket("T2", "GT3", "S2");

        let projection = projector.project_all(&[cancelled, live], &mapping());

        assert_eq!(projection.cancelled, 1);
        assert_eq!(projection.entrants.len(), 1);
        assert_eq!(projection.entrants[0].source_ticket_id.as_str(), "T2");
        assert!(projection.held.is_empty());
    }

    #[test]
    fn test_duplicate_ticket_ids_keep_first() {
        let projector = EntrantProjector::new(ids());
        let tickets = vec![ticket("T1", "GT3", "S1"), ticket("T1", "GT3", "S1")];

        let projection = projector.project_all(&tickets, &mapping());

        assert_eq!(projection.entrants.len(), 1);
        assert!(projection.excluded.is_empty());
    }
}
