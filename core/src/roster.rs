//! The championship roster as seen by the reconciler.
//!
//! A roster is a fixed layout of slots, each addressed by car and slot id,
//! where every slot is either vacant or holds one entry. Entries carrying a
//! source ticket id are gateway-managed; entries without one were put there
//! by someone else and are never touched.

use crate::ids::{CarId, SimulatorId, SlotId, TicketId};
use crate::projector::Entrant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable address of a roster slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotAddress {
    /// Car occupying the slot.
    pub car_id: CarId,
    /// Slot within the car's class.
    pub slot_id: SlotId,
}

impl SlotAddress {
    /// Create a new slot address.
    #[must_use]
    pub fn new(car_id: impl Into<CarId>, slot_id: impl Into<SlotId>) -> Self {
        Self {
            car_id: car_id.into(),
            slot_id: slot_id.into(),
        }
    }
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.car_id, self.slot_id)
    }
}

/// One occupied roster slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name of the driver.
    pub name: String,
    /// Team name, empty when none.
    pub team: String,
    /// Simulator identity of the driver.
    pub simulator_id: SimulatorId,
    /// Ticket this entry was created from. `None` for externally managed
    /// entries.
    pub source_ticket: Option<TicketId>,
}

impl RosterEntry {
    /// An entry not sourced from a ticket.
    #[must_use]
    pub fn external(
        name: impl Into<String>,
        team: impl Into<String>,
        simulator_id: impl Into<SimulatorId>,
    ) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            simulator_id: simulator_id.into(),
            source_ticket: None,
        }
    }

    /// Returns `true` if this entry was created by the gateway.
    #[must_use]
    pub const fn is_gateway_managed(&self) -> bool {
        self.source_ticket.is_some()
    }
}

impl From<&Entrant> for RosterEntry {
    fn from(entrant: &Entrant) -> Self {
        Self {
            name: entrant.display_name(),
            team: entrant.team_name.clone(),
            simulator_id: entrant.simulator_id.clone(),
            source_ticket: Some(entrant.source_ticket_id.clone()),
        }
    }
}

/// A championship roster: the slot layout plus the occupant of each slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    slots: BTreeMap<SlotAddress, Option<RosterEntry>>,
}

impl Roster {
    /// Create an empty roster with no slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a roster with the given vacant slots.
    #[must_use]
    pub fn with_slots(addresses: impl IntoIterator<Item = SlotAddress>) -> Self {
        Self {
            slots: addresses.into_iter().map(|address| (address, None)).collect(),
        }
    }

    /// Add a vacant slot. Existing slots keep their occupant.
    pub fn add_slot(&mut self, address: SlotAddress) {
        self.slots.entry(address).or_insert(None);
    }

    /// Returns `true` if the layout contains this slot.
    #[must_use]
    pub fn has_slot(&self, address: &SlotAddress) -> bool {
        self.slots.contains_key(address)
    }

    /// Occupant of a slot, if the slot exists and is occupied.
    #[must_use]
    pub fn get(&self, address: &SlotAddress) -> Option<&RosterEntry> {
        self.slots.get(address).and_then(Option::as_ref)
    }

    /// Put an entry into a slot, creating the slot if needed. Returns the
    /// previous occupant.
    pub fn place(&mut self, address: SlotAddress, entry: RosterEntry) -> Option<RosterEntry> {
        self.slots.insert(address, Some(entry)).flatten()
    }

    /// Vacate a slot. Returns the previous occupant.
    pub fn vacate(&mut self, address: &SlotAddress) -> Option<RosterEntry> {
        self.slots.get_mut(address).and_then(Option::take)
    }

    /// All slots in address order, vacant ones included.
    pub fn slots(&self) -> impl Iterator<Item = (&SlotAddress, Option<&RosterEntry>)> {
        self.slots.iter().map(|(address, entry)| (address, entry.as_ref()))
    }

    /// Occupied slots in address order.
    pub fn entries(&self) -> impl Iterator<Item = (&SlotAddress, &RosterEntry)> {
        self.slots
            .iter()
            .filter_map(|(address, entry)| entry.as_ref().map(|entry| (address, entry)))
    }

    /// Gateway-managed entries in address order.
    pub fn managed(&self) -> impl Iterator<Item = (&SlotAddress, &RosterEntry)> {
        self.entries().filter(|(_, entry)| entry.is_gateway_managed())
    }

    /// Externally managed entries in address order.
    pub fn external(&self) -> impl Iterator<Item = (&SlotAddress, &RosterEntry)> {
        self.entries().filter(|(_, entry)| !entry.is_gateway_managed())
    }

    /// Address of the first entry sourced from a ticket.
    #[must_use]
    pub fn find_ticket(&self, ticket_id: &TicketId) -> Option<&SlotAddress> {
        self.managed()
            .find(|(_, entry)| entry.source_ticket.as_ref() == Some(ticket_id))
            .map(|(address, _)| address)
    }

    /// Number of slots in the layout.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.entries().count()
    }
}
