//! Ticket-type to car mapping.
//!
//! A static, validated table loaded once at startup. Each ticket type maps to
//! exactly one car and one slot; no two ticket types may share a slot.
//!
//! The textual form is a comma-separated list of `type:car:slot` entries:
//!
//! ```text
//! 4f2c...:porsche_992_gt3_r:CAR_1,9a1b...:bmw_m4_gt3:CAR_2
//! ```

use crate::error::MappingError;
use crate::exclusion::ExclusionReason;
use crate::ids::TicketTypeId;
use crate::roster::SlotAddress;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Validated ticket-type to slot table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarMapping {
    entries: BTreeMap<TicketTypeId, SlotAddress>,
}

impl CarMapping {
    /// Build a mapping from `(ticket type, slot)` pairs.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No pairs are given
    /// - A ticket type appears twice
    /// - Two ticket types share a slot
    pub fn new(
        pairs: impl IntoIterator<Item = (TicketTypeId, SlotAddress)>,
    ) -> Result<Self, MappingError> {
        let mut entries = BTreeMap::new();
        let mut owners: BTreeMap<SlotAddress, TicketTypeId> = BTreeMap::new();

        for (ticket_type_id, address) in pairs {
            if entries.contains_key(&ticket_type_id) {
                return Err(MappingError::DuplicateTicketType(ticket_type_id));
            }
            if let Some(first) = owners.get(&address) {
                return Err(MappingError::DuplicateSlot {
                    slot: address,
                    first: first.clone(),
                    second: ticket_type_id,
                });
            }
            owners.insert(address.clone(), ticket_type_id.clone());
            entries.insert(ticket_type_id, address);
        }

        if entries.is_empty() {
            return Err(MappingError::Empty);
        }

        Ok(Self { entries })
    }

    /// Resolve a ticket type to its slot.
    ///
    /// # Errors
    ///
    /// Returns [`ExclusionReason::NotMapped`] if the type has no entry.
    pub fn resolve(&self, ticket_type_id: &TicketTypeId) -> Result<&SlotAddress, ExclusionReason> {
        self.entries
            .get(ticket_type_id)
            .ok_or_else(|| ExclusionReason::NotMapped {
                ticket_type_id: ticket_type_id.clone(),
            })
    }

    /// Number of mapped ticket types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a validated mapping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(ticket type, slot)` pairs in ticket-type order.
    pub fn iter(&self) -> impl Iterator<Item = (&TicketTypeId, &SlotAddress)> {
        self.entries.iter()
    }
}

impl FromStr for CarMapping {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pairs = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(pairs)
    }
}

fn parse_entry(entry: &str) -> Result<(TicketTypeId, SlotAddress), MappingError> {
    let malformed = || MappingError::Malformed {
        entry: entry.to_string(),
    };
    let mut parts = entry.split(':').map(str::trim);
    let (Some(ticket_type), Some(car), Some(slot), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    if ticket_type.is_empty() || car.is_empty() || slot.is_empty() {
        return Err(malformed());
    }
    Ok((TicketTypeId::new(ticket_type), SlotAddress::new(car, slot)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_resolve() {
        let mapping: CarMapping = "GT3:porsche_992_gt3:1, GT4:bmw_m4_gt4:2".parse().unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.resolve(&"GT3".into()).unwrap(),
            &SlotAddress::new("porsche_992_gt3", "1")
        );
        assert_eq!(
            mapping.resolve(&"LMP2".into()),
            Err(ExclusionReason::NotMapped {
                ticket_type_id: "LMP2".into()
            })
        );
    }

    #[test]
    fn test_rejects_empty_table() {
        assert_eq!("".parse::<CarMapping>(), Err(MappingError::Empty));
        assert_eq!(" , ".parse::<CarMapping>(), Err(MappingError::Empty));
    }

    #[test]
    fn test_rejects_malformed_entries() {
        for input in ["GT3", "GT3:car", "GT3:car:1:extra", ":car:1", "GT3::1", "GT3:car:"] {
            assert!(
                matches!(input.parse::<CarMapping>(), Err(MappingError::Malformed { .. })),
                "{input} should be malformed"
            );
        }
    }

    #[test]
    fn test_rejects_duplicate_ticket_type() {
        let result = "GT3:porsche:1,GT3:bmw:2".parse::<CarMapping>();
        assert_eq!(result, Err(MappingError::DuplicateTicketType("GT3".into())));
    }

    #[test]
    fn test_rejects_shared_slot() {
        let result = "GT3:porsche:1,GT3-late:porsche:1".parse::<CarMapping>();
        assert!(matches!(result, Err(MappingError::DuplicateSlot { .. })));
    }

    #[test]
    fn test_same_slot_id_on_different_cars_is_allowed() {
        let mapping: CarMapping = "GT3:porsche:1,GT4:bmw:1".parse().unwrap();
        assert_eq!(mapping.len(), 2);
    }
}
