//! Three-way roster reconciliation.
//!
//! [`reconcile`] computes the next roster from the current one and the
//! entrants projected this pass, keyed by source ticket id:
//!
//! - entrants without a managed entry are **added**
//! - entrants whose entry differs (fields or slot) are **updated**
//! - managed entries whose ticket is neither projected nor held are **removed**
//! - externally managed entries are never touched
//!
//! Entries of held tickets (live tickets excluded this pass) stay exactly
//! where they are. A placement that would overwrite an external or held
//! entry is refused with [`ExclusionReason::SlotOccupied`] and the refused
//! ticket's existing entry, if any, is kept in place. Refusals can cascade,
//! so placement is resolved to a fixpoint before the roster is built.
//!
//! The result is fully computed in memory; persisting it is the roster
//! store's job.

use crate::exclusion::{Exclusion, ExclusionReason};
use crate::ids::TicketId;
use crate::projector::Entrant;
use crate::roster::{Roster, RosterEntry, SlotAddress};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Changes between the current and the next roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDiff {
    /// Tickets that gained an entry.
    pub added: Vec<TicketId>,
    /// Tickets whose entry changed fields or moved slot.
    pub updated: Vec<TicketId>,
    /// Tickets whose entry was dropped.
    pub removed: Vec<TicketId>,
    /// Entries left exactly as they were.
    pub unchanged: usize,
    /// Slots cleared because they repeated another entry's source ticket.
    pub repaired: Vec<SlotAddress>,
}

impl RosterDiff {
    /// Returns `true` if applying the diff would not change the roster.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.repaired.is_empty()
    }

    /// Entries dropped, counting repaired duplicates.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len() + self.repaired.len()
    }
}

/// Result of reconciling a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The next roster.
    pub roster: Roster,
    /// What changed.
    pub diff: RosterDiff,
    /// Managed entries kept in place because their ticket was held or its
    /// placement was refused.
    pub held: Vec<TicketId>,
    /// Placements refused by the reconciler.
    pub excluded: Vec<Exclusion>,
}

/// Reconcile the current roster with this pass's entrants.
///
/// `held` names live tickets that were excluded upstream; their existing
/// entries are preserved.
#[must_use]
pub fn reconcile(
    current: &Roster,
    entrants: &[Entrant],
    held: &BTreeSet<TicketId>,
) -> Reconciliation {
    let mut diff = RosterDiff::default();

    // First managed entry per ticket in address order; later copies are corrupt.
    let mut existing: BTreeMap<&TicketId, (&SlotAddress, &RosterEntry)> = BTreeMap::new();
    for (address, entry) in current.managed() {
        let Some(ticket_id) = entry.source_ticket.as_ref() else {
            continue;
        };
        if existing.contains_key(ticket_id) {
            diff.repaired.push(address.clone());
        } else {
            existing.insert(ticket_id, (address, entry));
        }
    }

    let mut desired: BTreeMap<&TicketId, &Entrant> = BTreeMap::new();
    for entrant in entrants {
        desired.entry(&entrant.source_ticket_id).or_insert(entrant);
    }

    let mut pinned: BTreeSet<&SlotAddress> = current.external().map(|(address, _)| address).collect();
    let mut kept: BTreeSet<&TicketId> = BTreeSet::new();
    for (ticket_id, (address, _)) in &existing {
        if held.contains(*ticket_id) && !desired.contains_key(*ticket_id) {
            pinned.insert(*address);
            kept.insert(*ticket_id);
        }
    }

    let mut candidates: BTreeMap<&TicketId, (SlotAddress, &Entrant)> = desired
        .iter()
        .map(|(ticket_id, entrant)| (*ticket_id, (entrant.address(), *entrant)))
        .collect();
    let mut excluded = Vec::new();

    loop {
        let refused = refuse_placements(current, &candidates, &pinned);
        if refused.is_empty() {
            break;
        }

        for (ticket_id, reason) in refused {
            candidates.remove(ticket_id);
            if let Some((address, _)) = existing.get(ticket_id) {
                pinned.insert(*address);
                kept.insert(ticket_id);
            }
            excluded.push(Exclusion::new(ticket_id.clone(), reason));
        }
    }

    let mut next = current.clone();
    let managed: Vec<SlotAddress> = current.managed().map(|(address, _)| address.clone()).collect();
    for address in &managed {
        next.vacate(address);
    }
    for ticket_id in &kept {
        if let Some((address, entry)) = existing.get(*ticket_id) {
            next.place((*address).clone(), (*entry).clone());
        }
    }

    for (ticket_id, (address, entrant)) in candidates {
        let entry = RosterEntry::from(entrant);
        match existing.get(ticket_id) {
            Some((old_address, old_entry)) if **old_address == address && **old_entry == entry => {
                diff.unchanged += 1;
            }
            Some(_) => diff.updated.push(ticket_id.clone()),
            None => diff.added.push(ticket_id.clone()),
        }
        next.place(address, entry);
    }

    diff.unchanged += kept.len();
    diff.removed = existing
        .keys()
        .filter(|ticket_id| !desired.contains_key(**ticket_id) && !held.contains(**ticket_id))
        .map(|ticket_id| (*ticket_id).clone())
        .collect();

    excluded.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));

    Reconciliation {
        roster: next,
        diff,
        held: kept.into_iter().cloned().collect(),
        excluded,
    }
}

/// Candidates that cannot be placed given the current pins.
fn refuse_placements<'a>(
    current: &Roster,
    candidates: &BTreeMap<&'a TicketId, (SlotAddress, &'a Entrant)>,
    pinned: &BTreeSet<&SlotAddress>,
) -> Vec<(&'a TicketId, ExclusionReason)> {
    let mut claims: BTreeMap<&SlotAddress, Vec<&TicketId>> = BTreeMap::new();
    for (ticket_id, (address, _)) in candidates {
        claims.entry(address).or_default().push(*ticket_id);
    }

    candidates
        .iter()
        .filter_map(|(ticket_id, (address, _))| {
            let reason = if !current.has_slot(address) {
                ExclusionReason::UnknownSlot {
                    slot: address.clone(),
                }
            } else if pinned.contains(address) {
                ExclusionReason::SlotOccupied {
                    slot: address.clone(),
                }
            } else {
                match claims.get(address) {
                    Some(claimants) if claimants.len() > 1 => ExclusionReason::SlotConflict {
                        slot: address.clone(),
                        tickets: claimants.iter().map(|id| (*id).clone()).collect(),
                    },
                    _ => return None,
                }
            };
            Some((*ticket_id, reason))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn gt3(slot: &str) -> SlotAddress {
        SlotAddress::new("porsche_992_gt3", slot)
    }

    fn entrant(ticket: &str, slot: &str, first: &str) -> Entrant {
        Entrant {
            source_ticket_id: ticket.into(),
            first_name: first.into(),
            last_name: "Lee".into(),
            team_name: String::new(),
            simulator_id: format!("S-{ticket}").into(),
            car_id: "porsche_992_gt3".into(),
            slot_id: slot.into(),
        }
    }

    fn layout() -> Roster {
        Roster::with_slots([gt3("1"), gt3("2"), gt3("3")])
    }

    fn no_held() -> BTreeSet<TicketId> {
        BTreeSet::new()
    }

    #[test]
    fn test_adds_new_entrant() {
        let result = reconcile(&layout(), &[entrant("T1", "1", "Ann")], &no_held());

        assert_eq!(result.diff.added, vec![TicketId::from("T1")]);
        let entry = result.roster.get(&gt3("1")).unwrap();
        assert_eq!(entry.name, "Ann Lee");
        assert_eq!(entry.source_ticket, Some("T1".into()));
    }

    #[test]
    fn test_second_pass_is_noop() {
        let entrants = [entrant("T1", "1", "Ann"), entrant("T2", "2", "Bo")];
        let first = reconcile(&layout(), &entrants, &no_held());
        let second = reconcile(&first.roster, &entrants, &no_held());

        assert!(second.diff.is_empty());
        assert_eq!(second.diff.unchanged, 2);
        assert_eq!(second.roster, first.roster);
    }

    #[test]
    fn test_replacement_in_same_slot() {
        let first = reconcile(&layout(), &[entrant("T1", "1", "Ann")], &no_held());
        let second = reconcile(&first.roster, &[entrant("T2", "1", "Bo")], &no_held());

        assert_eq!(second.diff.removed, vec![TicketId::from("T1")]);
        assert_eq!(second.diff.added, vec![TicketId::from("T2")]);
        let entry = second.roster.get(&gt3("1")).unwrap();
        assert_eq!(entry.source_ticket, Some("T2".into()));
        assert_eq!(second.roster.managed().count(), 1);
    }

    #[test]
    fn test_changed_fields_update_in_place() {
        let first = reconcile(&layout(), &[entrant("T1", "1", "Ann")], &no_held());
        let second = reconcile(&first.roster, &[entrant("T1", "1", "Anna")], &no_held());

        assert_eq!(second.diff.updated, vec![TicketId::from("T1")]);
        assert_eq!(second.roster.get(&gt3("1")).unwrap().name, "Anna Lee");
    }

    #[test]
    fn test_moved_slot_counts_as_update() {
        let first = reconcile(&layout(), &[entrant("T1", "1", "Ann")], &no_held());
        let second = reconcile(&first.roster, &[entrant("T1", "2", "Ann")], &no_held());

        assert_eq!(second.diff.updated, vec![TicketId::from("T1")]);
        assert!(second.roster.get(&gt3("1")).is_none());
        assert!(second.roster.get(&gt3("2")).is_some());
    }

    #[test]
    fn test_external_entries_untouched() {
        let mut roster = layout();
        roster.place(gt3("1"), RosterEntry::external("Max", "Works", "S9"));

        let result = reconcile(&roster, &[entrant("T1", "1", "Ann")], &no_held());

        assert!(result.diff.added.is_empty());
        assert_eq!(result.roster.get(&gt3("1")).unwrap().name, "Max");
        assert_eq!(
            result.excluded,
            vec![Exclusion::new(
                "T1".into(),
                ExclusionReason::SlotOccupied { slot: gt3("1") }
            )]
        );
    }

    #[test]
    fn test_held_entries_are_kept() {
        let first = reconcile(&layout(), &[entrant("T1", "1", "Ann")], &no_held());
        let held: BTreeSet<TicketId> = [TicketId::from("T1")].into();

        let second = reconcile(&first.roster, &[], &held);

        assert!(second.diff.is_empty());
        assert_eq!(second.held, vec![TicketId::from("T1")]);
        assert_eq!(second.roster, first.roster);
    }

    #[test]
    fn test_refused_move_keeps_old_entry_and_cascades() {
        // T1 sits in slot 1, T2 in slot 2. T1 wants slot 3 (held by
        // external), so it stays in 1; T2 wants slot 1, which is now pinned.
        let mut roster = layout();
        roster.place(gt3("3"), RosterEntry::external("Max", "", "S9"));
        let first = reconcile(
            &roster,
            &[entrant("T1", "1", "Ann"), entrant("T2", "2", "Bo")],
            &no_held(),
        );

        let second = reconcile(
            &first.roster,
            &[entrant("T1", "3", "Ann"), entrant("T2", "1", "Bo")],
            &no_held(),
        );

        assert!(second.diff.is_empty());
        assert_eq!(second.roster, first.roster);
        let refused: Vec<_> = second.excluded.iter().map(|e| e.ticket_id.as_str()).collect();
        assert_eq!(refused, vec!["T1", "T2"]);
        assert_eq!(second.held.len(), 2);
    }

    #[test]
    fn test_unknown_slot_is_refused() {
        let result = reconcile(&layout(), &[entrant("T1", "9", "Ann")], &no_held());

        assert_eq!(
            result.excluded[0].reason,
            ExclusionReason::UnknownSlot { slot: gt3("9") }
        );
        assert_eq!(result.roster.occupied_count(), 0);
    }

    #[test]
    fn test_duplicate_tags_are_repaired() {
        let mut roster = layout();
        let entry = RosterEntry::from(&entrant("T1", "1", "Ann"));
        roster.place(gt3("1"), entry.clone());
        roster.place(gt3("2"), entry);

        let result = reconcile(&roster, &[entrant("T1", "1", "Ann")], &no_held());

        assert_eq!(result.diff.repaired, vec![gt3("2")]);
        assert_eq!(result.diff.removed_count(), 1);
        assert_eq!(result.roster.managed().count(), 1);
        assert_eq!(result.diff.unchanged, 1);
    }

    #[test]
    fn test_conflicting_entrants_are_refused_together() {
        let result = reconcile(
            &layout(),
            &[entrant("T1", "1", "Ann"), entrant("T2", "1", "Bo")],
            &no_held(),
        );

        assert_eq!(result.excluded.len(), 2);
        assert!(result.roster.get(&gt3("1")).is_none());
    }
}
