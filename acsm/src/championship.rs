//! Championship document as stored by the championship manager.
//!
//! The file is kept as a [`serde_json::Value`] so every field the gateway
//! does not understand survives a rewrite. Entrants live under
//! `Classes[].Entrants`, keyed by slot id:
//!
//! ```json
//! {"Classes": [{"Entrants": {"CAR_1": {
//!     "Name": "Ann Lee", "Team": "", "GUID": "7656119...",
//!     "Model": "porsche_992_gt3", "GatewayTicket": "T1"
//! }}}]}
//! ```
//!
//! A slot is addressed by its `Model` and key. An empty `GUID` marks a vacant
//! slot. `GatewayTicket` tags entries the gateway created.
//!
//! Untagged entrants that cannot be read (no `Model`, non-string fields) are
//! left out of the roster and never written. A tagged one is an error.

use entrant_gateway_core::{Roster, RosterEntry, RosterError, SlotAddress, TicketId};
use serde_json::{Map, Value};
use tracing::warn;

/// Entrant field carrying the source ticket id.
pub const TICKET_FIELD: &str = "GatewayTicket";

/// A parsed championship file.
#[derive(Debug, Clone, PartialEq)]
pub struct Championship {
    document: Value,
}

impl Championship {
    /// Parse championship JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Malformed`] if the text is not JSON.
    pub fn parse(text: &str) -> Result<Self, RosterError> {
        let document = serde_json::from_str(text).map_err(|e| RosterError::Malformed(e.to_string()))?;
        Ok(Self { document })
    }

    /// Serialize back to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, RosterError> {
        serde_json::to_string_pretty(&self.document).map_err(|e| RosterError::Malformed(e.to_string()))
    }

    /// The roster view of the document.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Malformed`] if the class structure is not as
    /// expected, a gateway-managed entrant cannot be read, or two slots share
    /// an address.
    pub fn roster(&self) -> Result<Roster, RosterError> {
        let mut roster = Roster::new();
        for class in classes(&self.document)? {
            let entrants = class
                .get("Entrants")
                .and_then(Value::as_object)
                .ok_or_else(|| malformed("class without an Entrants object"))?;
            for (key, entrant) in entrants {
                let (address, entry) = match slot_of(key, entrant) {
                    Ok(slot) => slot,
                    Err(SlotError::Unreadable(error)) => {
                        warn!(slot = %key, %error, "Skipping unreadable entrant");
                        continue;
                    }
                    Err(SlotError::Managed(error)) => return Err(error),
                };
                if roster.has_slot(&address) {
                    return Err(malformed(&format!("slot {address} appears twice")));
                }
                match entry {
                    Some(entry) => {
                        roster.place(address, entry);
                    }
                    None => roster.add_slot(address),
                }
            }
        }
        Ok(roster)
    }

    /// Write `roster` into the document. Only slots whose occupant differs
    /// are touched. Returns the number of slots rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::UnknownSlot`] if the roster has a slot the
    /// document lacks, or [`RosterError::Malformed`] on unexpected structure.
    pub fn apply(&mut self, roster: &Roster) -> Result<usize, RosterError> {
        let known = self.roster()?;
        if let Some((address, _)) = roster.slots().find(|(address, _)| !known.has_slot(address)) {
            return Err(RosterError::UnknownSlot(address.clone()));
        }

        let mut rewritten = 0;
        for class in classes_mut(&mut self.document)? {
            let Some(entrants) = class.get_mut("Entrants").and_then(Value::as_object_mut) else {
                continue;
            };
            for (key, entrant) in entrants.iter_mut() {
                let (address, current) = match slot_of(key, entrant) {
                    Ok(slot) => slot,
                    Err(SlotError::Unreadable(_)) => continue,
                    Err(SlotError::Managed(error)) => return Err(error),
                };
                if !roster.has_slot(&address) {
                    continue;
                }
                let desired = roster.get(&address);
                if current.as_ref() == desired {
                    continue;
                }
                let fields = entrant
                    .as_object_mut()
                    .ok_or_else(|| malformed("entrant is not an object"))?;
                write_entry(fields, desired);
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }
}

/// Why an entrant could not be read.
enum SlotError {
    /// Untagged; skipped.
    Unreadable(RosterError),
    /// Tagged by the gateway; fails the load.
    Managed(RosterError),
}

fn slot_of(key: &str, entrant: &Value) -> Result<(SlotAddress, Option<RosterEntry>), SlotError> {
    let tagged = entrant
        .get(TICKET_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|ticket| !ticket.is_empty());
    let classify = |error| {
        if tagged {
            SlotError::Managed(error)
        } else {
            SlotError::Unreadable(error)
        }
    };
    let address = address_of(key, entrant).map_err(classify)?;
    let entry = entry_of(entrant).map_err(classify)?;
    Ok((address, entry))
}

fn malformed(message: &str) -> RosterError {
    RosterError::Malformed(message.to_string())
}

fn classes(document: &Value) -> Result<&Vec<Value>, RosterError> {
    document
        .get("Classes")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("Classes array not found"))
}

fn classes_mut(document: &mut Value) -> Result<&mut Vec<Value>, RosterError> {
    document
        .get_mut("Classes")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| malformed("Classes array not found"))
}

fn text<'a>(entrant: &'a Value, field: &str) -> Result<&'a str, RosterError> {
    match entrant.get(field) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(malformed(&format!("entrant field {field} is not a string"))),
    }
}

fn address_of(key: &str, entrant: &Value) -> Result<SlotAddress, RosterError> {
    let model = text(entrant, "Model")?;
    if model.is_empty() {
        return Err(malformed(&format!("entrant {key} has no Model")));
    }
    Ok(SlotAddress::new(model, key))
}

fn entry_of(entrant: &Value) -> Result<Option<RosterEntry>, RosterError> {
    let guid = text(entrant, "GUID")?;
    if guid.is_empty() {
        return Ok(None);
    }
    let ticket = text(entrant, TICKET_FIELD)?;
    Ok(Some(RosterEntry {
        name: text(entrant, "Name")?.to_string(),
        team: text(entrant, "Team")?.to_string(),
        simulator_id: guid.into(),
        source_ticket: (!ticket.is_empty()).then(|| TicketId::new(ticket)),
    }))
}

fn write_entry(fields: &mut Map<String, Value>, entry: Option<&RosterEntry>) {
    match entry {
        Some(entry) => {
            fields.insert("Name".into(), entry.name.clone().into());
            fields.insert("Team".into(), entry.team.clone().into());
            fields.insert("GUID".into(), entry.simulator_id.as_str().into());
            match &entry.source_ticket {
                Some(ticket) => fields.insert(TICKET_FIELD.into(), ticket.as_str().into()),
                None => fields.remove(TICKET_FIELD),
            };
        }
        None => {
            for field in ["Name", "Team", "GUID"] {
                fields.insert(field.into(), "".into());
            }
            fields.remove(TICKET_FIELD);
        }
    }
}
