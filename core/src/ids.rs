//! Identifier newtypes.
//!
//! Every identifier crossing a component boundary gets its own type so a
//! ticket-type id can never be passed where a ticket id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Event identifier on the ticketing platform.
    EventId
);
string_id!(
    /// Ticket identifier, unique within an event.
    TicketId
);
string_id!(
    /// Ticket-type identifier. Each type maps to exactly one car and slot.
    TicketTypeId
);
string_id!(
    /// Order identifier on the ticketing platform.
    OrderId
);
string_id!(
    /// Car model identifier as known by the championship manager.
    CarId
);
string_id!(
    /// Slot identifier within the car's class.
    SlotId
);
string_id!(
    /// Simulator identity of the driver (e.g. a Steam id).
    SimulatorId
);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_serde_are_transparent() {
        let id = TicketId::new("T1");
        assert_eq!(id.to_string(), "T1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"T1\"");

        let back: TicketId = serde_json::from_str("\"T1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_ordering_follows_string_order() {
        let mut ids = vec![TicketId::from("b"), TicketId::from("a"), TicketId::from("c")];
        ids.sort();
        let expected: Vec<TicketId> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(ids, expected);
    }
}
