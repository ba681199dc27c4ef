//! # Entrant Gateway Testing
//!
//! Testing utilities and helpers for the entrant gateway.
//!
//! This crate provides:
//! - Deterministic clocks
//! - A scripted [`TicketSource`](entrant_gateway_core::TicketSource)
//! - An in-memory [`RosterStore`](entrant_gateway_core::RosterStore) with
//!   fault injection
//! - Ticket and roster fixtures
//!
//! ## Example
//!
//! ```
//! use entrant_gateway_testing::{InMemoryRosterStore, MockTicketSource, fixtures};
//!
//! let source = MockTicketSource::with_tickets(vec![
//!     fixtures::ticket("T1", "GT3", "Ann", "Lee", "S123"),
//! ]);
//! let store = InMemoryRosterStore::new(fixtures::roster_layout(2));
//! assert_eq!(store.commits(), 0);
//! # let _ = source;
//! ```

use chrono::{DateTime, Utc};
use entrant_gateway_core::environment::Clock;

pub mod roster_store;
pub mod ticket_source;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use entrant_gateway_testing::mocks::FixedClock;
    /// use entrant_gateway_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can advance a clock it already
    /// handed to the code under test.
    ///
    /// ```
    /// use entrant_gateway_testing::mocks::ManualClock;
    /// use entrant_gateway_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = ManualClock::at(Utc::now());
    /// let start = clock.now();
    /// clock.clone().advance(Duration::seconds(30));
    /// assert_eq!(clock.now() - start, Duration::seconds(30));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock stopped at `time`.
        #[must_use]
        pub fn at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap();
            *time += by;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ticket and roster fixtures.
pub mod fixtures {
    use entrant_gateway_core::{
        CarMapping, MetadataFieldIds, Roster, SlotAddress, Ticket, TicketStatus, TicketTypeId,
    };

    /// Car every fixture slot belongs to.
    pub const CAR: &str = "porsche_992_gt3";

    /// Metadata field ids used by [`ticket`].
    #[must_use]
    pub fn metadata_ids() -> MetadataFieldIds {
        MetadataFieldIds::new("md-first", "md-last", "md-team", "md-steam")
    }

    /// A paid ticket with complete driver metadata.
    #[must_use]
    pub fn ticket(id: &str, ticket_type: &str, first: &str, last: &str, steam: &str) -> Ticket {
        Ticket::builder(id, ticket_type)
            .metadata("md-first", first)
            .metadata("md-last", last)
            .metadata("md-steam", steam)
            .build()
    }

    /// A refunded or invalidated ticket.
    #[must_use]
    pub fn cancelled(id: &str, ticket_type: &str) -> Ticket {
        Ticket::builder(id, ticket_type)
            .metadata("md-first", "Gone")
            .metadata("md-steam", format!("S-{id}"))
            .status(TicketStatus::Cancelled)
            .build()
    }

    /// Address of fixture slot `n`.
    #[must_use]
    pub fn slot(n: usize) -> SlotAddress {
        SlotAddress::new(CAR, n.to_string())
    }

    /// A vacant roster with slots `1..=slots`.
    #[must_use]
    pub fn roster_layout(slots: usize) -> Roster {
        Roster::with_slots((1..=slots).map(slot))
    }

    /// Mapping of ticket types `GT3-1..=GT3-n` to fixture slots `1..=n`.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is zero.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn mapping(slots: usize) -> CarMapping {
        CarMapping::new((1..=slots).map(|n| (TicketTypeId::new(format!("GT3-{n}")), slot(n))))
            .expect("fixture mapping is valid")
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use roster_store::InMemoryRosterStore;
pub use ticket_source::MockTicketSource;
