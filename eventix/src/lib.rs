//! # Entrant Gateway Eventix
//!
//! [`TicketSource`](entrant_gateway_core::TicketSource) backed by the
//! ticketing platform's order statistics search.
//!
//! One fetch pages through every order of the event and returns the full
//! ticket set. A failure on any page fails the whole fetch, so callers never
//! see a partial result.
//!
//! ```rust,ignore
//! use entrant_gateway_eventix::{EventixClient, EventixConfig};
//!
//! let client = EventixClient::new(EventixConfig::default().with_page_size(50));
//! let tickets = client.fetch_tickets(&event_id, &access_token).await?;
//! ```

pub mod client;
pub mod config;
pub mod wire;

pub use client::EventixClient;
pub use config::EventixConfig;
