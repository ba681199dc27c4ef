//! Response shapes of the order statistics endpoint.
//!
//! Only the fields the gateway reads are modelled; everything else in the
//! payload is ignored.

use entrant_gateway_core::{Ticket, TicketStatus};
use serde::Deserialize;
use serde_json::Value;

/// `GET /statistics/event/{event}` response.
#[derive(Debug, Deserialize)]
pub struct StatisticsResponse {
    /// Search hits.
    pub hits: Hits,
}

/// One page of search hits.
#[derive(Debug, Deserialize)]
pub struct Hits {
    /// Total number of hits across all pages.
    pub total: Total,
    /// Hits on this page.
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Hit total, either a bare number or `{"value": n}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Total {
    /// `"total": 12`
    Count(u64),
    /// `"total": {"value": 12, "relation": "eq"}`
    Object {
        /// Number of hits.
        value: u64,
    },
}

impl Total {
    /// Number of hits.
    #[must_use]
    pub const fn value(&self) -> u64 {
        match self {
            Self::Count(value) | Self::Object { value } => *value,
        }
    }
}

/// A search hit wrapping one order.
#[derive(Debug, Deserialize)]
pub struct Hit {
    /// The order document.
    #[serde(rename = "_source")]
    pub source: Order,
}

/// An order with its tickets.
#[derive(Debug, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub guid: String,
    /// Order status; only `paid` orders entitle to a slot.
    pub status: String,
    /// Tickets bought in this order.
    #[serde(default)]
    pub tickets: Vec<OrderTicket>,
}

/// A ticket inside an order.
#[derive(Debug, Deserialize)]
pub struct OrderTicket {
    /// Ticket identifier.
    pub guid: String,
    /// Ticket-type identifier.
    pub ticket_id: String,
    /// Event the ticket belongs to.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Set once the ticket has been invalidated.
    #[serde(default)]
    pub invalidated: bool,
    /// Buyer-provided metadata.
    #[serde(default)]
    pub meta_data: Vec<MetaData>,
}

/// One buyer metadata answer.
#[derive(Debug, Deserialize)]
pub struct MetaData {
    /// Metadata field identifier.
    pub metadata_id: String,
    /// Answer, absent when left blank. Numbers and booleans occur for
    /// numeric and checkbox fields.
    #[serde(default)]
    pub value: Value,
}

impl MetaData {
    /// The answer as text; `None` for null, arrays and objects.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match &self.value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl Order {
    /// Convert the order's tickets for `event_id` into canonical tickets.
    pub fn into_tickets(self, event_id: &str) -> impl Iterator<Item = Ticket> + '_ {
        let paid = self.status == "paid";
        let order_id = self.guid;
        self.tickets
            .into_iter()
            .filter(move |ticket| ticket.event_id.as_deref().is_none_or(|id| id == event_id))
            .map(move |ticket| {
                let status = if paid && !ticket.invalidated {
                    TicketStatus::Valid
                } else {
                    TicketStatus::Cancelled
                };
                ticket
                    .meta_data
                    .into_iter()
                    .fold(
                        Ticket::builder(ticket.guid, ticket.ticket_id)
                            .order(order_id.clone())
                            .status(status),
                        |builder, answer| match answer.text() {
                            Some(value) => builder.metadata(answer.metadata_id, value),
                            None => builder,
                        },
                    )
                    .build()
            })
    }
}
