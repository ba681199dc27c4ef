//! Scripted ticket source.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use entrant_gateway_core::{EventId, FetchError, Ticket, TicketSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    tickets: Vec<Ticket>,
    queued: VecDeque<Result<Vec<Ticket>, FetchError>>,
    rejected_tokens: Vec<String>,
    calls: Vec<(EventId, String)>,
}

/// Ticket source returning scripted responses.
///
/// Queued responses are served first, one per call; afterwards every call
/// returns the current ticket set. Tokens listed as rejected produce
/// [`FetchError::Unauthorized`]. Clones share the script.
///
/// # Example
///
/// ```
/// use entrant_gateway_core::{EventId, FetchError, TicketSource};
/// use entrant_gateway_testing::MockTicketSource;
///
/// # async fn example() {
/// let source = MockTicketSource::with_tickets(vec![]);
/// source.push_response(Err(FetchError::Timeout));
///
/// let event = EventId::new("E1");
/// assert_eq!(source.fetch_tickets(&event, "token").await, Err(FetchError::Timeout));
/// assert_eq!(source.fetch_tickets(&event, "token").await, Ok(vec![]));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTicketSource {
    script: Arc<Mutex<Script>>,
    delay: Duration,
}

impl MockTicketSource {
    /// Create a source with no tickets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source returning `tickets`.
    #[must_use]
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        let source = Self::new();
        source.set_tickets(tickets);
        source
    }

    /// Delay every fetch.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the ticket set returned once the queue is empty.
    pub fn set_tickets(&self, tickets: Vec<Ticket>) {
        self.script.lock().unwrap().tickets = tickets;
    }

    /// Queue a one-off response.
    pub fn push_response(&self, response: Result<Vec<Ticket>, FetchError>) {
        self.script.lock().unwrap().queued.push_back(response);
    }

    /// Answer `Unauthorized` whenever this token is presented.
    pub fn reject_token(&self, token: impl Into<String>) {
        self.script.lock().unwrap().rejected_tokens.push(token.into());
    }

    /// Tokens presented so far, in call order.
    #[must_use]
    pub fn tokens_seen(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }
}

impl TicketSource for MockTicketSource {
    async fn fetch_tickets(
        &self,
        event_id: &EventId,
        access_token: &str,
    ) -> Result<Vec<Ticket>, FetchError> {
        let response = {
            let mut script = self.script.lock().unwrap();
            script.calls.push((event_id.clone(), access_token.to_string()));
            if script.rejected_tokens.iter().any(|t| t == access_token) {
                Err(FetchError::Unauthorized)
            } else if let Some(queued) = script.queued.pop_front() {
                queued
            } else {
                Ok(script.tickets.clone())
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        response
    }
}
