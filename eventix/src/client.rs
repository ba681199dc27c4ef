//! Ticketing platform API client implementation

use crate::config::EventixConfig;
use crate::wire::StatisticsResponse;
use entrant_gateway_core::{EventId, FetchError, Ticket, TicketId, TicketSource};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Ticket fetcher for the ticketing platform.
#[derive(Debug, Clone)]
pub struct EventixClient {
    client: Client,
    config: EventixConfig,
}

impl EventixClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: EventixConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a client sharing an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: Client, config: EventixConfig) -> Self {
        Self { client, config }
    }

    /// The client's settings.
    #[must_use]
    pub const fn config(&self) -> &EventixConfig {
        &self.config
    }

    async fn fetch_page(
        &self,
        event_id: &EventId,
        access_token: &str,
        from: u64,
    ) -> Result<StatisticsResponse, FetchError> {
        let response = self
            .client
            .get(format!("{}/statistics/event/{event_id}", self.config.api_url))
            .query(&[("from", from), ("size", u64::from(self.config.page_size))])
            .bearer_auth(access_token)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Unauthorized),
            status if status.is_success() => {
                let body = response.bytes().await.map_err(transport_error)?;
                serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(%event_id, status = status.as_u16(), "Order listing failed");
                Err(FetchError::Remote(format!("status {}: {body}", status.as_u16())))
            }
        }
    }
}

fn transport_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Remote(error.to_string())
    }
}

impl TicketSource for EventixClient {
    async fn fetch_tickets(
        &self,
        event_id: &EventId,
        access_token: &str,
    ) -> Result<Vec<Ticket>, FetchError> {
        let mut seen: HashSet<TicketId> = HashSet::new();
        let mut tickets = Vec::new();
        let mut offset = 0_u64;

        loop {
            let page = self.fetch_page(event_id, access_token, offset).await?;
            let total = page.hits.total.value();
            let received = page.hits.hits.len() as u64;
            debug!(%event_id, offset, received, total, "Fetched order page");

            // Short pages are allowed; an empty page before the total is not.
            if received == 0 && offset < total {
                warn!(%event_id, offset, total, "Order listing stopped before its total");
                return Err(FetchError::Malformed(format!(
                    "empty page at offset {offset} of {total} hits"
                )));
            }

            for hit in page.hits.hits {
                for ticket in hit.source.into_tickets(event_id.as_str()) {
                    if seen.insert(ticket.ticket_id.clone()) {
                        tickets.push(ticket);
                    }
                }
            }

            offset += received;
            if offset >= total {
                break;
            }
        }

        debug!(%event_id, tickets = tickets.len(), "Fetched all orders");
        Ok(tickets)
    }
}
