//! Ticketing platform API settings.

use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.eventix.io/3.0.0";

/// Settings for [`EventixClient`](crate::EventixClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventixConfig {
    /// API base URL, without trailing slash.
    pub api_url: String,
    /// Orders requested per page.
    pub page_size: u32,
    /// Bound for each page request.
    pub timeout: Duration,
}

impl Default for EventixConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: 100,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EventixConfig {
    /// Set the API base URL. A trailing slash is dropped.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the page size. Zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = EventixConfig::default()
            .with_api_url("http://localhost:8080/")
            .with_page_size(0)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.page_size, 1);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
