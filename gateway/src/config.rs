//! Configuration management for the gateway.
//!
//! Loaded once at startup from environment variables, optionally seeded from
//! a `.env` file. Required values without a default abort startup.

use entrant_gateway_auth::OAuthConfig;
use entrant_gateway_core::{CarMapping, EventId, MappingError, MetadataFieldIds};
use entrant_gateway_eventix::EventixConfig;
use entrant_gateway_eventix::config::DEFAULT_API_URL;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable does not parse.
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The ticket type table is invalid.
    #[error("TICKET_TYPE_MAP is invalid: {0}")]
    Mapping(#[from] MappingError),
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub listen_address: SocketAddr,
    /// Serve `/metrics`
    pub metrics_enabled: bool,
    /// Championship JSON file managed by the gateway
    pub championship_file: PathBuf,
    /// Keep a timestamped copy of the previous file on commit
    pub keep_backup: bool,
    /// Event to sync
    pub event_id: EventId,
    /// Ticketing platform API settings
    pub eventix: EventixConfig,
    /// Buyer metadata field identifiers
    pub metadata: MetadataFieldIds,
    /// OAuth2 client registration and token timing
    pub oauth: OAuthConfig,
    /// Ticket type to slot table
    pub mapping: CarMapping,
    /// Period of scheduled sync passes
    pub sync_interval: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or any variable is
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };
        let http_timeout = Duration::from_secs(env.parsed("HTTP_TIMEOUT_SECS", 30)?);

        let eventix = EventixConfig::default()
            .with_api_url(env.optional("EVENTIX_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()))
            .with_page_size(env.parsed("EVENTIX_PAGE_SIZE", 100)?)
            .with_timeout(http_timeout);

        let oauth = OAuthConfig::new(
            env.required("EVENTIX_OAUTH2_CLIENT_ID")?,
            env.required("EVENTIX_OAUTH2_CLIENT_SECRET")?,
            env.required("EVENTIX_OAUTH2_AUTH_URL")?,
            env.required("EVENTIX_OAUTH2_TOKEN_URL")?,
            env.required("EVENTIX_OAUTH2_REDIRECT_URL")?,
        )
        .with_timeout(http_timeout)
        .with_refresh_margin(Duration::from_secs(env.parsed("TOKEN_REFRESH_MARGIN_SECS", 60)?));

        let metadata = MetadataFieldIds::new(
            env.required("EVENTIX_METADATA_FIRST_NAME")?,
            env.required("EVENTIX_METADATA_LAST_NAME")?,
            env.required("EVENTIX_METADATA_TEAM_NAME")?,
            env.required("EVENTIX_METADATA_STEAM_ID")?,
        );

        let sync_interval: u64 = env.parsed("SYNC_INTERVAL_SECS", 3600)?;
        if sync_interval == 0 {
            return Err(ConfigError::Invalid {
                name: "SYNC_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            listen_address: env.parsed("LISTEN_ADDRESS", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            metrics_enabled: env.flag("METRICS_ENABLED", true)?,
            championship_file: PathBuf::from(env.required("ACSM_JSON_FILE")?),
            keep_backup: env.flag("ACSM_KEEP_BACKUP", true)?,
            event_id: EventId::new(env.required("EVENTIX_EVENT_GUID")?),
            eventix,
            metadata,
            oauth,
            mapping: env.required("TICKET_TYPE_MAP")?.parse()?,
            sync_interval: Duration::from_secs(sync_interval),
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Trimmed value, `None` when unset or blank.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name).map(|value| value.to_ascii_lowercase()) {
            None => Ok(default),
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    name,
                    value,
                    reason: "expected true or false".to_string(),
                }),
            },
        }
    }
}
