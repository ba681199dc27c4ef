//! # Entrant Gateway Authentication
//!
//! OAuth2 session with the ticketing platform.
//!
//! The gateway authorizes once through the authorization-code flow and from
//! then on lives off the refresh credential. [`TokenStore`] owns the token
//! and is the only place that talks to the token endpoint.
//!
//! ## Example: Authorization and Refresh
//!
//! ```rust,ignore
//! use entrant_gateway_auth::*;
//!
//! let provider = providers::EventixOAuthProvider::new(&config)?;
//! let store = TokenStore::new(provider, SystemClock)
//!     .with_timeout(config.timeout)
//!     .with_refresh_margin(config.refresh_margin);
//!
//! // 1. Send the operator to the platform
//! let url = store.begin_authorization().await;
//!
//! // 2. Handle the callback
//! store.complete_authorization(&code, &state).await?;
//!
//! // 3. Every sync pass asks for a valid token
//! let bearer = store.get_valid_token().await?;
//! ```

#![deny(missing_docs)]

// Public modules
pub mod config;
pub mod error;
pub mod providers;
pub mod store;
pub mod token;

/// Mock implementations for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::OAuthConfig;
pub use error::{AuthError, Result};
pub use providers::{EventixOAuthProvider, OAuth2Provider};
pub use store::TokenStore;
pub use token::{OAuthTokenResponse, Token};
