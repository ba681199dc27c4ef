//! HTTP surface of the entrant gateway.
//!
//! A thin axum layer over the token store and the sync runtime: every
//! handler either forwards to [`TokenStore`](entrant_gateway_auth::TokenStore),
//! runs a pass, or enqueues a trigger.
//!
//! # Example
//!
//! ```ignore
//! use entrant_gateway_web::{AppState, router};
//!
//! let state = AppState::new(orchestrator, tokens, handle).with_metrics(prometheus);
//! let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
//! axum::serve(listener, router(state))
//!     .with_graceful_shutdown(shutdown_signal())
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
