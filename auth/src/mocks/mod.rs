//! Mock provider implementations for testing.

pub mod oauth;

pub use oauth::MockOAuth2Provider;
