//! OAuth2 providers.
//!
//! The token store depends on the [`OAuth2Provider`] trait; the runtime
//! provides [`EventixOAuthProvider`] and tests use the mock in
//! [`crate::mocks`].

pub mod eventix;
pub mod oauth;

pub use eventix::EventixOAuthProvider;
pub use oauth::OAuth2Provider;
