//! HTTP request handlers.

pub mod health;
pub mod oauth;
pub mod sync;

pub use health::{health_check, render_metrics};
pub use oauth::{authorize, callback};
pub use sync::{order_paid, run_sync};
