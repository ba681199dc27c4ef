//! Application state for Axum handlers.

use entrant_gateway_auth::TokenStore;
use entrant_gateway_core::SystemClock;
use entrant_gateway_runtime::SyncHandle;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// State shared by every handler.
///
/// `R` runs manual sync passes, the token store completes authorizations and
/// the trigger handle enqueues passes that should not block the request.
pub struct AppState<R, P, C = SystemClock> {
    pub(crate) runner: Arc<R>,
    pub(crate) tokens: Arc<TokenStore<P, C>>,
    pub(crate) triggers: SyncHandle,
    pub(crate) metrics: Option<PrometheusHandle>,
}

impl<R, P, C> AppState<R, P, C> {
    /// Create handler state. `/metrics` answers 404 until
    /// [`with_metrics`](Self::with_metrics) is called.
    #[must_use]
    pub const fn new(runner: Arc<R>, tokens: Arc<TokenStore<P, C>>, triggers: SyncHandle) -> Self {
        Self {
            runner,
            tokens,
            triggers,
            metrics: None,
        }
    }

    /// Render this recorder at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl<R, P, C> Clone for AppState<R, P, C> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            tokens: Arc::clone(&self.tokens),
            triggers: self.triggers.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
