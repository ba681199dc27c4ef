//! # Entrant Gateway Runtime
//!
//! Runs sync passes against the collaborators defined in
//! `entrant-gateway-core`.
//!
//! ## Core Components
//!
//! - **Orchestrator**: one pass is token → fetch → project → reconcile →
//!   commit, guarded so at most one pass reconciles at a time
//! - **Triggers**: an mpsc channel fed by the scheduler, the HTTP surface and
//!   the authorization callback; each trigger runs a pass on its own task
//! - **Retry**: bounded exponential backoff for roster conflicts
//! - **Metrics**: Prometheus counters and histograms for every pass
//!
//! ## Example
//!
//! ```ignore
//! use entrant_gateway_runtime::{OrchestratorConfig, SyncHandle, SyncOrchestrator, SyncTrigger};
//!
//! let orchestrator = Arc::new(
//!     SyncOrchestrator::new(config, tokens, source, store, projector, mapping, SystemClock)
//!         .with_shutdown(shutdown_rx.clone()),
//! );
//! let (handle, triggers) = SyncHandle::channel();
//! let trigger_loop = run_trigger_loop(Arc::clone(&orchestrator), triggers, shutdown_rx);
//!
//! handle.trigger(SyncTrigger::Manual)?;
//! ```

/// Prometheus metrics for observability
pub mod metrics;

/// Sync pass orchestration
pub mod orchestrator;

/// Sync reports, triggers and errors
pub mod report;

/// Retry logic with exponential backoff
pub mod retry;

/// Trigger channel, trigger loop and scheduler
pub mod trigger;

pub use orchestrator::{OrchestratorConfig, SyncOrchestrator, SyncRunner};
pub use report::{SyncError, SyncOutcome, SyncReport, SyncTrigger};
pub use retry::RetryPolicy;
pub use trigger::{SyncHandle, TriggerError, run_trigger_loop, spawn_scheduler};
