//! The sync pass: token, fetch, project, reconcile, commit.
//!
//! A pass never commits a partial ticket set. Every failure before the
//! commit leaves the roster untouched, and at most one pass holds the
//! reconciliation guard at a time. A pass that finds the guard taken returns
//! at once with [`SyncError::SyncInProgress`] instead of queuing.

use crate::metrics::SyncMetrics;
use crate::report::{SyncError, SyncOutcome, SyncReport, SyncTrigger};
use crate::retry::{RetryPolicy, retry_with_predicate};
use entrant_gateway_auth::{AuthError, OAuth2Provider, TokenStore};
use entrant_gateway_core::{
    CarMapping, Clock, EntrantProjector, EventId, Exclusion, Projection, Reconciliation,
    RosterStore, SystemClock, Ticket, TicketSource, reconcile,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

/// Anything that can run a sync pass.
pub trait SyncRunner: Send + Sync + 'static {
    /// Run one pass and report what happened. Never fails; failures are
    /// carried in the report's outcome.
    fn run_sync(&self, trigger: SyncTrigger) -> impl Future<Output = SyncReport> + Send;
}

impl<R: SyncRunner> SyncRunner for Arc<R> {
    fn run_sync(&self, trigger: SyncTrigger) -> impl Future<Output = SyncReport> + Send {
        (**self).run_sync(trigger)
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Event to sync.
    pub event_id: EventId,
    /// Backoff for commits that lose a race against another writer.
    pub retry: RetryPolicy,
}

impl OrchestratorConfig {
    /// Settings for `event_id` with the default retry policy.
    #[must_use]
    pub fn new(event_id: impl Into<EventId>) -> Self {
        Self {
            event_id: event_id.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the commit retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// The stages of a pass, all behind their seams.
pub struct SyncOrchestrator<P, T, S, C = SystemClock> {
    config: OrchestratorConfig,
    tokens: Arc<TokenStore<P, C>>,
    source: T,
    store: S,
    projector: EntrantProjector,
    mapping: CarMapping,
    clock: C,
    guard: Mutex<()>,
    shutdown: Option<watch::Receiver<bool>>,
}

/// A reconciliation and whether it was written.
struct Applied {
    reconciliation: Reconciliation,
    committed: bool,
}

impl<P, T, S, C> SyncOrchestrator<P, T, S, C>
where
    P: OAuth2Provider,
    T: TicketSource,
    S: RosterStore,
    C: Clock + Clone,
{
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        config: OrchestratorConfig,
        tokens: Arc<TokenStore<P, C>>,
        source: T,
        store: S,
        projector: EntrantProjector,
        mapping: CarMapping,
        clock: C,
    ) -> Self {
        Self {
            config,
            tokens,
            source,
            store,
            projector,
            mapping,
            clock,
            guard: Mutex::new(()),
            shutdown: None,
        }
    }

    /// Abandon passes before they commit once `shutdown` turns `true`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// The event this orchestrator syncs.
    #[must_use]
    pub const fn event_id(&self) -> &EventId {
        &self.config.event_id
    }

    /// Run one sync pass.
    pub async fn run(&self, trigger: SyncTrigger) -> SyncReport {
        let timer = Instant::now();
        let mut report = SyncReport::started(self.config.event_id.clone(), trigger, self.clock.now());

        report.outcome = match self.guard.try_lock() {
            Err(_) => {
                warn!(event_id = %report.event_id, trigger = report.trigger.label(), "Sync pass already running");
                SyncOutcome::Failed(SyncError::SyncInProgress)
            }
            Ok(_guard) => {
                info!(event_id = %report.event_id, trigger = report.trigger.label(), "Sync pass started");
                match self.pass(&mut report).await {
                    Ok(outcome) => outcome,
                    Err(error) => SyncOutcome::Failed(error),
                }
            }
        };
        report.finished_at = self.clock.now();

        SyncMetrics::record_pass(report.outcome.label(), timer.elapsed());
        match &report.outcome {
            SyncOutcome::Failed(SyncError::SyncInProgress) => {}
            SyncOutcome::Failed(error) => {
                error!(event_id = %report.event_id, error = %error, "Sync pass failed");
            }
            outcome => info!(
                event_id = %report.event_id,
                outcome = outcome.label(),
                added = report.added.len(),
                updated = report.updated.len(),
                removed = report.removed.len() + report.repaired.len(),
                unchanged = report.unchanged,
                held = report.held.len(),
                excluded = report.excluded.len(),
                "Sync pass finished"
            ),
        }
        report
    }

    async fn pass(&self, report: &mut SyncReport) -> Result<SyncOutcome, SyncError> {
        let tickets = self.fetch().await?;
        self.ensure_running()?;

        self.log_incomplete(&tickets);
        let projection = self.projector.project_all(&tickets, &self.mapping);
        debug!(
            tickets = tickets.len(),
            entrants = projection.entrants.len(),
            cancelled = projection.cancelled,
            held = projection.held.len(),
            "Projected tickets"
        );

        let applied = retry_with_predicate(
            self.config.retry.clone(),
            || self.apply(&projection),
            |error: &SyncError| matches!(error, SyncError::Roster(e) if e.is_retryable()),
        )
        .await?;

        fill_report(report, &projection, applied.reconciliation);
        SyncMetrics::record_exclusions(&report.excluded);

        if applied.committed {
            Ok(SyncOutcome::Committed)
        } else {
            Ok(SyncOutcome::Unchanged)
        }
    }

    /// Fetch the full ticket set, refreshing the token once if the platform
    /// rejects it.
    async fn fetch(&self) -> Result<Vec<Ticket>, SyncError> {
        let event_id = &self.config.event_id;
        let token = self.tokens.get_valid_token().await?;

        match self.source.fetch_tickets(event_id, &token).await {
            Err(e) if e.is_auth_failure() => {
                warn!(%event_id, "Access token rejected, forcing refresh");
                let fresh = self.tokens.force_refresh(&token).await?;
                self.source.fetch_tickets(event_id, &fresh).await.map_err(|e| {
                    if e.is_auth_failure() {
                        SyncError::Auth(AuthError::TokenRejected)
                    } else {
                        SyncError::Remote(e)
                    }
                })
            }
            result => result.map_err(SyncError::Remote),
        }
    }

    /// Load, reconcile and, if anything changed, commit.
    async fn apply(&self, projection: &Projection) -> Result<Applied, SyncError> {
        let snapshot = self.store.load().await?;
        let reconciliation = reconcile(&snapshot.roster, &projection.entrants, &projection.held);

        if reconciliation.diff.is_empty() {
            debug!("Roster already up to date");
            return Ok(Applied {
                reconciliation,
                committed: false,
            });
        }

        self.ensure_running()?;
        self.store.commit(snapshot.revision, &reconciliation.roster).await?;
        SyncMetrics::record_diff(&reconciliation.diff);
        Ok(Applied {
            reconciliation,
            committed: true,
        })
    }

    fn ensure_running(&self) -> Result<(), SyncError> {
        if self.shutdown.as_ref().is_some_and(|shutdown| *shutdown.borrow()) {
            warn!(event_id = %self.config.event_id, "Shutdown requested, abandoning sync pass");
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    fn log_incomplete(&self, tickets: &[Ticket]) {
        for ticket in tickets.iter().filter(|ticket| ticket.is_live()) {
            if let Some(flag) = ticket.incomplete(self.projector.field_ids()) {
                warn!(
                    ticket_id = %ticket.ticket_id,
                    order_id = %ticket.order_id,
                    missing = ?flag.missing,
                    "Ticket is missing metadata"
                );
            }
        }
    }
}

fn fill_report(report: &mut SyncReport, projection: &Projection, reconciliation: Reconciliation) {
    let diff = reconciliation.diff;
    report.added = diff.added;
    report.updated = diff.updated;
    report.removed = diff.removed;
    report.repaired = diff.repaired;
    report.unchanged = diff.unchanged;

    let mut held: Vec<_> = projection.held.iter().cloned().chain(reconciliation.held).collect();
    held.sort();
    held.dedup();
    report.held = held;

    let mut excluded: Vec<Exclusion> = projection
        .excluded
        .iter()
        .cloned()
        .chain(reconciliation.excluded)
        .collect();
    excluded.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));
    report.excluded = excluded;
}

impl<P, T, S, C> SyncRunner for SyncOrchestrator<P, T, S, C>
where
    P: OAuth2Provider + 'static,
    T: TicketSource + 'static,
    S: RosterStore + 'static,
    C: Clock + Clone + 'static,
{
    async fn run_sync(&self, trigger: SyncTrigger) -> SyncReport {
        self.run(trigger).await
    }
}
