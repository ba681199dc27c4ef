//! Trigger channel, trigger loop and scheduler.
//!
//! Every trigger source (scheduler, HTTP handlers, authorization callback)
//! holds a [`SyncHandle`]. The trigger loop runs each pass on its own task,
//! so a trigger arriving while a pass is running starts a pass that is
//! rejected by the reconciliation guard instead of waiting behind it.

use crate::orchestrator::SyncRunner;
use crate::report::SyncTrigger;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Capacity of the trigger channel.
pub const TRIGGER_CAPACITY: usize = 32;

/// Errors from submitting a trigger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// The trigger loop has stopped.
    #[error("sync trigger loop is not running")]
    Closed,

    /// Too many triggers are waiting to be picked up.
    #[error("too many pending sync triggers")]
    Busy,
}

/// Sending side of the trigger channel.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    sender: mpsc::Sender<SyncTrigger>,
}

impl SyncHandle {
    /// Create a handle and the receiver to pass to [`run_trigger_loop`].
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<SyncTrigger>) {
        let (sender, receiver) = mpsc::channel(TRIGGER_CAPACITY);
        (Self { sender }, receiver)
    }

    /// Request a sync pass without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Closed`] if the loop stopped, or
    /// [`TriggerError::Busy`] if the channel is full.
    pub fn trigger(&self, trigger: SyncTrigger) -> Result<(), TriggerError> {
        self.sender.try_send(trigger).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TriggerError::Busy,
            mpsc::error::TrySendError::Closed(_) => TriggerError::Closed,
        })
    }
}

/// Consume triggers until shutdown, running each pass on its own task.
///
/// On shutdown the loop stops taking triggers and waits for the passes
/// already started; those observe the shutdown signal before committing.
pub fn run_trigger_loop<R: SyncRunner>(
    runner: Arc<R>,
    mut triggers: mpsc::Receiver<SyncTrigger>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut passes = JoinSet::new();
        loop {
            tokio::select! {
                trigger = triggers.recv() => {
                    let Some(trigger) = trigger else { break };
                    debug!(trigger = trigger.label(), "Sync triggered");
                    let runner = Arc::clone(&runner);
                    passes.spawn(async move { runner.run_sync(trigger).await });
                }
                Some(finished) = passes.join_next(), if !passes.is_empty() => {
                    if let Err(e) = finished {
                        warn!(error = %e, "Sync pass task failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(running = passes.len(), "Trigger loop stopping");
        while let Some(finished) = passes.join_next().await {
            if let Err(e) = finished {
                warn!(error = %e, "Sync pass task failed");
            }
        }
    })
}

/// Emit [`SyncTrigger::Scheduled`] every `period`, starting immediately.
pub fn spawn_scheduler(
    handle: SyncHandle,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match handle.trigger(SyncTrigger::Scheduled) {
                        Ok(()) => {}
                        Err(TriggerError::Closed) => break,
                        Err(e) => warn!(error = %e, "Scheduled sync skipped"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Scheduler stopped");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::report::{SyncOutcome, SyncReport};
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records triggers and returns an unchanged report after a delay.
    #[derive(Default)]
    struct RecordingRunner {
        seen: Mutex<Vec<SyncTrigger>>,
        delay: Duration,
    }

    impl SyncRunner for RecordingRunner {
        async fn run_sync(&self, trigger: SyncTrigger) -> SyncReport {
            self.seen.lock().unwrap().push(trigger.clone());
            tokio::time::sleep(self.delay).await;
            let mut report = SyncReport::started("E1".into(), trigger, Utc::now());
            report.outcome = SyncOutcome::Unchanged;
            report
        }
    }

    #[tokio::test]
    async fn test_handle_reports_closed_loop() {
        let (handle, receiver) = SyncHandle::channel();
        drop(receiver);
        assert_eq!(handle.trigger(SyncTrigger::Manual), Err(TriggerError::Closed));
    }

    #[tokio::test]
    async fn test_handle_reports_full_channel() {
        let (handle, _receiver) = SyncHandle::channel();
        for _ in 0..TRIGGER_CAPACITY {
            handle.trigger(SyncTrigger::Manual).unwrap();
        }
        assert_eq!(handle.trigger(SyncTrigger::Manual), Err(TriggerError::Busy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_triggers_and_drains_on_shutdown() {
        let runner = Arc::new(RecordingRunner {
            delay: Duration::from_secs(1),
            ..RecordingRunner::default()
        });
        let (handle, receiver) = SyncHandle::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = run_trigger_loop(Arc::clone(&runner), receiver, shutdown_rx);

        handle.trigger(SyncTrigger::Manual).unwrap();
        handle
            .trigger(SyncTrigger::OrderPaid {
                order_id: "O1".into(),
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let seen = runner.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], SyncTrigger::Manual);
        assert_eq!(handle.trigger(SyncTrigger::Manual), Err(TriggerError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_immediately_and_periodically() {
        let (handle, mut receiver) = SyncHandle::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = spawn_scheduler(handle, Duration::from_secs(60), shutdown_rx);

        assert_eq!(receiver.recv().await, Some(SyncTrigger::Scheduled));
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(receiver.recv().await, Some(SyncTrigger::Scheduled));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
