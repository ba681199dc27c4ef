//! In-memory roster store with fault injection.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use entrant_gateway_core::{Roster, RosterError, RosterRevision, RosterSnapshot, RosterStore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
enum Fault {
    Fail(RosterError),
    Interrupt,
    ConcurrentWrite,
}

#[derive(Debug)]
struct State {
    roster: Roster,
    revision: u128,
    history: Vec<Roster>,
    attempts: usize,
    faults: VecDeque<Fault>,
}

/// In-memory roster storage for fast, deterministic testing.
///
/// Commits are all-or-nothing, like the file store. Faults queued with
/// [`fail_next_commit`](Self::fail_next_commit),
/// [`interrupt_next_commit`](Self::interrupt_next_commit) and
/// [`conflict_next_commit`](Self::conflict_next_commit) are consumed one per
/// commit attempt. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryRosterStore {
    state: Arc<Mutex<State>>,
    commit_delay: Duration,
}

impl InMemoryRosterStore {
    /// Create a store holding `roster` at revision 1.
    #[must_use]
    pub fn new(roster: Roster) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                roster,
                revision: 1,
                history: Vec::new(),
                attempts: 0,
                faults: VecDeque::new(),
            })),
            commit_delay: Duration::ZERO,
        }
    }

    /// Delay every commit, to widen race windows in concurrency tests.
    #[must_use]
    pub const fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// The currently stored roster.
    #[must_use]
    pub fn roster(&self) -> Roster {
        self.state.lock().unwrap().roster.clone()
    }

    /// The current revision.
    #[must_use]
    pub fn revision(&self) -> RosterRevision {
        RosterRevision(self.state.lock().unwrap().revision)
    }

    /// Number of successful commits.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    /// Number of commit attempts, failed ones included.
    #[must_use]
    pub fn commit_attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    /// Every roster committed so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Roster> {
        self.state.lock().unwrap().history.clone()
    }

    /// Make the next commit fail with `error`.
    pub fn fail_next_commit(&self, error: RosterError) {
        self.state.lock().unwrap().faults.push_back(Fault::Fail(error));
    }

    /// Make the next commit die mid-write. Nothing is persisted.
    pub fn interrupt_next_commit(&self) {
        self.state.lock().unwrap().faults.push_back(Fault::Interrupt);
    }

    /// Simulate another writer touching the roster right before the next
    /// commit.
    pub fn conflict_next_commit(&self) {
        self.state.lock().unwrap().faults.push_back(Fault::ConcurrentWrite);
    }

    /// Modify the stored roster as an external writer would.
    pub fn external_write(&self, change: impl FnOnce(&mut Roster)) {
        let mut state = self.state.lock().unwrap();
        change(&mut state.roster);
        state.revision += 1;
    }
}

impl RosterStore for InMemoryRosterStore {
    async fn load(&self) -> Result<RosterSnapshot, RosterError> {
        let state = self.state.lock().unwrap();
        Ok(RosterSnapshot {
            roster: state.roster.clone(),
            revision: RosterRevision(state.revision),
        })
    }

    async fn commit(&self, base: RosterRevision, roster: &Roster) -> Result<RosterRevision, RosterError> {
        if !self.commit_delay.is_zero() {
            tokio::time::sleep(self.commit_delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.attempts += 1;

        match state.faults.pop_front() {
            Some(Fault::Fail(error)) => return Err(error),
            Some(Fault::Interrupt) => {
                return Err(RosterError::Io("write interrupted".to_string()));
            }
            Some(Fault::ConcurrentWrite) => state.revision += 1,
            None => {}
        }

        if RosterRevision(state.revision) != base {
            return Err(RosterError::ConcurrentModification);
        }
        if let Some((address, _)) = roster.slots().find(|(address, _)| !state.roster.has_slot(address)) {
            return Err(RosterError::UnknownSlot(address.clone()));
        }

        state.roster = roster.clone();
        state.revision += 1;
        state.history.push(roster.clone());
        Ok(RosterRevision(state.revision))
    }
}
