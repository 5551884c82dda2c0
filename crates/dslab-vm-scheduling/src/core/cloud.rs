//! Named cloud states: initial, real (committed) and sandbox.

use crate::core::action::Action;
use crate::core::cloud_state::CloudState;
use crate::core::error::ActionError;
use crate::core::schedule::{Schedule, ScheduledAction};

/// Action dropped during commit together with the reason.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedAction {
    pub time: f64,
    pub action: Action,
    pub reason: ActionError,
}

/// Outcome of committing a schedule to the real state.
#[derive(Clone, Debug, Default)]
pub struct CommitOutcome {
    pub committed: Schedule,
    pub rejected: Vec<RejectedAction>,
}

/// Holds the initial state, the real (committed) state and an optional sandbox.
///
/// Schedulers reason on the sandbox, which is a disposable copy of the real state.
/// Only the simulation loop changes the real state, via `apply_real` and `commit`.
pub struct Cloud {
    initial: CloudState,
    real: CloudState,
    sandbox: Option<CloudState>,
}

impl Cloud {
    pub fn new(initial: CloudState) -> Self {
        Self {
            real: initial.snapshot(),
            initial,
            sandbox: None,
        }
    }

    pub fn initial(&self) -> &CloudState {
        &self.initial
    }

    pub fn real(&self) -> &CloudState {
        &self.real
    }

    /// Resets the sandbox to a copy of the real state and returns it.
    pub fn prepare_sandbox(&mut self) -> &CloudState {
        self.sandbox.insert(self.real.snapshot())
    }

    pub fn sandbox(&self) -> Option<&CloudState> {
        self.sandbox.as_ref()
    }

    pub fn discard_sandbox(&mut self) {
        self.sandbox = None;
    }

    /// Drops the sandbox changes by resetting it to the real state.
    pub fn reset_to_real(&mut self) {
        self.sandbox = Some(self.real.snapshot());
    }

    /// Restores the real state from the initial baseline.
    pub fn reset_to_initial(&mut self) {
        self.real = self.initial.snapshot();
        self.sandbox = None;
    }

    /// Validates and applies action to the real state.
    pub fn apply_real(&mut self, action: &Action) -> Result<(), ActionError> {
        action.apply(&mut self.real)
    }

    /// Applies the schedule to the real state in order. Invalid actions are skipped and reported as rejected.
    pub fn commit(&mut self, schedule: &Schedule) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();
        for item in schedule {
            match item.action.apply(&mut self.real) {
                Ok(()) => outcome.committed.push_ordered(ScheduledAction {
                    time: item.time,
                    action: item.action.clone(),
                }),
                Err(reason) => outcome.rejected.push(RejectedAction {
                    time: item.time,
                    action: item.action.clone(),
                    reason,
                }),
            }
        }
        self.sandbox = None;
        outcome
    }
}
