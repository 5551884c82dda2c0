//! Scheduling policies.

pub mod best_fit_decreasing;
pub mod brute_force;
pub mod first_fit;
pub mod model_based;
pub mod no_scheduler;
pub mod peak_pauser;

use crate::core::action::Action;
use crate::core::cloud_state::CloudState;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;

/// Applies action to the local sandbox and appends it to the schedule,
/// so that later decisions of the same pass see its effect.
pub(crate) fn propose(
    sandbox: &mut CloudState,
    schedule: &mut Schedule,
    action: Action,
    time: f64,
) -> Result<(), SimulationError> {
    action.apply(sandbox)?;
    schedule.add(action, time)
}
