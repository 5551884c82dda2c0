//! Scheduling policies interface.

use crate::core::cloud_state::CloudState;
use crate::core::config::options::{parse_config_value, parse_options};
use crate::core::context::SimulationContext;
use crate::core::environment::KnownData;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::schedulers::best_fit_decreasing::BestFitDecreasing;
use crate::core::schedulers::brute_force::BruteForce;
use crate::core::schedulers::first_fit::FirstFit;
use crate::core::schedulers::model_based::ModelBased;
use crate::core::schedulers::no_scheduler::NoScheduler;
use crate::core::schedulers::peak_pauser::PeakPauser;

/// Everything a scheduler can see on a scheduling pass.
pub struct SchedulingInput<'a> {
    /// Context for logging.
    pub ctx: &'a SimulationContext,
    /// Current simulation time.
    pub time: f64,
    /// Step duration. Actions planned for `[time, time + period)` are committed on this step.
    pub period: f64,
    /// Sandbox copy of the committed cloud state.
    pub state: &'a CloudState,
    /// Signals known at the current time, including forecasts.
    pub known: &'a KnownData,
}

/// Trait for implementation of scheduling policies.
///
/// On each simulation step the scheduler is given a read-only copy of the committed state and returns proposed
/// actions. The simulation validates the proposed actions against the committed state and drops invalid ones,
/// so a scheduler can never break the capacity invariant.
pub trait Scheduler {
    /// Called once before the simulation run.
    fn initialize(&mut self) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Called on each simulation step, returns the proposed actions.
    fn reevaluate(&mut self, input: &SchedulingInput) -> Result<Schedule, SimulationError>;

    /// Called once after the simulation run.
    fn finalize(&mut self) {}

    fn name(&self) -> String;
}

/// Creates scheduler from config string such as `BruteForce[max_vms=6,objective=active_pms]`.
pub fn scheduler_resolver(config_str: &str) -> Result<Box<dyn Scheduler>, SimulationError> {
    let (name, options) = parse_config_value(config_str);
    let options = options.map(|s| parse_options(&s)).unwrap_or_default();
    match name.as_str() {
        "NoScheduler" => Ok(Box::new(NoScheduler::new())),
        "PeakPauser" => Ok(Box::new(PeakPauser::from_options(&options)?)),
        "FirstFit" | "FBF" => Ok(Box::new(FirstFit::new())),
        "BestFitDecreasing" | "BFD" => Ok(Box::new(BestFitDecreasing::new())),
        "BruteForce" => Ok(Box::new(BruteForce::from_options(&options)?)),
        "ModelBased" => Ok(Box::new(ModelBased::from_options(&options)?)),
        _ => Err(SimulationError::Config(format!("can't resolve scheduler: {}", config_str))),
    }
}
