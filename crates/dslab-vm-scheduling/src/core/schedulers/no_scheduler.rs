//! Baseline scheduler.

use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{Scheduler, SchedulingInput};

/// Never proposes any actions. Booted VMs stay pending.
#[derive(Default)]
pub struct NoScheduler;

impl NoScheduler {
    pub fn new() -> Self {
        Self {}
    }
}

impl Scheduler for NoScheduler {
    fn reevaluate(&mut self, _input: &SchedulingInput) -> Result<Schedule, SimulationError> {
        Ok(Schedule::new())
    }

    fn name(&self) -> String {
        "NoScheduler".to_string()
    }
}
