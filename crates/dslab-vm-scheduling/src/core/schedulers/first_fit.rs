//! First Fit scheduler.

use crate::core::action::Action;
use crate::core::common::AllocationVerdict;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{Scheduler, SchedulingInput};
use crate::core::schedulers::propose;
use crate::log_debug;

/// Places each pending VM, in arrival order, on the first host (by ID) with enough available resources.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Scheduler for FirstFit {
    fn reevaluate(&mut self, input: &SchedulingInput) -> Result<Schedule, SimulationError> {
        let mut sandbox = input.state.snapshot();
        let mut schedule = Schedule::new();
        let pending: Vec<_> = input.state.pending_vms().into_iter().cloned().collect();
        for vm in pending {
            let host = sandbox
                .host_ids()
                .into_iter()
                .find(|host| sandbox.can_allocate(&vm.demand, *host) == AllocationVerdict::Success);
            match host {
                Some(host) => {
                    log_debug!(input.ctx, "placing vm {} on host {}", vm.id, host);
                    propose(&mut sandbox, &mut schedule, Action::Migrate { vm_id: vm.id, host }, input.time)?;
                }
                None => log_debug!(input.ctx, "no suitable host for vm {}", vm.id),
            }
        }
        Ok(schedule)
    }

    fn name(&self) -> String {
        "FirstFit".to_string()
    }
}
