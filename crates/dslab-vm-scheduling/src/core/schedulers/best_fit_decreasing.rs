//! Best Fit Decreasing scheduler.

use crate::core::action::Action;
use crate::core::common::AllocationVerdict;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{Scheduler, SchedulingInput};
use crate::core::schedulers::propose;
use crate::core::vm::VirtualMachine;
use crate::log_debug;

/// Places pending VMs in decreasing order of their demand, each on the suitable host with the smallest
/// remaining capacity.
///
/// VMs are ordered by primary resource demand (descending), then by secondary resource demand (descending),
/// then by ID. Remaining capacities are compared lexicographically in the resource declaration order,
/// ties are resolved in favor of the host with the lower ID. The resource order is taken from the capacity
/// of the first host.
#[derive(Default)]
pub struct BestFitDecreasing;

impl BestFitDecreasing {
    pub fn new() -> Self {
        Self {}
    }
}

/// Sorts VMs by descending primary and secondary demands, ties are resolved by ID.
pub fn sort_decreasing(vms: &mut [VirtualMachine], resources: &[String]) {
    let primary = resources.first().map(|s| s.as_str()).unwrap_or("");
    let secondary = resources.get(1).map(|s| s.as_str()).unwrap_or("");
    vms.sort_by(|a, b| {
        b.demand
            .get(primary)
            .cmp(&a.demand.get(primary))
            .then(b.demand.get(secondary).cmp(&a.demand.get(secondary)))
            .then(a.id.cmp(&b.id))
    });
}

impl Scheduler for BestFitDecreasing {
    fn reevaluate(&mut self, input: &SchedulingInput) -> Result<Schedule, SimulationError> {
        let mut sandbox = input.state.snapshot();
        let mut schedule = Schedule::new();
        let resources: Vec<String> = match sandbox.hosts().next() {
            Some((_, host)) => host.capacity.names().map(|s| s.to_string()).collect(),
            None => return Ok(schedule),
        };
        let mut pending: Vec<VirtualMachine> = input.state.pending_vms().into_iter().cloned().collect();
        sort_decreasing(&mut pending, &resources);

        for vm in pending {
            let mut best: Option<(Vec<u64>, u32)> = None;
            for (host_id, host) in sandbox.hosts() {
                if sandbox.can_allocate(&vm.demand, host_id) != AllocationVerdict::Success {
                    continue;
                }
                let remaining = host.available.ordered_by(&resources);
                if best.as_ref().map_or(true, |(best_remaining, _)| remaining < *best_remaining) {
                    best = Some((remaining, host_id));
                }
            }
            match best {
                Some((_, host)) => {
                    log_debug!(input.ctx, "placing vm {} on host {}", vm.id, host);
                    propose(&mut sandbox, &mut schedule, Action::Migrate { vm_id: vm.id, host }, input.time)?;
                }
                None => log_debug!(input.ctx, "no suitable host for vm {}", vm.id),
            }
        }
        Ok(schedule)
    }

    fn name(&self) -> String {
        "BestFitDecreasing".to_string()
    }
}
