//! Threshold-based pausing of VMs during signal peaks.

use std::collections::HashMap;

use crate::core::action::Action;
use crate::core::common::AllocationVerdict;
use crate::core::config::options::parse_option;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{Scheduler, SchedulingInput};
use crate::core::schedulers::propose;
use crate::{log_debug, log_info};

/// Signal watched by [`PeakPauser`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeakSignal {
    Price,
    Temperature,
}

/// Pauses all allocated VMs while the watched signal is above the threshold and unpauses them once the signal
/// drops back. Unpaused VMs return to their last host if it still has room, otherwise to the first suitable host.
pub struct PeakPauser {
    signal: PeakSignal,
    threshold: f64,
    location: Option<String>,
}

impl PeakPauser {
    pub fn new(signal: PeakSignal, threshold: f64, location: Option<String>) -> Self {
        Self {
            signal,
            threshold,
            location,
        }
    }

    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, SimulationError> {
        let signal = match options.get("signal").map(|s| s.as_str()) {
            None | Some("price") => PeakSignal::Price,
            Some("temperature") => PeakSignal::Temperature,
            Some(other) => return Err(SimulationError::Config(format!("unknown peak signal: {}", other))),
        };
        let threshold = parse_option::<f64>(options, "threshold")?
            .ok_or_else(|| SimulationError::Config("PeakPauser requires threshold option".to_string()))?;
        Ok(Self::new(signal, threshold, options.get("location").cloned()))
    }
}

impl Scheduler for PeakPauser {
    fn reevaluate(&mut self, input: &SchedulingInput) -> Result<Schedule, SimulationError> {
        let mut schedule = Schedule::new();
        let series = match self.signal {
            PeakSignal::Price => &input.known.el_prices,
            PeakSignal::Temperature => &input.known.temperature,
        };
        let value = match series.value_at(self.location.as_deref(), input.time) {
            Some(value) => value,
            None => return Ok(schedule),
        };
        let mut sandbox = input.state.snapshot();

        if value > self.threshold {
            let allocated: Vec<u32> = input
                .state
                .running_vms()
                .iter()
                .filter(|vm| input.state.host_of(vm.id).is_some())
                .map(|vm| vm.id)
                .collect();
            if !allocated.is_empty() {
                log_info!(input.ctx, "signal {} above threshold, pausing {} vms", value, allocated.len());
            }
            for vm_id in allocated {
                propose(&mut sandbox, &mut schedule, Action::Pause { vm_id }, input.time)?;
            }
        } else {
            let paused: Vec<_> = input.state.paused_vms().into_iter().cloned().collect();
            for vm in paused {
                let host = vm
                    .last_host
                    .filter(|host| sandbox.can_allocate(&vm.demand, *host) == AllocationVerdict::Success)
                    .or_else(|| {
                        sandbox
                            .host_ids()
                            .into_iter()
                            .find(|host| sandbox.can_allocate(&vm.demand, *host) == AllocationVerdict::Success)
                    });
                match host {
                    Some(host) => {
                        let action = Action::Unpause {
                            vm_id: vm.id,
                            host: Some(host),
                        };
                        propose(&mut sandbox, &mut schedule, action, input.time)?;
                    }
                    None => log_debug!(input.ctx, "no room to unpause vm {}", vm.id),
                }
            }
        }
        Ok(schedule)
    }

    fn name(&self) -> String {
        "PeakPauser".to_string()
    }
}
