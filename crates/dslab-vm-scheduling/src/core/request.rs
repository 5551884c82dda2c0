//! Workload requests.

use serde::{Deserialize, Serialize};

use crate::core::action::Action;
use crate::core::vm::VirtualMachine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Boot,
    Shutdown,
}

/// Request to boot or shut down a VM at the specified time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VmRequest {
    pub time: f64,
    pub kind: RequestKind,
    pub vm: VirtualMachine,
}

impl VmRequest {
    pub fn boot(time: f64, vm: VirtualMachine) -> Self {
        Self {
            time,
            kind: RequestKind::Boot,
            vm,
        }
    }

    pub fn shutdown(time: f64, vm: VirtualMachine) -> Self {
        Self {
            time,
            kind: RequestKind::Shutdown,
            vm,
        }
    }

    /// Converts request to the corresponding action. Booted VMs are left pending.
    pub fn to_action(&self) -> Action {
        match self.kind {
            RequestKind::Boot => Action::Boot {
                vm: self.vm.clone(),
                host: None,
            },
            RequestKind::Shutdown => Action::Shutdown { vm_id: self.vm.id },
        }
    }
}
