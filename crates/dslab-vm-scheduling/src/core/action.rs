//! Infrastructure actions.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::cloud_state::CloudState;
use crate::core::error::{ActionError, Entity};
use crate::core::vm::{VirtualMachine, VmStatus};

/// Action changing the state of the cloud.
///
/// VM lifecycle is `Requested -> Running <-> Paused -> Terminated`, migration is only possible for running VMs.
/// Migration of a pending (running but not allocated) VM is its initial placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    Boot { vm: VirtualMachine, host: Option<u32> },
    Shutdown { vm_id: u32 },
    Pause { vm_id: u32 },
    Unpause { vm_id: u32, host: Option<u32> },
    Migrate { vm_id: u32, host: u32 },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Boot { .. } => "boot",
            Action::Shutdown { .. } => "shutdown",
            Action::Pause { .. } => "pause",
            Action::Unpause { .. } => "unpause",
            Action::Migrate { .. } => "migrate",
        }
    }

    pub fn vm_id(&self) -> u32 {
        match self {
            Action::Boot { vm, .. } => vm.id,
            Action::Shutdown { vm_id }
            | Action::Pause { vm_id }
            | Action::Unpause { vm_id, .. }
            | Action::Migrate { vm_id, .. } => *vm_id,
        }
    }

    /// Host explicitly targeted by the action, if any.
    pub fn target_host(&self) -> Option<u32> {
        match self {
            Action::Boot { host, .. } | Action::Unpause { host, .. } => *host,
            Action::Migrate { host, .. } => Some(*host),
            Action::Shutdown { .. } | Action::Pause { .. } => None,
        }
    }

    /// Checks action preconditions against the state without changing it.
    pub fn validate(&self, state: &CloudState) -> Result<(), ActionError> {
        match self {
            Action::Boot { vm, host } => {
                if state.contains_vm(vm.id) || state.is_terminated(vm.id) {
                    return Err(ActionError::InvalidTransition {
                        vm_id: vm.id,
                        reason: "vm is already booted".to_string(),
                    });
                }
                if let Some(host_id) = host {
                    state.available(*host_id)?;
                }
                Ok(())
            }
            Action::Shutdown { vm_id } => {
                if state.contains_vm(*vm_id) {
                    Ok(())
                } else if state.is_terminated(*vm_id) {
                    Err(ActionError::InvalidTransition {
                        vm_id: *vm_id,
                        reason: "vm is already terminated".to_string(),
                    })
                } else {
                    Err(ActionError::UnknownEntity(Entity::Vm(*vm_id)))
                }
            }
            Action::Pause { vm_id } => {
                expect_status(state, *vm_id, VmStatus::Running)?;
                Ok(())
            }
            Action::Unpause { vm_id, host } => {
                let vm = expect_status(state, *vm_id, VmStatus::Paused)?;
                let target = unpause_target(vm, *host)?;
                check_fits(state, vm, target)
            }
            Action::Migrate { vm_id, host } => {
                let vm = expect_status(state, *vm_id, VmStatus::Running)?;
                if state.host_of(*vm_id) == Some(*host) {
                    return Err(ActionError::InvalidTransition {
                        vm_id: *vm_id,
                        reason: format!("vm is already on host {}", host),
                    });
                }
                check_fits(state, vm, *host)
            }
        }
    }

    /// Validates the action and applies it to the state.
    ///
    /// Application is not idempotent: applying the same action twice fails on the second call.
    pub fn apply(&self, state: &mut CloudState) -> Result<(), ActionError> {
        self.validate(state)?;
        match self {
            Action::Boot { vm, host } => {
                let mut vm = vm.clone();
                vm.status = VmStatus::Running;
                vm.last_host = None;
                let vm_id = vm.id;
                state.insert_vm(vm);
                if let Some(host_id) = host {
                    // not enough capacity leaves the VM pending
                    let _ = state.allocate(vm_id, *host_id);
                }
                Ok(())
            }
            Action::Shutdown { vm_id } => {
                if state.host_of(*vm_id).is_some() {
                    state.deallocate(*vm_id)?;
                }
                if let Some(vm) = state.vm_mut(*vm_id) {
                    vm.status = VmStatus::Terminated;
                }
                state.terminate_vm(*vm_id);
                Ok(())
            }
            Action::Pause { vm_id } => {
                let last_host = match state.host_of(*vm_id) {
                    Some(_) => Some(state.deallocate(*vm_id)?),
                    None => None,
                };
                if let Some(vm) = state.vm_mut(*vm_id) {
                    vm.status = VmStatus::Paused;
                    if last_host.is_some() {
                        vm.last_host = last_host;
                    }
                }
                Ok(())
            }
            Action::Unpause { vm_id, host } => {
                let vm = state.vm_mut(*vm_id).ok_or(ActionError::UnknownEntity(Entity::Vm(*vm_id)))?;
                let target = unpause_target(vm, *host)?;
                // only running VMs can be allocated
                vm.status = VmStatus::Running;
                if let Err(e) = state.allocate(*vm_id, target) {
                    if let Some(vm) = state.vm_mut(*vm_id) {
                        vm.status = VmStatus::Paused;
                    }
                    return Err(e);
                }
                Ok(())
            }
            Action::Migrate { vm_id, host } => {
                let source = state.host_of(*vm_id);
                if source.is_some() {
                    state.deallocate(*vm_id)?;
                }
                if let Err(e) = state.allocate(*vm_id, *host) {
                    if let Some(source) = source {
                        state.allocate(*vm_id, source)?;
                    }
                    return Err(e);
                }
                Ok(())
            }
        }
    }
}

fn expect_status(state: &CloudState, vm_id: u32, status: VmStatus) -> Result<&VirtualMachine, ActionError> {
    let vm = state.vm(vm_id).ok_or(ActionError::UnknownEntity(Entity::Vm(vm_id)))?;
    if vm.status != status {
        return Err(ActionError::InvalidTransition {
            vm_id,
            reason: format!("vm is {}, expected {}", vm.status, status),
        });
    }
    Ok(vm)
}

/// Explicit target or the host the VM was paused on.
fn unpause_target(vm: &VirtualMachine, host: Option<u32>) -> Result<u32, ActionError> {
    host.or(vm.last_host).ok_or_else(|| ActionError::InvalidTransition {
        vm_id: vm.id,
        reason: "no target host and no last known host".to_string(),
    })
}

fn check_fits(state: &CloudState, vm: &VirtualMachine, host_id: u32) -> Result<(), ActionError> {
    let available = state.available(host_id)?;
    match vm.demand.first_shortage(available) {
        Some((resource, requested, available)) => Err(ActionError::CapacityExceeded {
            vm_id: vm.id,
            host_id,
            resource: resource.to_string(),
            requested,
            available,
        }),
        None => Ok(()),
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Action::Boot { vm, host: Some(host) } => write!(f, "boot vm {} on host {}", vm.id, host),
            Action::Boot { vm, host: None } => write!(f, "boot vm {}", vm.id),
            Action::Shutdown { vm_id } => write!(f, "shutdown vm {}", vm_id),
            Action::Pause { vm_id } => write!(f, "pause vm {}", vm_id),
            Action::Unpause { vm_id, host: Some(host) } => write!(f, "unpause vm {} on host {}", vm_id, host),
            Action::Unpause { vm_id, host: None } => write!(f, "unpause vm {}", vm_id),
            Action::Migrate { vm_id, host } => write!(f, "migrate vm {} to host {}", vm_id, host),
        }
    }
}
