//! State of the simulated cloud: hosts, live VMs and their allocations.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::core::common::AllocationVerdict;
use crate::core::error::{ActionError, Entity};
use crate::core::resource_pool::{HostInfo, ResourcePoolState};
use crate::core::resources::Resources;
use crate::core::vm::{VirtualMachine, VmStatus};

/// Hosts, live VMs (in arrival order) and the VM to host allocation relation.
///
/// A running VM without allocation is *pending*. Paused VMs are never allocated.
/// The sum of demands of VMs allocated on a host never exceeds its capacity in any resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CloudState {
    pool: ResourcePoolState,
    vms: IndexMap<u32, VirtualMachine>,
    alloc: BTreeMap<u32, u32>,
    terminated: BTreeSet<u32>,
}

impl CloudState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds host with the specified capacity and returns its ID.
    pub fn add_host(&mut self, name: &str, capacity: Resources, location: Option<String>) -> u32 {
        self.pool.add_host(name, capacity, location)
    }

    pub fn host(&self, host_id: u32) -> Option<&HostInfo> {
        self.pool.host(host_id)
    }

    /// Iterates over hosts in ID order.
    pub fn hosts(&self) -> impl Iterator<Item = (u32, &HostInfo)> {
        self.pool.hosts()
    }

    pub fn host_ids(&self) -> Vec<u32> {
        self.pool.get_hosts_list()
    }

    pub fn host_count(&self) -> u32 {
        self.pool.get_host_count()
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    /// Iterates over live VMs in arrival order.
    pub fn vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values()
    }

    pub fn contains_vm(&self, vm_id: u32) -> bool {
        self.vms.contains_key(&vm_id)
    }

    pub fn is_terminated(&self, vm_id: u32) -> bool {
        self.terminated.contains(&vm_id)
    }

    pub fn host_of(&self, vm_id: u32) -> Option<u32> {
        self.alloc.get(&vm_id).copied()
    }

    /// Returns IDs of VMs allocated on the host.
    pub fn vms_on(&self, host_id: u32) -> Vec<u32> {
        self.pool
            .host(host_id)
            .map(|host| host.vms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Running VMs without allocation, in arrival order.
    pub fn pending_vms(&self) -> Vec<&VirtualMachine> {
        self.vms
            .values()
            .filter(|vm| vm.status == VmStatus::Running && !self.alloc.contains_key(&vm.id))
            .collect()
    }

    pub fn running_vms(&self) -> Vec<&VirtualMachine> {
        self.vms.values().filter(|vm| vm.status == VmStatus::Running).collect()
    }

    pub fn paused_vms(&self) -> Vec<&VirtualMachine> {
        self.vms.values().filter(|vm| vm.status == VmStatus::Paused).collect()
    }

    /// IDs of hosts with at least one allocated VM.
    pub fn active_hosts(&self) -> Vec<u32> {
        self.pool
            .hosts()
            .filter(|(_, host)| host.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    /// Current allocations as (VM, host) pairs ordered by VM ID.
    pub fn allocations(&self) -> &BTreeMap<u32, u32> {
        &self.alloc
    }

    /// Remaining capacity of the host.
    pub fn available(&self, host_id: u32) -> Result<&Resources, ActionError> {
        self.pool
            .get_available(host_id)
            .ok_or(ActionError::UnknownEntity(Entity::Host(host_id)))
    }

    pub fn can_allocate(&self, demand: &Resources, host_id: u32) -> AllocationVerdict {
        self.pool.can_allocate(demand, host_id)
    }

    /// Allocates running VM on the host.
    pub fn allocate(&mut self, vm_id: u32, host_id: u32) -> Result<(), ActionError> {
        let vm = self.vms.get(&vm_id).ok_or(ActionError::UnknownEntity(Entity::Vm(vm_id)))?;
        if vm.status != VmStatus::Running {
            return Err(ActionError::InvalidTransition {
                vm_id,
                reason: format!("cannot allocate {} vm", vm.status),
            });
        }
        if let Some(current) = self.alloc.get(&vm_id) {
            return Err(ActionError::InvalidTransition {
                vm_id,
                reason: format!("already allocated on host {}", current),
            });
        }
        match self.pool.allocate(vm_id, &vm.demand, host_id) {
            AllocationVerdict::Success => {
                self.alloc.insert(vm_id, host_id);
                Ok(())
            }
            AllocationVerdict::NotEnoughResource {
                resource,
                requested,
                available,
            } => Err(ActionError::CapacityExceeded {
                vm_id,
                host_id,
                resource,
                requested,
                available,
            }),
            AllocationVerdict::HostNotFound => Err(ActionError::UnknownEntity(Entity::Host(host_id))),
        }
    }

    /// Removes VM allocation and returns the host it was allocated on.
    pub fn deallocate(&mut self, vm_id: u32) -> Result<u32, ActionError> {
        let host_id = self.alloc.remove(&vm_id).ok_or(ActionError::NotAllocated(vm_id))?;
        if let Some(vm) = self.vms.get(&vm_id) {
            self.pool.release(vm_id, &vm.demand, host_id);
        }
        Ok(host_id)
    }

    /// Allocation rate of the resource on the host.
    pub fn load(&self, host_id: u32, resource: &str) -> f64 {
        self.pool.get_load(host_id, resource)
    }

    /// Allocation rate of the primary (first declared) resource on the host.
    pub fn utilization(&self, host_id: u32) -> f64 {
        match self.pool.host(host_id).and_then(|host| host.capacity.names().next()) {
            Some(resource) => self.pool.get_load(host_id, resource),
            None => 0.,
        }
    }

    /// Recomputes per-host usage from the allocation relation and checks it against capacities
    /// and the bookkeeping of available resources.
    pub fn check_capacity_invariant(&self) -> bool {
        for (host_id, host) in self.pool.hosts() {
            let mut used = Resources::new();
            for (vm_id, _) in self.alloc.iter().filter(|(_, h)| **h == host_id) {
                match self.vms.get(vm_id) {
                    Some(vm) if vm.status == VmStatus::Running => used.increase(&vm.demand),
                    _ => return false,
                }
            }
            for (resource, capacity) in host.capacity.iter() {
                let usage = used.get(resource);
                if usage > capacity || capacity - usage != host.available.get(resource) {
                    return false;
                }
            }
        }
        true
    }

    /// Returns a deep copy of the state.
    pub fn snapshot(&self) -> CloudState {
        self.clone()
    }

    pub(crate) fn insert_vm(&mut self, vm: VirtualMachine) {
        self.vms.insert(vm.id, vm);
    }

    pub(crate) fn vm_mut(&mut self, vm_id: u32) -> Option<&mut VirtualMachine> {
        self.vms.get_mut(&vm_id)
    }

    pub(crate) fn terminate_vm(&mut self, vm_id: u32) {
        self.vms.shift_remove(&vm_id);
        self.terminated.insert(vm_id);
    }
}
