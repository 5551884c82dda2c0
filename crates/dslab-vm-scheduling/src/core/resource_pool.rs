//! Resource pool state.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::AllocationVerdict;
use crate::core::resources::Resources;

/// Stores host properties (resource capacity, location) and state (available resources, allocated VMs).
#[derive(Clone, Debug, PartialEq)]
pub struct HostInfo {
    pub name: String,
    pub capacity: Resources,
    pub available: Resources,
    pub location: Option<String>,
    pub vms: BTreeSet<u32>,
}

impl HostInfo {
    /// Creates host info with all capacity available.
    pub fn new(name: &str, capacity: Resources, location: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            available: capacity.clone(),
            capacity,
            location,
            vms: BTreeSet::new(),
        }
    }

    /// Host is active if at least one VM is allocated on it.
    pub fn is_active(&self) -> bool {
        !self.vms.is_empty()
    }
}

/// Per-host capacity bookkeeping. Hosts are ordered by ID, which is assigned sequentially starting from zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourcePoolState {
    hosts: BTreeMap<u32, HostInfo>,
}

impl ResourcePoolState {
    /// Creates empty resource pool state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds host to resource pool and returns its ID.
    pub fn add_host(&mut self, name: &str, capacity: Resources, location: Option<String>) -> u32 {
        let id = self.hosts.len() as u32;
        self.hosts.insert(id, HostInfo::new(name, capacity, location));
        id
    }

    /// Returns IDs of all hosts.
    pub fn get_hosts_list(&self) -> Vec<u32> {
        self.hosts.keys().cloned().collect()
    }

    /// Returns the number of hosts.
    pub fn get_host_count(&self) -> u32 {
        self.hosts.len() as u32
    }

    pub fn host(&self, host_id: u32) -> Option<&HostInfo> {
        self.hosts.get(&host_id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = (u32, &HostInfo)> {
        self.hosts.iter().map(|(id, host)| (*id, host))
    }

    /// Checks if the specified demand can currently be placed on the specified host.
    pub fn can_allocate(&self, demand: &Resources, host_id: u32) -> AllocationVerdict {
        let host = match self.hosts.get(&host_id) {
            Some(host) => host,
            None => return AllocationVerdict::HostNotFound,
        };
        match demand.first_shortage(&host.available) {
            Some((resource, requested, available)) => AllocationVerdict::NotEnoughResource {
                resource: resource.to_string(),
                requested,
                available,
            },
            None => AllocationVerdict::Success,
        }
    }

    /// Places VM demand on the specified host. The state is changed only if the verdict is `Success`.
    pub fn allocate(&mut self, vm_id: u32, demand: &Resources, host_id: u32) -> AllocationVerdict {
        let verdict = self.can_allocate(demand, host_id);
        if verdict == AllocationVerdict::Success {
            if let Some(host) = self.hosts.get_mut(&host_id) {
                host.available.decrease(demand);
                host.vms.insert(vm_id);
            }
        }
        verdict
    }

    /// Removes VM demand from the specified host.
    pub fn release(&mut self, vm_id: u32, demand: &Resources, host_id: u32) {
        if let Some(host) = self.hosts.get_mut(&host_id) {
            if host.vms.remove(&vm_id) {
                host.available.increase(demand);
            }
        }
    }

    /// Returns the amount of available resources on the specified host.
    pub fn get_available(&self, host_id: u32) -> Option<&Resources> {
        self.hosts.get(&host_id).map(|host| &host.available)
    }

    /// Returns the allocation rate (ratio of allocated to total amount) of the specified resource on the host.
    pub fn get_load(&self, host_id: u32, resource: &str) -> f64 {
        match self.hosts.get(&host_id) {
            Some(host) => {
                let total = host.capacity.get(resource);
                if total == 0 {
                    return 0.;
                }
                1. - host.available.get(resource) as f64 / total as f64
            }
            None => 0.,
        }
    }
}
