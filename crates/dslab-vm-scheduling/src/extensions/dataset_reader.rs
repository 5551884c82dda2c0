//! Trait for dataset readers.

use crate::core::request::VmRequest;
use crate::core::resources::Resources;
use crate::core::vm::VirtualMachine;

/// Represents information about a single virtual machine from dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct VmSpec {
    pub id: u32,
    pub demand: Resources,
    pub start_time: f64,
    /// VM runs until the end of simulation if lifetime is not set.
    pub lifetime: Option<f64>,
}

pub trait DatasetReader {
    /// Returns the next VM from dataset (if any).
    ///
    /// VMs should be returned in non-decreasing order of their start times.
    fn get_next_vm(&mut self) -> Option<VmSpec>;
}

/// Reads all VMs from dataset and converts them to boot and shutdown requests.
pub fn requests_from_dataset(reader: &mut dyn DatasetReader) -> Vec<VmRequest> {
    let mut requests = Vec::new();
    while let Some(spec) = reader.get_next_vm() {
        let vm = VirtualMachine::new(spec.id, spec.demand);
        requests.push(VmRequest::boot(spec.start_time, vm.clone()));
        if let Some(lifetime) = spec.lifetime {
            requests.push(VmRequest::shutdown(spec.start_time + lifetime, vm));
        }
    }
    requests.sort_by(|a, b| a.time.total_cmp(&b.time));
    requests
}
