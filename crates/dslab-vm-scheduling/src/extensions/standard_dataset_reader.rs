//! Dataset reader for manually created datasets.

use std::collections::HashSet;

use serde::Deserialize;

use crate::core::error::SimulationError;
use crate::core::resources::Resources;
use crate::extensions::dataset_reader::{DatasetReader, VmSpec};

#[derive(Deserialize)]
struct RawVm {
    id: Option<u32>,
    arrival_time: f64,
    lifetime: Option<f64>,
    resources: Resources,
}

/// Dataset reader for manually created datasets.
///
/// The dataset is a JSON list of VMs:
///
/// ```json
/// [{"id": 0, "arrival_time": 0, "lifetime": 7200, "resources": {"cpu": 2, "ram": 4}}]
/// ```
///
/// VM IDs default to the position in the list and must be unique.
#[derive(Default)]
pub struct StandardDatasetReader {
    vms: Vec<VmSpec>,
    current_vm: usize,
}

impl StandardDatasetReader {
    /// Creates dataset reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the dataset from JSON file.
    pub fn parse(&mut self, file_name: &str) -> Result<(), SimulationError> {
        let data = std::fs::read_to_string(file_name)
            .map_err(|e| SimulationError::Dataset(format!("can't read {}: {}", file_name, e)))?;
        self.parse_str(&data)
    }

    /// Loads the dataset from JSON string.
    pub fn parse_str(&mut self, data: &str) -> Result<(), SimulationError> {
        let raw: Vec<RawVm> = serde_json::from_str(data)?;
        let mut ids: HashSet<u32> = self.vms.iter().map(|vm| vm.id).collect();
        for (idx, raw_vm) in raw.into_iter().enumerate() {
            if raw_vm.lifetime.map_or(false, |lifetime| lifetime < 0.) {
                return Err(SimulationError::Dataset(format!("negative lifetime of vm #{}", idx)));
            }
            let id = raw_vm.id.unwrap_or(idx as u32);
            if !ids.insert(id) {
                return Err(SimulationError::Dataset(format!("duplicate vm id {}", id)));
            }
            self.vms.push(VmSpec {
                id,
                demand: raw_vm.resources,
                start_time: raw_vm.arrival_time,
                lifetime: raw_vm.lifetime,
            });
        }
        self.vms.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(())
    }

    pub fn vms(&self) -> &[VmSpec] {
        &self.vms
    }
}

impl DatasetReader for StandardDatasetReader {
    fn get_next_vm(&mut self) -> Option<VmSpec> {
        let vm = self.vms.get(self.current_vm).cloned();
        if vm.is_some() {
            self.current_vm += 1;
        }
        vm
    }
}
