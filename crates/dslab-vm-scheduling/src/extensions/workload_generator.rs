//! Random workload generator.

use rand::prelude::*;
use rand_distr::Normal;
use rand_pcg::Pcg64;

use crate::core::error::SimulationError;
use crate::core::resources::Resources;
use crate::extensions::dataset_reader::{DatasetReader, VmSpec};

/// Generates VMs with uniformly distributed arrival times, flavors chosen uniformly from the given list and
/// normally distributed lifetimes.
pub struct RandomWorkloadGenerator {
    vms: Vec<VmSpec>,
    current_vm: usize,
}

impl RandomWorkloadGenerator {
    /// Generates `count` VMs arriving in `[start, end)` with IDs starting from `first_id`.
    /// Lifetimes are bounded from below by one second.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        count: u32,
        first_id: u32,
        flavors: &[Resources],
        start: f64,
        end: f64,
        mean_lifetime: f64,
        lifetime_sd: f64,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        if flavors.is_empty() {
            return Err(SimulationError::Config("workload generator requires flavors".to_string()));
        }
        if end <= start {
            return Err(SimulationError::Config("empty arrival window".to_string()));
        }
        let lifetimes = Normal::new(mean_lifetime, lifetime_sd)
            .map_err(|e| SimulationError::Config(format!("invalid lifetime distribution: {}", e)))?;
        let last_id = first_id
            .checked_add(count)
            .ok_or_else(|| SimulationError::Config("too many generated VMs".to_string()))?;
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut vms = Vec::with_capacity(count as usize);
        for id in first_id..last_id {
            let start_time = rng.gen_range(start..end).floor();
            let flavor = &flavors[rng.gen_range(0..flavors.len())];
            let lifetime: f64 = lifetimes.sample(&mut rng);
            vms.push(VmSpec {
                id,
                demand: flavor.clone(),
                start_time,
                lifetime: Some(lifetime.max(1.)),
            });
        }
        vms.sort_by(|a, b| a.start_time.total_cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(Self { vms, current_vm: 0 })
    }

    pub fn vms(&self) -> &[VmSpec] {
        &self.vms
    }
}

impl DatasetReader for RandomWorkloadGenerator {
    fn get_next_vm(&mut self) -> Option<VmSpec> {
        let vm = self.vms.get(self.current_vm).cloned();
        if vm.is_some() {
            self.current_vm += 1;
        }
        vm
    }
}
