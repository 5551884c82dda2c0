//! Scheduler delegating host ranking to a learned placement model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::action::Action;
use crate::core::common::AllocationVerdict;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{Scheduler, SchedulingInput};
use crate::core::schedulers::propose;
use crate::{log_debug, log_trace};

/// Features of a pending VM: its demand in the resource order of the model.
#[derive(Clone, Debug, PartialEq)]
pub struct VmFeatures {
    pub id: u32,
    pub demand: Vec<f64>,
}

/// Features of a host: its capacity and available resources in the resource order of the model.
#[derive(Clone, Debug, PartialEq)]
pub struct HostFeatures {
    pub id: u32,
    pub capacity: Vec<f64>,
    pub available: Vec<f64>,
}

/// Model ranking hosts for VMs.
///
/// The model is opaque to the scheduler: its suggestions are checked against the available resources and
/// infeasible or unknown hosts are skipped.
pub trait PlacementModel {
    /// Resource order used to build features.
    fn resources(&self) -> &[String];

    /// Returns host IDs ranked from the most to the least preferred for each VM.
    fn rank_hosts(&self, vms: &[VmFeatures], hosts: &[HostFeatures]) -> Result<Vec<Vec<u32>>, SimulationError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl FeatureScaler {
    fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (mean, std))| (v - mean) / std)
            .collect()
    }
}

/// Linear model over standardized VM demand and host available resources with pairwise interaction terms:
///
/// `score = bias + vm_weights * v + host_weights * h + sum(interaction_weights[i] * v[i] * h[i])`.
///
/// Hosts are ranked by descending score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearScoringModel {
    pub resources: Vec<String>,
    pub vm_scaler: FeatureScaler,
    pub host_scaler: FeatureScaler,
    pub vm_weights: Vec<f64>,
    pub host_weights: Vec<f64>,
    pub interaction_weights: Vec<f64>,
    pub bias: f64,
}

impl LinearScoringModel {
    /// Loads model from JSON artifact.
    pub fn from_json(data: &str) -> Result<Self, SimulationError> {
        let model: Self =
            serde_json::from_str(data).map_err(|e| SimulationError::Model(format!("can't parse model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_file(path: &str) -> Result<Self, SimulationError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Model(format!("can't read model {}: {}", path, e)))?;
        Self::from_json(&data)
    }

    /// Checks that all vectors match the number of resources and scalers are invertible.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let n = self.resources.len();
        if n == 0 {
            return Err(SimulationError::Model("model has no resources".to_string()));
        }
        let vectors = [
            ("vm_scaler.mean", &self.vm_scaler.mean),
            ("vm_scaler.std", &self.vm_scaler.std),
            ("host_scaler.mean", &self.host_scaler.mean),
            ("host_scaler.std", &self.host_scaler.std),
            ("vm_weights", &self.vm_weights),
            ("host_weights", &self.host_weights),
            ("interaction_weights", &self.interaction_weights),
        ];
        for (name, vector) in vectors {
            if vector.len() != n {
                return Err(SimulationError::Model(format!(
                    "{} has {} values, expected {}",
                    name,
                    vector.len(),
                    n
                )));
            }
        }
        if self.vm_scaler.std.iter().chain(self.host_scaler.std.iter()).any(|std| *std == 0.) {
            return Err(SimulationError::Model("zero standard deviation in scaler".to_string()));
        }
        Ok(())
    }

    fn score(&self, vm: &[f64], host: &[f64]) -> f64 {
        let mut score = self.bias;
        for i in 0..self.resources.len() {
            score += self.vm_weights[i] * vm[i] + self.host_weights[i] * host[i];
            score += self.interaction_weights[i] * vm[i] * host[i];
        }
        score
    }
}

impl PlacementModel for LinearScoringModel {
    fn resources(&self) -> &[String] {
        &self.resources
    }

    fn rank_hosts(&self, vms: &[VmFeatures], hosts: &[HostFeatures]) -> Result<Vec<Vec<u32>>, SimulationError> {
        let n = self.resources.len();
        let host_features = hosts
            .iter()
            .map(|host| {
                if host.available.len() != n {
                    return Err(SimulationError::Model(format!("host {} has wrong feature count", host.id)));
                }
                Ok((host.id, self.host_scaler.transform(&host.available)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut ranking = Vec::with_capacity(vms.len());
        for vm in vms {
            if vm.demand.len() != n {
                return Err(SimulationError::Model(format!("vm {} has wrong feature count", vm.id)));
            }
            let features = self.vm_scaler.transform(&vm.demand);
            let mut scored: Vec<(u32, f64)> = host_features
                .iter()
                .map(|(id, host)| (*id, self.score(&features, host)))
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            ranking.push(scored.into_iter().map(|(id, _)| id).collect());
        }
        Ok(ranking)
    }
}

/// Places pending VMs on the highest ranked feasible hosts suggested by the model.
pub struct ModelBased {
    model: Box<dyn PlacementModel>,
}

impl ModelBased {
    pub fn new(model: Box<dyn PlacementModel>) -> Self {
        Self { model }
    }

    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, SimulationError> {
        let path = options
            .get("model")
            .ok_or_else(|| SimulationError::Config("ModelBased requires model option".to_string()))?;
        Ok(Self::new(Box::new(LinearScoringModel::from_file(path)?)))
    }
}

impl Scheduler for ModelBased {
    fn reevaluate(&mut self, input: &SchedulingInput) -> Result<Schedule, SimulationError> {
        let mut schedule = Schedule::new();
        let pending: Vec<_> = input.state.pending_vms().into_iter().cloned().collect();
        if pending.is_empty() {
            return Ok(schedule);
        }
        let resources = self.model.resources().to_vec();
        let to_features = |values: Vec<u64>| values.into_iter().map(|v| v as f64).collect::<Vec<_>>();
        let vms: Vec<VmFeatures> = pending
            .iter()
            .map(|vm| VmFeatures {
                id: vm.id,
                demand: to_features(vm.demand.ordered_by(&resources)),
            })
            .collect();
        let hosts: Vec<HostFeatures> = input
            .state
            .hosts()
            .map(|(id, host)| HostFeatures {
                id,
                capacity: to_features(host.capacity.ordered_by(&resources)),
                available: to_features(host.available.ordered_by(&resources)),
            })
            .collect();

        let ranking = self.model.rank_hosts(&vms, &hosts)?;
        if ranking.len() != pending.len() {
            return Err(SimulationError::Model(format!(
                "model returned {} rankings for {} vms",
                ranking.len(),
                pending.len()
            )));
        }

        let mut sandbox = input.state.snapshot();
        for (vm, ranked) in pending.iter().zip(ranking) {
            let mut placed = false;
            for host in ranked {
                match sandbox.can_allocate(&vm.demand, host) {
                    AllocationVerdict::Success => {
                        propose(&mut sandbox, &mut schedule, Action::Migrate { vm_id: vm.id, host }, input.time)?;
                        placed = true;
                        break;
                    }
                    verdict => log_trace!(input.ctx, "skipping host {} for vm {}: {:?}", host, vm.id, verdict),
                }
            }
            if !placed {
                log_debug!(input.ctx, "no feasible host suggested for vm {}", vm.id);
            }
        }
        Ok(schedule)
    }

    fn name(&self) -> String {
        "ModelBased".to_string()
    }
}
