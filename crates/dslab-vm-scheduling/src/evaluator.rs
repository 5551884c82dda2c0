//! Evaluation of energy consumption and electricity cost of a committed schedule.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::action::Action;
use crate::core::cloud_state::CloudState;
use crate::core::config::sim_config::PowerConfig;
use crate::core::energy_meter::EnergyMeter;
use crate::core::environment::KnownData;
use crate::core::error::SimulationError;
use crate::core::power_model::{LinearPowerModel, PowerModel};
use crate::core::schedule::Schedule;
use crate::simulation::CloudSimulation;

/// Aggregated results of a simulation run. Energy is in kWh, cost is in the currency of electricity prices.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EvaluationResults {
    pub it_energy: f64,
    pub it_cost: f64,
    /// Energy including cooling and migrations.
    pub total_energy: f64,
    /// Cost including cooling and migrations.
    pub total_cost: f64,
    pub migrations: u32,
    pub migration_energy: f64,
    pub migration_cost: f64,
    pub mean_utilization: f64,
    pub max_utilization: f64,
    /// Revenue from allocated running VMs.
    pub service_revenue: f64,
    /// Service revenue minus total cost.
    pub gross_profit: f64,
    /// IT energy of each host by name.
    pub host_energy: IndexMap<String, f64>,
}

impl EvaluationResults {
    /// Returns scalar results as strings keyed by metric name.
    pub fn to_indexmap(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        map.insert("it_energy".to_string(), format!("{:.6}", self.it_energy));
        map.insert("it_cost".to_string(), format!("{:.6}", self.it_cost));
        map.insert("total_energy".to_string(), format!("{:.6}", self.total_energy));
        map.insert("total_cost".to_string(), format!("{:.6}", self.total_cost));
        map.insert("migrations".to_string(), self.migrations.to_string());
        map.insert("migration_energy".to_string(), format!("{:.6}", self.migration_energy));
        map.insert("migration_cost".to_string(), format!("{:.6}", self.migration_cost));
        map.insert("mean_utilization".to_string(), format!("{:.4}", self.mean_utilization));
        map.insert("max_utilization".to_string(), format!("{:.4}", self.max_utilization));
        map.insert("service_revenue".to_string(), format!("{:.6}", self.service_revenue));
        map.insert("gross_profit".to_string(), format!("{:.6}", self.gross_profit));
        map
    }

    /// Writes scalar results as CSV with `metric,value` columns.
    pub fn save_csv(&self, path: &str) -> Result<(), SimulationError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["metric", "value"])?;
        for (metric, value) in self.to_indexmap() {
            writer.write_record([metric, value])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Coefficient of performance of cooling at the given outside temperature (Celsius).
pub fn cooling_cop(temperature: f64) -> f64 {
    0.0068 * temperature * temperature + 0.0008 * temperature + 0.458
}

/// Replays a committed schedule from the initial state along the simulation time axis and computes
/// energy consumption and electricity cost.
///
/// Host power is constant within a step and is computed from the utilization of the primary resource
/// after applying all actions planned for the step. Hosts without VMs consume nothing.
/// Users pay for the steps their VMs are running on some host.
pub struct Evaluator {
    power_model: Box<dyn PowerModel>,
    migration_energy: f64,
    vm_hour_price: f64,
}

impl Evaluator {
    /// - `migration_energy` - energy spent on a single migration in kWh.
    pub fn new(power_model: Box<dyn PowerModel>, migration_energy: f64) -> Self {
        Self {
            power_model,
            migration_energy,
            vm_hour_price: 0.,
        }
    }

    /// Sets the price of an hour of allocated running VM used to compute service revenue.
    pub fn with_vm_hour_price(mut self, price: f64) -> Self {
        self.vm_hour_price = price;
        self
    }

    pub fn from_config(config: &PowerConfig) -> Self {
        Self::new(
            Box::new(LinearPowerModel::new(config.idle_power, config.max_power)),
            config.migration_energy,
        )
        .with_vm_hour_price(config.vm_hour_price)
    }

    /// Evaluates the results of finished simulation.
    pub fn evaluate_simulation(&self, sim: &CloudSimulation) -> Result<EvaluationResults, SimulationError> {
        let env = sim.environment();
        self.evaluate(sim.initial_state(), sim.schedule(), env.signals(), env.times(), env.period())
    }

    pub fn evaluate(
        &self,
        initial: &CloudState,
        schedule: &Schedule,
        signals: &KnownData,
        times: &[f64],
        period: f64,
    ) -> Result<EvaluationResults, SimulationError> {
        let mut state = initial.snapshot();
        let mut results = EvaluationResults::default();
        let start = times.first().copied().unwrap_or(0.);
        let hosts = state.host_ids();
        let mut it_meters: Vec<EnergyMeter> = hosts.iter().map(|_| EnergyMeter::new(start)).collect();
        let mut total_meters: Vec<EnergyMeter> = hosts.iter().map(|_| EnergyMeter::new(start)).collect();
        let mut utilization_sum = 0.;
        let mut utilization_samples = 0;

        let actions = schedule.actions();
        let mut next_action = 0;
        for &time in times {
            while next_action < actions.len() && actions[next_action].time < time + period {
                let item = &actions[next_action];
                if let Action::Migrate { vm_id, host } = &item.action {
                    if state.host_of(*vm_id).is_some() {
                        results.migrations += 1;
                        results.migration_energy += self.migration_energy;
                        let location = state.host(*host).and_then(|h| h.location.as_deref());
                        let price = signals.el_prices.value_at(location, item.time).unwrap_or(0.);
                        results.migration_cost += self.migration_energy * price;
                    }
                }
                item.action.apply(&mut state)?;
                next_action += 1;
            }

            let hours = period / 3600.;
            let served = state
                .running_vms()
                .iter()
                .filter(|vm| state.host_of(vm.id).is_some())
                .count();
            results.service_revenue += served as f64 * hours * self.vm_hour_price;

            for (idx, host_id) in hosts.iter().enumerate() {
                let host = match state.host(*host_id) {
                    Some(host) => host,
                    None => continue,
                };
                let utilization = state.utilization(*host_id);
                utilization_sum += utilization;
                utilization_samples += 1;
                results.max_utilization = results.max_utilization.max(utilization);

                let power = if host.is_active() {
                    self.power_model.get_power(time, utilization)
                } else {
                    0.
                };
                let location = host.location.as_deref();
                let total_power = match signals.temperature.value_at(location, time) {
                    Some(temperature) => power * (1. + 1. / cooling_cop(temperature)),
                    None => power,
                };
                it_meters[idx].update(time, power);
                total_meters[idx].update(time, total_power);

                let price = signals.el_prices.value_at(location, time).unwrap_or(0.);
                results.it_cost += power / 1000. * hours * price;
                results.total_cost += total_power / 1000. * hours * price;
            }
        }

        let end = times.last().map_or(start, |t| t + period);
        for (idx, host_id) in hosts.iter().enumerate() {
            it_meters[idx].update(end, 0.);
            total_meters[idx].update(end, 0.);
            let energy = it_meters[idx].energy_consumed_kwh();
            results.it_energy += energy;
            results.total_energy += total_meters[idx].energy_consumed_kwh();
            let name = state.host(*host_id).map_or_else(|| host_id.to_string(), |h| h.name.clone());
            results.host_energy.insert(name, energy);
        }
        results.total_energy += results.migration_energy;
        results.total_cost += results.migration_cost;
        results.gross_profit = results.service_revenue - results.total_cost;
        if utilization_samples > 0 {
            results.mean_utilization = utilization_sum / utilization_samples as f64;
        }
        Ok(results)
    }
}
