//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::SimulationError;
use crate::core::resources::Resources;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub start_time: Option<f64>,
    pub step_duration: Option<f64>,
    pub simulation_length: Option<f64>,
    pub forecast_horizon: Option<f64>,
    pub forecast_el_error_sd: Option<f64>,
    pub forecast_temp_error_sd: Option<f64>,
    pub seed: Option<u64>,
    pub keep_state_history: Option<bool>,
    pub scheduler: Option<String>,
    pub hosts: Option<Vec<HostConfig>>,
    pub workload: Option<WorkloadConfig>,
    pub el_prices: Option<SignalConfig>,
    pub temperature: Option<SignalConfig>,
    pub power: Option<PowerConfig>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Host capacity per resource, the first resource is the primary one.
    pub resources: Resources,
    /// Location used to look up electricity prices and temperature.
    pub location: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Environmental signal given either as a constant or as a path to CSV file with `time,location,value` columns.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum SignalConfig {
    Constant(f64),
    File(String),
}

/// Parameters of randomly generated workload.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// Number of VMs.
    pub count: u32,
    /// VM flavors, each generated VM gets one of them.
    pub flavors: Vec<Resources>,
    /// Mean VM lifetime in seconds.
    pub mean_lifetime: f64,
    /// Standard deviation of VM lifetime in seconds.
    #[serde(default)]
    pub lifetime_sd: f64,
}

/// Workload source: JSON dataset or random generator.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct WorkloadConfig {
    /// Path to JSON dataset read by `StandardDatasetReader`.
    pub dataset: Option<String>,
    pub generator: Option<GeneratorConfig>,
}

/// Parameters of host power model and migration overhead.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PowerConfig {
    /// Power of idle host in watts.
    pub idle_power: f64,
    /// Power of fully loaded host in watts.
    pub max_power: f64,
    /// Energy spent on a single migration in kWh.
    pub migration_energy: f64,
    /// Price paid by users for an hour of allocated running VM.
    pub vm_hour_price: f64,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            idle_power: 100.,
            max_power: 200.,
            migration_energy: 0.,
            vm_hour_price: 0.,
        }
    }
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Time of the first simulation step.
    pub start_time: f64,
    /// Duration in seconds between simulation steps.
    pub step_duration: f64,
    /// Length of simulation in seconds.
    pub simulation_length: f64,
    /// How far ahead (in seconds) schedulers see signal forecasts.
    pub forecast_horizon: f64,
    /// Standard deviation of electricity price forecast error.
    pub forecast_el_error_sd: f64,
    /// Standard deviation of temperature forecast error.
    pub forecast_temp_error_sd: f64,
    /// Seed for random workload and forecast errors.
    pub seed: u64,
    /// Whether to store the cloud state after each step.
    pub keep_state_history: bool,
    /// Scheduler config string, e.g. `BruteForce[max_vms=6]`.
    pub scheduler: String,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
    pub workload: WorkloadConfig,
    pub el_prices: Option<SignalConfig>,
    pub temperature: Option<SignalConfig>,
    pub power: PowerConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, SimulationError> {
        let data = std::fs::read_to_string(file_name)
            .map_err(|e| SimulationError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml_str(&data)
    }

    /// Creates simulation config from YAML string.
    pub fn from_yaml_str(data: &str) -> Result<Self, SimulationError> {
        let raw: RawSimulationConfig = serde_yaml::from_str(data)?;
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            start_time: raw.start_time.unwrap_or(0.),
            step_duration: raw.step_duration.unwrap_or(3600.),
            simulation_length: raw.simulation_length.unwrap_or(86400.),
            forecast_horizon: raw.forecast_horizon.unwrap_or(14400.),
            forecast_el_error_sd: raw.forecast_el_error_sd.unwrap_or(0.),
            forecast_temp_error_sd: raw.forecast_temp_error_sd.unwrap_or(0.),
            seed: raw.seed.unwrap_or(123),
            keep_state_history: raw.keep_state_history.unwrap_or(false),
            scheduler: raw.scheduler.unwrap_or_else(|| "NoScheduler".to_string()),
            hosts: raw.hosts.unwrap_or_default(),
            workload: raw.workload.unwrap_or_default(),
            el_prices: raw.el_prices,
            temperature: raw.temperature,
            power: raw.power.unwrap_or_default(),
        }
    }

    /// Checks values which cannot be repaired with defaults.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.step_duration <= 0. {
            return Err(SimulationError::Config("step_duration must be positive".to_string()));
        }
        if self.simulation_length < 0. {
            return Err(SimulationError::Config("simulation_length must not be negative".to_string()));
        }
        for host in self.hosts.iter() {
            let count = host.count.unwrap_or(1);
            if count == 1 && host.name.is_none() && host.name_prefix.is_none() {
                return Err(SimulationError::Config("host config requires name or name_prefix".to_string()));
            }
            if count > 1 && host.name_prefix.is_none() {
                return Err(SimulationError::Config(
                    "host config with count > 1 requires name_prefix".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns `(name, capacity, location)` of each configured host in declaration order.
    pub fn host_list(&self) -> Vec<(String, Resources, Option<String>)> {
        let mut hosts = Vec::new();
        for host in self.hosts.iter() {
            let count = host.count.unwrap_or(1);
            for i in 0..count {
                let name = match (&host.name, &host.name_prefix) {
                    (Some(name), _) if count == 1 => name.clone(),
                    (_, Some(prefix)) => format!("{}{}", prefix, i + 1),
                    (Some(name), None) => format!("{}{}", name, i + 1),
                    (None, None) => format!("host{}", hosts.len()),
                };
                hosts.push((name, host.resources.clone(), host.location.clone()));
            }
        }
        hosts
    }
}
