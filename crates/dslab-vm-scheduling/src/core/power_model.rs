//! Physical host power consumption models.

use dyn_clone::{clone_trait_object, DynClone};

/// Power model is a function, which computes the power consumption of a physical host
/// based on its current utilization and simulation time.
pub trait PowerModel: DynClone {
    /// Returns the current power consumption of a physical host in watts.
    ///
    /// - `time` - current simulation time.
    /// - `utilization` - current host utilization of the primary resource.
    fn get_power(&self, time: f64, utilization: f64) -> f64;
}

clone_trait_object!(PowerModel);

/// Simple linear power model: `idle_power + utilization * (max_power - idle_power)`.
///
/// Hosts without VMs are assumed to be powered off, which is accounted by the caller.
#[derive(Clone)]
pub struct LinearPowerModel {
    idle_power: f64,
    max_power: f64,
}

impl LinearPowerModel {
    /// - `idle_power` - host power when it is on but not loaded.
    /// - `max_power` - host power when it is fully loaded.
    pub fn new(idle_power: f64, max_power: f64) -> Self {
        Self { idle_power, max_power }
    }
}

impl PowerModel for LinearPowerModel {
    fn get_power(&self, _time: f64, utilization: f64) -> f64 {
        self.idle_power + utilization.clamp(0., 1.) * (self.max_power - self.idle_power)
    }
}
