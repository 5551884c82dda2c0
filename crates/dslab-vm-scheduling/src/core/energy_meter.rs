//! Energy meter calculates the host energy consumption.

/// Accumulates energy of a host with piecewise constant power.
#[derive(Debug, Clone, Default)]
pub struct EnergyMeter {
    energy_consumed: f64,
    current_power: f64,
    prev_time: f64,
}

impl EnergyMeter {
    /// Creates meter starting at the specified time.
    pub fn new(start_time: f64) -> Self {
        Self {
            prev_time: start_time,
            current_power: 0.0,
            energy_consumed: 0.0,
        }
    }

    /// Invoked each time the host power consumption is changed to update the total energy consumption.
    pub fn update(&mut self, time: f64, power: f64) {
        self.energy_consumed += (time - self.prev_time) * self.current_power;
        self.current_power = power;
        self.prev_time = time;
    }

    /// Returns the total energy consumption in joules (W * s).
    pub fn energy_consumed(&self) -> f64 {
        self.energy_consumed
    }

    /// Returns the total energy consumption in kWh.
    pub fn energy_consumed_kwh(&self) -> f64 {
        self.energy_consumed / 3.6e6
    }
}
