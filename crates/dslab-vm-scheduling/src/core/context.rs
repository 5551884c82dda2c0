//! Simulation clock and named component contexts.

use std::cell::Cell;
use std::rc::Rc;

/// Shared simulation clock.
///
/// The clock is advanced only by the simulation loop, all contexts created from it observe the same time.
#[derive(Clone, Default)]
pub struct SimulationClock {
    time: Rc<Cell<f64>>,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        self.time.get()
    }

    pub fn set_time(&self, time: f64) {
        self.time.set(time);
    }

    /// Creates a context for the component with the specified name.
    pub fn create_context<S: AsRef<str>>(&self, name: S) -> SimulationContext {
        SimulationContext {
            name: name.as_ref().to_string(),
            clock: self.clone(),
        }
    }
}

/// Component view of the simulation: its name and the current simulation time.
#[derive(Clone)]
pub struct SimulationContext {
    name: String,
    clock: SimulationClock,
}

impl SimulationContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }
}
