//! Execution sinks for committed actions.

use crate::core::action::Action;

/// Receives every action committed by the simulation.
///
/// Driver never controls scheduling decisions and must not fail on actions it does not support.
pub trait Driver {
    fn apply_action(&mut self, action: &Action, time: f64);
}

/// Ignores all actions.
#[derive(Default)]
pub struct NoDriver {}

impl Driver for NoDriver {
    fn apply_action(&mut self, _action: &Action, _time: f64) {}
}

/// Records committed actions as `(time, action)` events.
#[derive(Default)]
pub struct SimDriver {
    events: Vec<(f64, Action)>,
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(f64, Action)] {
        &self.events
    }
}

impl Driver for SimDriver {
    fn apply_action(&mut self, action: &Action, time: f64) {
        self.events.push((time, action.clone()));
    }
}
