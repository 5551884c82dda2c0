//! Time-indexed sequences of actions.

use std::fmt::{Display, Formatter};
use std::io::Write;

use serde::Serialize;

use crate::core::action::Action;
use crate::core::error::SimulationError;

/// Action planned for a specific time.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledAction {
    pub time: f64,
    pub action: Action,
}

#[derive(Serialize)]
struct ScheduleRow {
    time: f64,
    action: &'static str,
    vm: u32,
    host: Option<u32>,
}

/// Ordered sequence of actions with non-decreasing timestamps.
/// Actions sharing a timestamp keep their insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schedule {
    actions: Vec<ScheduledAction>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends action planned for the specified time.
    ///
    /// Fails if the time is earlier than the time of the last appended action.
    pub fn add(&mut self, action: Action, time: f64) -> Result<(), SimulationError> {
        if let Some(last) = self.last_time() {
            if time < last {
                return Err(SimulationError::OutOfOrder { time, last });
            }
        }
        self.actions.push(ScheduledAction { time, action });
        Ok(())
    }

    // callers guarantee the ordering
    pub(crate) fn push_ordered(&mut self, item: ScheduledAction) {
        self.actions.push(item);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Flat ordered view of the scheduled actions.
    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    pub fn last_time(&self) -> Option<f64> {
        self.actions.last().map(|item| item.time)
    }

    /// Returns a new schedule with the actions planned for `[time, time + period)`.
    pub fn filter_current_actions(&self, time: f64, period: f64) -> Schedule {
        self.filter(|item| item.time >= time && item.time < time + period)
    }

    /// Returns a new schedule with the actions matching the predicate. The source schedule is not changed.
    pub fn filter<P: Fn(&ScheduledAction) -> bool>(&self, predicate: P) -> Schedule {
        Schedule {
            actions: self.actions.iter().filter(|item| predicate(item)).cloned().collect(),
        }
    }

    /// Appends all actions of another schedule.
    pub fn extend(&mut self, other: &Schedule) -> Result<(), SimulationError> {
        for item in other.actions.iter() {
            self.add(item.action.clone(), item.time)?;
        }
        Ok(())
    }

    /// Writes the schedule as CSV with `time,action,vm,host` columns.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SimulationError> {
        let mut writer = csv::Writer::from_writer(writer);
        for item in self.actions.iter() {
            writer.serialize(ScheduleRow {
                time: item.time,
                action: item.action.name(),
                vm: item.action.vm_id(),
                host: item.action.target_host(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &str) -> Result<(), SimulationError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduledAction;
    type IntoIter = std::slice::Iter<'a, ScheduledAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for item in self.actions.iter() {
            writeln!(f, "{:.3}: {}", item.time, item.action)?;
        }
        Ok(())
    }
}
