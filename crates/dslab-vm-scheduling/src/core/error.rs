//! Error types.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Entity referenced by an action or a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Vm(u32),
    Host(u32),
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Entity::Vm(id) => write!(f, "vm {}", id),
            Entity::Host(id) => write!(f, "host {}", id),
        }
    }
}

/// Violated precondition of an action. These errors are recoverable: the simulation drops the action and goes on.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ActionError {
    #[error("vm {vm_id} does not fit on host {host_id}: {requested} of {resource} requested, {available} available")]
    CapacityExceeded {
        vm_id: u32,
        host_id: u32,
        resource: String,
        requested: u64,
        available: u64,
    },
    #[error("vm {0} is not allocated")]
    NotAllocated(u32),
    #[error("invalid transition of vm {vm_id}: {reason}")]
    InvalidTransition { vm_id: u32, reason: String },
    #[error("unknown {0}")]
    UnknownEntity(Entity),
}

/// Errors surfacing from a simulation run.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("scheduler {scheduler} exceeded its search budget: {reason}")]
    SchedulerTimeout { scheduler: String, reason: String },
    #[error("action at time {time} is earlier than the last scheduled action at time {last}")]
    OutOfOrder { time: f64, last: f64 },
    #[error("scheduler failure: {0}")]
    Scheduler(String),
    #[error("malformed model artifact: {0}")]
    Model(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("wattmeter error: {0}")]
    Wattmeter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
