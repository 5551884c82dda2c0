//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::resources::Resources;

/// Status of virtual machine.
///
/// VM lifecycle is `Requested -> Running <-> Paused -> Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmStatus {
    Requested,
    Running,
    Paused,
    Terminated,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Requested => write!(f, "requested"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Paused => write!(f, "paused"),
            VmStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// Represents virtual machine (VM).
///
/// VM is characterized by its ID and resource demand. A running VM is either allocated on exactly one host or pending.
/// `last_host` remembers where a paused VM was running, so that it can be resumed on the same host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: u32,
    pub demand: Resources,
    pub status: VmStatus,
    pub last_host: Option<u32>,
}

impl VirtualMachine {
    /// Creates VM in requested status.
    pub fn new(id: u32, demand: Resources) -> Self {
        Self {
            id,
            demand,
            status: VmStatus::Requested,
            last_host: None,
        }
    }
}

impl Display for VirtualMachine {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "vm {} {} ({})", self.id, self.demand, self.status)
    }
}
