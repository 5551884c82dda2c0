//! Exhaustive search scheduler used as an oracle for heuristics.

use std::collections::HashMap;

use crate::core::action::Action;
use crate::core::cloud_state::CloudState;
use crate::core::common::AllocationVerdict;
use crate::core::config::options::parse_option;
use crate::core::environment::KnownData;
use crate::core::error::SimulationError;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{Scheduler, SchedulingInput};
use crate::core::vm::VirtualMachine;
use crate::{log_debug, log_trace};

/// Scoring function minimized by [`BruteForce`].
pub trait PlacementObjective {
    /// Returns the score of the state `after` obtained from the state `before`. Lower is better.
    fn score(&self, before: &CloudState, after: &CloudState, known: &KnownData, time: f64) -> f64;

    fn name(&self) -> &str;
}

/// Number of hosts with at least one allocated VM.
pub struct ActiveHosts;

impl PlacementObjective for ActiveHosts {
    fn score(&self, _before: &CloudState, after: &CloudState, _known: &KnownData, _time: f64) -> f64 {
        after.active_hosts().len() as f64
    }

    fn name(&self) -> &str {
        "active_pms"
    }
}

/// Number of allocated VMs moved to another host.
pub struct MigrationCount;

impl PlacementObjective for MigrationCount {
    fn score(&self, before: &CloudState, after: &CloudState, _known: &KnownData, _time: f64) -> f64 {
        before
            .allocations()
            .iter()
            .filter(|(vm_id, host)| after.host_of(**vm_id).map_or(false, |h| h != **host))
            .count() as f64
    }

    fn name(&self) -> &str {
        "migrations"
    }
}

/// Sum of electricity prices at the locations of active hosts.
/// Hosts in locations without known price are counted with unit price.
pub struct EnergyCost;

impl PlacementObjective for EnergyCost {
    fn score(&self, _before: &CloudState, after: &CloudState, known: &KnownData, time: f64) -> f64 {
        after
            .active_hosts()
            .into_iter()
            .map(|host_id| {
                let location = after.host(host_id).and_then(|host| host.location.as_deref());
                known.el_prices.value_at(location, time).unwrap_or(1.)
            })
            .sum()
    }

    fn name(&self) -> &str {
        "energy_cost"
    }
}

pub fn objective_resolver(name: &str) -> Result<Box<dyn PlacementObjective>, SimulationError> {
    match name {
        "active_pms" => Ok(Box::new(ActiveHosts)),
        "migrations" => Ok(Box::new(MigrationCount)),
        "energy_cost" => Ok(Box::new(EnergyCost)),
        _ => Err(SimulationError::Config(format!("unknown placement objective: {}", name))),
    }
}

/// Enumerates all assignments of pending VMs (and optionally allocated running VMs) to hosts and picks
/// the one with the fewest unplaced VMs and the lowest objective score.
///
/// The search is bounded by the number of VMs and hosts and by the number of evaluated complete assignments.
/// Exceeding any bound results in [`SimulationError::SchedulerTimeout`].
pub struct BruteForce {
    objective: Box<dyn PlacementObjective>,
    max_vms: usize,
    max_hosts: usize,
    max_evaluations: u64,
    include_running: bool,
}

impl BruteForce {
    pub fn new(objective: Box<dyn PlacementObjective>) -> Self {
        Self {
            objective,
            max_vms: 8,
            max_hosts: 8,
            max_evaluations: 1_000_000,
            include_running: false,
        }
    }

    pub fn with_limits(mut self, max_vms: usize, max_hosts: usize, max_evaluations: u64) -> Self {
        self.max_vms = max_vms;
        self.max_hosts = max_hosts;
        self.max_evaluations = max_evaluations;
        self
    }

    /// Allows moving already allocated VMs.
    pub fn include_running(mut self, include_running: bool) -> Self {
        self.include_running = include_running;
        self
    }

    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, SimulationError> {
        let objective = objective_resolver(options.get("objective").map_or("active_pms", |s| s.as_str()))?;
        let mut scheduler = Self::new(objective);
        if let Some(max_vms) = parse_option(options, "max_vms")? {
            scheduler.max_vms = max_vms;
        }
        if let Some(max_hosts) = parse_option(options, "max_hosts")? {
            scheduler.max_hosts = max_hosts;
        }
        if let Some(max_evaluations) = parse_option(options, "max_evaluations")? {
            scheduler.max_evaluations = max_evaluations;
        }
        if let Some(include_running) = parse_option(options, "include_running")? {
            scheduler.include_running = include_running;
        }
        Ok(scheduler)
    }

    fn timeout(&self, reason: String) -> SimulationError {
        SimulationError::SchedulerTimeout {
            scheduler: self.name(),
            reason,
        }
    }

    /// Returns the best assignment of candidates to hosts together with its number of unplaced VMs and score.
    pub fn search(
        &self,
        state: &CloudState,
        known: &KnownData,
        time: f64,
    ) -> Result<Option<Assignment>, SimulationError> {
        let mut candidates: Vec<VirtualMachine> = state.pending_vms().into_iter().cloned().collect();
        let pending_count = candidates.len();
        if self.include_running {
            candidates.extend(
                state
                    .running_vms()
                    .into_iter()
                    .filter(|vm| state.host_of(vm.id).is_some())
                    .cloned(),
            );
        }
        if candidates.is_empty() {
            return Ok(None);
        }
        if candidates.len() > self.max_vms {
            return Err(self.timeout(format!("{} vms exceed the limit of {}", candidates.len(), self.max_vms)));
        }
        let hosts = state.host_ids();
        if hosts.len() > self.max_hosts {
            return Err(self.timeout(format!("{} hosts exceed the limit of {}", hosts.len(), self.max_hosts)));
        }

        let mut working = state.snapshot();
        for vm in candidates[pending_count..].iter() {
            working.deallocate(vm.id)?;
        }
        let mut search = Search {
            objective: self.objective.as_ref(),
            before: state,
            known,
            time,
            candidates: &candidates,
            pending_count,
            hosts: &hosts,
            current: vec![None; candidates.len()],
            best: None,
            evaluations: 0,
            max_evaluations: self.max_evaluations,
        };
        if !search.visit(&mut working, 0, 0) {
            return Err(self.timeout(format!("more than {} evaluations", self.max_evaluations)));
        }
        Ok(search.best.map(|(unplaced, score, hosts)| Assignment {
            placements: candidates.iter().map(|vm| vm.id).zip(hosts).collect(),
            unplaced,
            score,
        }))
    }
}

/// Result of the exhaustive search.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// Target host of each candidate VM, `None` means that the VM stays pending.
    pub placements: Vec<(u32, Option<u32>)>,
    pub unplaced: usize,
    pub score: f64,
}

struct Search<'a> {
    objective: &'a dyn PlacementObjective,
    before: &'a CloudState,
    known: &'a KnownData,
    time: f64,
    candidates: &'a [VirtualMachine],
    pending_count: usize,
    hosts: &'a [u32],
    current: Vec<Option<u32>>,
    best: Option<(usize, f64, Vec<Option<u32>>)>,
    evaluations: u64,
    max_evaluations: u64,
}

impl<'a> Search<'a> {
    // returns false once the evaluation budget is exhausted
    fn visit(&mut self, state: &mut CloudState, idx: usize, unplaced: usize) -> bool {
        if let Some((best_unplaced, _, _)) = &self.best {
            if unplaced > *best_unplaced {
                return true;
            }
        }
        if idx == self.candidates.len() {
            self.evaluations += 1;
            if self.evaluations > self.max_evaluations {
                return false;
            }
            let score = self.objective.score(self.before, state, self.known, self.time);
            let improves = match &self.best {
                Some((best_unplaced, best_score, _)) => (unplaced, score) < (*best_unplaced, *best_score),
                None => true,
            };
            if improves {
                self.best = Some((unplaced, score, self.current.clone()));
            }
            return true;
        }

        let vm = &self.candidates[idx];
        for &host in self.hosts {
            if state.can_allocate(&vm.demand, host) != AllocationVerdict::Success {
                continue;
            }
            if state.allocate(vm.id, host).is_err() {
                continue;
            }
            self.current[idx] = Some(host);
            let within_budget = self.visit(state, idx + 1, unplaced);
            self.current[idx] = None;
            let _ = state.deallocate(vm.id);
            if !within_budget {
                return false;
            }
        }
        // only pending VMs may stay unplaced, allocated VMs always have their current host as an option
        if idx < self.pending_count {
            return self.visit(state, idx + 1, unplaced + 1);
        }
        true
    }
}

impl Scheduler for BruteForce {
    fn reevaluate(&mut self, input: &SchedulingInput) -> Result<Schedule, SimulationError> {
        let mut schedule = Schedule::new();
        let best = match self.search(input.state, input.known, input.time)? {
            Some(best) => best,
            None => return Ok(schedule),
        };
        log_debug!(
            input.ctx,
            "best assignment: {} unplaced, {} = {}",
            best.unplaced,
            self.objective.name(),
            best.score
        );

        let mut moves: Vec<Action> = best
            .placements
            .iter()
            .filter_map(|(vm_id, host)| match host {
                Some(host) if input.state.host_of(*vm_id) != Some(*host) => Some(Action::Migrate {
                    vm_id: *vm_id,
                    host: *host,
                }),
                _ => None,
            })
            .collect();

        // migrations to hosts which are freed by other migrations go after them
        let mut sandbox = input.state.snapshot();
        loop {
            let mut deferred = Vec::new();
            let count = moves.len();
            for action in moves.drain(..) {
                if action.apply(&mut sandbox).is_ok() {
                    schedule.add(action, input.time)?;
                } else {
                    deferred.push(action);
                }
            }
            if deferred.is_empty() {
                break;
            }
            if deferred.len() == count {
                for action in deferred {
                    log_trace!(input.ctx, "dropping cyclic move: {}", action);
                }
                break;
            }
            moves = deferred;
        }
        Ok(schedule)
    }

    fn name(&self) -> String {
        "BruteForce".to_string()
    }
}
