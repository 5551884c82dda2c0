//! Tools for running experiments comparing schedulers on the same workload.

use std::fs;
use std::fs::File;
use std::sync::{Arc, Mutex};

use dyn_clone::{clone_trait_object, DynClone};
use indexmap::map::IndexMap;
use threadpool::ThreadPool;

use crate::core::config::sim_config::SimulationConfig;
use crate::core::error::SimulationError;
use crate::evaluator::{EvaluationResults, Evaluator};
use crate::simulation::CloudSimulation;

/// Trait for implementing custom callbacks for simulation runs within an experiment.
pub trait SimulationCallbacks: DynClone + Send {
    /// Runs before starting a simulation run.
    fn on_simulation_start(&mut self, _sim: &mut CloudSimulation) {}

    /// Runs on each step of a simulation run, returns false if the simulation must be stopped.
    fn on_step(&mut self, _sim: &mut CloudSimulation) -> bool {
        true
    }
}

clone_trait_object!(SimulationCallbacks);

/// Callbacks which do nothing.
#[derive(Clone)]
pub struct NoCallbacks;

impl SimulationCallbacks for NoCallbacks {}

/// Runs simulation described by the config until the end of its time axis and evaluates the results.
pub fn run_single(config: &SimulationConfig) -> Result<(CloudSimulation, EvaluationResults), SimulationError> {
    run_with_callbacks(config, &mut NoCallbacks)
}

fn run_with_callbacks(
    config: &SimulationConfig,
    callbacks: &mut dyn SimulationCallbacks,
) -> Result<(CloudSimulation, EvaluationResults), SimulationError> {
    let mut sim = CloudSimulation::from_config(config)?;
    callbacks.on_simulation_start(&mut sim);
    while sim.step()? {
        if !callbacks.on_step(&mut sim) {
            break;
        }
    }
    sim.finalize();
    let results = Evaluator::from_config(&config.power).evaluate_simulation(&sim)?;
    Ok((sim, results))
}

/// Implements execution of experiment: the same simulation config is run with each of the schedulers.
pub struct Experiment {
    pub config: SimulationConfig,
    pub schedulers: Vec<String>,
    pub callbacks: Box<dyn SimulationCallbacks>,
    pub log_dir: Option<String>,
}

impl Experiment {
    pub fn new(
        config: SimulationConfig,
        schedulers: Vec<String>,
        callbacks: Box<dyn SimulationCallbacks>,
        log_dir: Option<String>,
    ) -> Result<Self, SimulationError> {
        if let Some(dir) = log_dir.as_ref() {
            fs::create_dir_all(dir)?;
        }
        Ok(Self {
            config,
            schedulers,
            callbacks,
            log_dir,
        })
    }

    /// Runs the experiment using the specified number of threads.
    ///
    /// Returns results keyed by scheduler config in the order of schedulers. The first failed run fails
    /// the experiment.
    pub fn run(&mut self, num_threads: usize) -> Result<IndexMap<String, EvaluationResults>, SimulationError> {
        let results = Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(num_threads.max(1));

        for (run_id, scheduler) in self.schedulers.iter().enumerate() {
            let mut run_config = self.config.clone();
            run_config.scheduler = scheduler.clone();
            let mut callbacks = self.callbacks.clone();
            let schedule_file = self
                .log_dir
                .as_ref()
                .map(|dir| format!("{}/schedule_{}.csv", dir, file_safe(scheduler)));
            let results = results.clone();

            pool.execute(move || {
                log::info!("RUN {}: {}", run_id, run_config.scheduler);
                let run_result = run_with_callbacks(&run_config, callbacks.as_mut()).and_then(|(sim, evaluation)| {
                    if let Some(path) = schedule_file {
                        sim.schedule().save_csv(&path)?;
                    }
                    Ok(evaluation)
                });
                if let Ok(mut results) = results.lock() {
                    results.push((run_id, run_config.scheduler, run_result));
                }
            });
        }

        pool.join();
        let mut runs = match results.lock() {
            Ok(mut results) => std::mem::take(&mut *results),
            Err(_) => return Err(SimulationError::Scheduler("experiment run panicked".to_string())),
        };
        if runs.len() != self.schedulers.len() {
            return Err(SimulationError::Scheduler("experiment run panicked".to_string()));
        }
        runs.sort_by_key(|(run_id, _, _)| *run_id);

        let mut output = IndexMap::new();
        for (_, scheduler, run_result) in runs {
            output.insert(scheduler, run_result?);
        }

        if let Some(dir) = self.log_dir.as_ref() {
            let mut file = File::create(format!("{}/results.json", dir))?;
            serde_json::to_writer_pretty(&mut file, &output)?;
        }
        Ok(output)
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
