//! Time-stepped simulation loop.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use crate::core::action::Action;
use crate::core::cloud::{Cloud, RejectedAction};
use crate::core::cloud_state::CloudState;
use crate::core::config::sim_config::{SignalConfig, SimulationConfig};
use crate::core::context::{SimulationClock, SimulationContext};
use crate::core::driver::{Driver, NoDriver};
use crate::core::environment::{Environment, SimulatedEnvironment};
use crate::core::error::SimulationError;
use crate::core::request::VmRequest;
use crate::core::schedule::Schedule;
use crate::core::scheduler::{scheduler_resolver, Scheduler, SchedulingInput};
use crate::core::time_series::{GeoSeries, TimeSeries};
use crate::extensions::dataset_reader::requests_from_dataset;
use crate::extensions::standard_dataset_reader::StandardDatasetReader;
use crate::extensions::workload_generator::RandomWorkloadGenerator;
use crate::{log_debug, log_error, log_info, log_warn};

/// Simulation of a cloud controlled by a scheduler.
///
/// On each step the environment advances the clock and emits due requests, which are applied to the real state
/// as boot and shutdown actions. Then the scheduler is invoked on a sandbox copy of the real state, and the
/// proposed actions planned for the current step are validated and committed. Every committed action is passed
/// to the driver and appended to the real schedule.
pub struct CloudSimulation {
    cloud: Cloud,
    environment: Box<dyn Environment>,
    scheduler: Box<dyn Scheduler>,
    driver: Rc<RefCell<dyn Driver>>,
    schedule: Schedule,
    rejected: Vec<RejectedAction>,
    keep_state_history: bool,
    state_history: Vec<(f64, CloudState)>,
    clock: SimulationClock,
    ctx: SimulationContext,
    scheduler_ctx: SimulationContext,
    initialized: bool,
    finalized: bool,
}

impl CloudSimulation {
    pub fn new(
        initial: CloudState,
        environment: Box<dyn Environment>,
        scheduler: Box<dyn Scheduler>,
        driver: Rc<RefCell<dyn Driver>>,
    ) -> Self {
        let clock = SimulationClock::new();
        clock.set_time(environment.time());
        let ctx = clock.create_context("simulation");
        let scheduler_ctx = clock.create_context(scheduler.name());
        Self {
            cloud: Cloud::new(initial),
            environment,
            scheduler,
            driver,
            schedule: Schedule::new(),
            rejected: Vec::new(),
            keep_state_history: false,
            state_history: Vec::new(),
            clock,
            ctx,
            scheduler_ctx,
            initialized: false,
            finalized: false,
        }
    }

    /// Builds simulation with hosts, workload, signals and scheduler described by the config.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let mut state = CloudState::new();
        for (name, capacity, location) in config.host_list() {
            state.add_host(&name, capacity, location);
        }
        let environment = build_environment(config)?;
        let scheduler = scheduler_resolver(&config.scheduler)?;
        let mut sim = Self::new(state, Box::new(environment), scheduler, rc!(refcell!(NoDriver {})));
        sim.keep_state_history(config.keep_state_history);
        Ok(sim)
    }

    /// Enables storing a snapshot of the real state after each step.
    pub fn keep_state_history(&mut self, keep: bool) {
        self.keep_state_history = keep;
    }

    /// Replaces the driver receiving committed actions.
    pub fn set_driver(&mut self, driver: Rc<RefCell<dyn Driver>>) {
        self.driver = driver;
    }

    pub fn current_time(&self) -> f64 {
        self.clock.time()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Performs a single simulation step. Returns false if the time axis is exhausted.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        if !self.initialized {
            self.scheduler.initialize()?;
            self.initialized = true;
        }
        let time = match self.environment.advance() {
            Some(time) => time,
            None => return Ok(false),
        };
        self.clock.set_time(time);
        let period = self.environment.period();

        let requests = self.environment.get_requests();
        let request_count = requests.len();
        for request in requests {
            self.apply_request(request, time)?;
        }

        let known = self.environment.known_data();
        let input = SchedulingInput {
            ctx: &self.scheduler_ctx,
            time,
            period,
            state: self.cloud.prepare_sandbox(),
            known: &known,
        };
        let proposed = match self.scheduler.reevaluate(&input) {
            Ok(schedule) => schedule,
            Err(SimulationError::SchedulerTimeout { scheduler, reason }) => {
                log_warn!(self.ctx, "scheduler {} timed out, skipping step: {}", scheduler, reason);
                Schedule::new()
            }
            Err(e) => {
                log_error!(self.ctx, "scheduler failed: {}", e);
                return Err(e);
            }
        };

        let current = proposed.filter_current_actions(time, period);
        let outcome = self.cloud.commit(&current);
        for rejected in outcome.rejected {
            log_warn!(self.ctx, "dropping {} at {:.3}: {}", rejected.action, rejected.time, rejected.reason);
            self.rejected.push(rejected);
        }
        for item in outcome.committed.actions() {
            self.driver.borrow_mut().apply_action(&item.action, item.time);
        }
        self.schedule.extend(&outcome.committed)?;
        log_debug!(
            self.ctx,
            "{} requests, {} proposed, {} committed, {} pending vms",
            request_count,
            current.len(),
            outcome.committed.len(),
            self.cloud.real().pending_vms().len()
        );

        if self.keep_state_history {
            self.state_history.push((time, self.cloud.real().snapshot()));
        }
        Ok(true)
    }

    fn apply_request(&mut self, request: VmRequest, time: f64) -> Result<(), SimulationError> {
        let action = request.to_action();
        match self.cloud.apply_real(&action) {
            Ok(()) => self.record(action, time),
            Err(reason) => {
                log_warn!(self.ctx, "skipping request {}: {}", action, reason);
                self.rejected.push(RejectedAction { time, action, reason });
                Ok(())
            }
        }
    }

    fn record(&mut self, action: Action, time: f64) -> Result<(), SimulationError> {
        self.driver.borrow_mut().apply_action(&action, time);
        self.schedule.add(action, time)
    }

    /// Runs the simulation until the time axis is exhausted or the specified number of steps is made.
    /// Returns the number of performed steps.
    pub fn run(&mut self, max_steps: Option<u64>) -> Result<u64, SimulationError> {
        let mut steps = 0;
        while max_steps.map_or(true, |max| steps < max) {
            if !self.step()? {
                log_info!(
                    self.ctx,
                    "finished: {} actions committed, {} rejected",
                    self.schedule.len(),
                    self.rejected.len()
                );
                self.finalize();
                break;
            }
            steps += 1;
        }
        Ok(steps)
    }

    /// Calls scheduler cleanup. Invoked automatically when the time axis is exhausted.
    pub fn finalize(&mut self) {
        if !self.finalized {
            self.scheduler.finalize();
            self.finalized = true;
        }
    }

    pub fn cloud(&self) -> &Cloud {
        &self.cloud
    }

    pub fn initial_state(&self) -> &CloudState {
        self.cloud.initial()
    }

    pub fn real_state(&self) -> &CloudState {
        self.cloud.real()
    }

    /// Committed actions including the applied requests.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn rejected(&self) -> &[RejectedAction] {
        &self.rejected
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    pub fn state_history(&self) -> &[(f64, CloudState)] {
        &self.state_history
    }
}

/// Builds environment with the workload and signals described by the config.
pub fn build_environment(config: &SimulationConfig) -> Result<SimulatedEnvironment, SimulationError> {
    let end = config.start_time + config.simulation_length;
    let mut environment = SimulatedEnvironment::new(config.start_time, end, config.step_duration);

    let mut requests = Vec::new();
    // generated VMs are numbered after the dataset ones
    let mut first_generated_id = 0;
    if let Some(dataset) = &config.workload.dataset {
        let mut reader = StandardDatasetReader::new();
        reader.parse(dataset)?;
        if let Some(max_id) = reader.vms().iter().map(|vm| vm.id).max() {
            first_generated_id = max_id
                .checked_add(1)
                .ok_or_else(|| SimulationError::Dataset("no VM ids left for the generator".to_string()))?;
        }
        requests.extend(requests_from_dataset(&mut reader));
    }
    if let Some(generator) = &config.workload.generator {
        let mut reader = RandomWorkloadGenerator::new(
            generator.count,
            first_generated_id,
            &generator.flavors,
            config.start_time,
            end,
            generator.mean_lifetime,
            generator.lifetime_sd,
            config.seed,
        )?;
        requests.extend(requests_from_dataset(&mut reader));
    }
    environment.set_requests(requests);

    if let Some(el_prices) = &config.el_prices {
        environment.set_el_prices(load_signal(el_prices)?);
    }
    if let Some(temperature) = &config.temperature {
        environment.set_temperature(load_signal(temperature)?);
    }
    environment.set_forecast_horizon(config.forecast_horizon);
    environment.model_forecast_errors(config.forecast_el_error_sd, config.forecast_temp_error_sd, config.seed)?;
    Ok(environment)
}

fn load_signal(config: &SignalConfig) -> Result<GeoSeries, SimulationError> {
    match config {
        SignalConfig::Constant(value) => Ok(GeoSeries::single(TimeSeries::constant(*value))),
        SignalConfig::File(path) => GeoSeries::from_csv_file(path),
    }
}
