//! Background sampling of real power consumption.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;

use crate::core::error::SimulationError;

/// Source of power measurements of physical machines.
pub trait Wattmeter: Send {
    /// Returns the current active power (W) of each machine.
    fn measure(&mut self, machines: &[String]) -> Result<Vec<f64>, SimulationError>;
}

/// Power series collected by [`ContinuousEnergyMeter`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PowerMeasurements {
    pub machines: Vec<String>,
    /// Samples as (seconds since start, power of each machine).
    pub samples: Vec<(f64, Vec<f64>)>,
}

impl PowerMeasurements {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Energy (J) consumed by the machine, each sample holds until the next one.
    pub fn energy(&self, machine: &str) -> Option<f64> {
        let idx = self.machines.iter().position(|m| m == machine)?;
        Some(
            self.samples
                .windows(2)
                .map(|pair| (pair[1].0 - pair[0].0) * pair[0].1[idx])
                .sum(),
        )
    }

    /// Writes samples as CSV with `time` column followed by a column per machine.
    pub fn save_csv(&self, path: &str) -> Result<(), SimulationError> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["time".to_string()];
        header.extend(self.machines.iter().cloned());
        writer.write_record(&header)?;
        for (time, values) in self.samples.iter() {
            let mut record = vec![time.to_string()];
            record.extend(values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Energy meter which samples a wattmeter in a separate thread until stopped.
///
/// The quit signal is checked at each sampling interval boundary.
pub struct ContinuousEnergyMeter {
    quit: Sender<()>,
    handle: JoinHandle<Result<PowerMeasurements, SimulationError>>,
}

impl ContinuousEnergyMeter {
    /// Starts sampling the specified machines every `interval`.
    pub fn start(machines: Vec<String>, interval: Duration, mut wattmeter: Box<dyn Wattmeter>) -> Self {
        let (quit, quit_receiver) = channel::<()>();
        let handle = std::thread::spawn(move || {
            log::info!("energy meter started for {} machines", machines.len());
            let started = Instant::now();
            let mut data = PowerMeasurements {
                machines,
                samples: Vec::new(),
            };
            loop {
                let values = wattmeter.measure(&data.machines).map_err(|e| {
                    log::error!("wattmeter failed, quitting: {}", e);
                    e
                })?;
                data.samples.push((started.elapsed().as_secs_f64(), values));
                match quit_receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            log::info!("energy meter stopped after {} samples", data.samples.len());
            Ok(data)
        });
        Self { quit, handle }
    }

    /// Signals the sampling thread to quit and returns the collected measurements.
    pub fn stop(self) -> Result<PowerMeasurements, SimulationError> {
        // the thread may have already quit on wattmeter failure
        let _ = self.quit.send(());
        self.handle
            .join()
            .map_err(|_| SimulationError::Wattmeter("sampling thread panicked".to_string()))?
    }
}

/// Wattmeter producing noisy constant power, used for testing and demos.
pub struct SyntheticWattmeter {
    noise: Normal<f64>,
    rng: Pcg64,
}

impl SyntheticWattmeter {
    pub fn new(power: f64, noise_sd: f64, seed: u64) -> Result<Self, SimulationError> {
        let noise = Normal::new(power, noise_sd).map_err(|e| SimulationError::Wattmeter(e.to_string()))?;
        Ok(Self {
            noise,
            rng: Pcg64::seed_from_u64(seed),
        })
    }
}

impl Wattmeter for SyntheticWattmeter {
    fn measure(&mut self, machines: &[String]) -> Result<Vec<f64>, SimulationError> {
        Ok(machines.iter().map(|_| self.noise.sample(&mut self.rng).max(0.)).collect())
    }
}
