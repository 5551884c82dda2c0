//! Simulated environment: clock, request stream and environmental signals.

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;

use crate::core::error::SimulationError;
use crate::core::request::VmRequest;
use crate::core::time_series::{GeoSeries, TimeSeries};

/// Electricity prices and temperatures per location.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KnownData {
    pub el_prices: GeoSeries,
    pub temperature: GeoSeries,
}

/// Source of simulation time, workload requests and environmental signals.
///
/// Time axis is fixed at construction and is advanced monotonically.
pub trait Environment {
    /// Moves clock to the next step and returns its time, or `None` if the time axis is exhausted.
    fn advance(&mut self) -> Option<f64>;

    /// Current time. Before the first `advance` it is the start of the time axis.
    fn time(&self) -> f64;

    fn period(&self) -> f64;

    /// All step times.
    fn times(&self) -> &[f64];

    /// Returns requests due by the current time which were not returned before.
    fn get_requests(&mut self) -> Vec<VmRequest>;

    /// Data known at the current time: real values up to now plus forecasts for the forecast horizon.
    fn known_data(&self) -> KnownData;

    /// Full real signals, used for evaluation.
    fn signals(&self) -> &KnownData;
}

/// Environment driven by pre-loaded requests and signal series.
pub struct SimulatedEnvironment {
    times: Vec<f64>,
    period: f64,
    step: Option<usize>,
    requests: Vec<VmRequest>,
    next_request: usize,
    signals: KnownData,
    forecast: KnownData,
    forecast_horizon: f64,
}

impl SimulatedEnvironment {
    /// Creates environment with steps `start, start + period, ...` before `end`.
    pub fn new(start: f64, end: f64, period: f64) -> Self {
        let mut times = Vec::new();
        if period > 0. {
            let mut step = 0;
            loop {
                let time = start + step as f64 * period;
                if time >= end {
                    break;
                }
                times.push(time);
                step += 1;
            }
        }
        Self {
            times,
            period,
            step: None,
            requests: Vec::new(),
            next_request: 0,
            signals: KnownData::default(),
            forecast: KnownData::default(),
            forecast_horizon: 0.,
        }
    }

    /// Sets request stream. Requests are ordered by time, keeping the given order for equal times.
    pub fn set_requests(&mut self, mut requests: Vec<VmRequest>) {
        requests.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.requests = requests;
        self.next_request = 0;
    }

    pub fn set_el_prices(&mut self, el_prices: GeoSeries) {
        self.forecast.el_prices = el_prices.clone();
        self.signals.el_prices = el_prices;
    }

    pub fn set_temperature(&mut self, temperature: GeoSeries) {
        self.forecast.temperature = temperature.clone();
        self.signals.temperature = temperature;
    }

    pub fn set_forecast_horizon(&mut self, horizon: f64) {
        self.forecast_horizon = horizon;
    }

    /// Replaces forecasts with real values distorted by Gaussian noise with the specified standard deviations.
    pub fn model_forecast_errors(&mut self, el_sd: f64, temp_sd: f64, seed: u64) -> Result<(), SimulationError> {
        let mut rng = Pcg64::seed_from_u64(seed);
        self.forecast.el_prices = add_noise(&self.signals.el_prices, el_sd, &mut rng)?;
        self.forecast.temperature = add_noise(&self.signals.temperature, temp_sd, &mut rng)?;
        Ok(())
    }

    pub fn requests(&self) -> &[VmRequest] {
        &self.requests
    }
}

fn add_noise(series: &GeoSeries, sd: f64, rng: &mut Pcg64) -> Result<GeoSeries, SimulationError> {
    if sd == 0. {
        return Ok(series.clone());
    }
    let normal = Normal::new(0., sd).map_err(|e| SimulationError::Config(format!("forecast error sd: {}", e)))?;
    let mut result = GeoSeries::new();
    for (location, s) in series.iter() {
        result.insert(location, s.map_after(f64::NEG_INFINITY, |v| v + normal.sample(rng)));
    }
    Ok(result)
}

fn merge_known(real: &GeoSeries, forecast: &GeoSeries, time: f64, horizon: f64) -> GeoSeries {
    let mut result = GeoSeries::new();
    for (location, s) in real.iter() {
        let mut points = s.until(time).points().to_vec();
        if let Some(f) = forecast.get(location) {
            points.extend_from_slice(f.between(time, time + horizon).points());
        }
        result.insert(location, TimeSeries::from_points(points));
    }
    result
}

impl Environment for SimulatedEnvironment {
    fn advance(&mut self) -> Option<f64> {
        let next = self.step.map_or(0, |step| step + 1);
        if next >= self.times.len() {
            self.step = Some(self.times.len());
            return None;
        }
        self.step = Some(next);
        Some(self.times[next])
    }

    fn time(&self) -> f64 {
        match self.step {
            Some(step) if step < self.times.len() => self.times[step],
            Some(_) => self.times.last().map_or(0., |t| t + self.period),
            None => self.times.first().copied().unwrap_or(0.),
        }
    }

    fn period(&self) -> f64 {
        self.period
    }

    fn times(&self) -> &[f64] {
        &self.times
    }

    fn get_requests(&mut self) -> Vec<VmRequest> {
        let time = self.time();
        let start = self.next_request;
        while self.next_request < self.requests.len() && self.requests[self.next_request].time <= time {
            self.next_request += 1;
        }
        self.requests[start..self.next_request].to_vec()
    }

    fn known_data(&self) -> KnownData {
        let time = self.time();
        KnownData {
            el_prices: merge_known(&self.signals.el_prices, &self.forecast.el_prices, time, self.forecast_horizon),
            temperature: merge_known(
                &self.signals.temperature,
                &self.forecast.temperature,
                time,
                self.forecast_horizon,
            ),
        }
    }

    fn signals(&self) -> &KnownData {
        &self.signals
    }
}
