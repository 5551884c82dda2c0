use std::thread;
use std::time::Duration;

use dslab_vm_scheduling::core::error::SimulationError;
use dslab_vm_scheduling::extensions::energy_sampler::{
    ContinuousEnergyMeter, PowerMeasurements, SyntheticWattmeter, Wattmeter,
};

#[test]
fn test_continuous_energy_meter() {
    let machines = vec!["m1".to_string(), "m2".to_string()];
    let wattmeter = SyntheticWattmeter::new(100., 0., 123).unwrap();
    let meter = ContinuousEnergyMeter::start(machines.clone(), Duration::from_millis(5), Box::new(wattmeter));
    thread::sleep(Duration::from_millis(50));
    let data = meter.stop().unwrap();

    assert_eq!(data.machines, machines);
    assert!(!data.is_empty());
    assert!(data.samples.iter().all(|(_, values)| values == &vec![100., 100.]));
    assert!(data.samples.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert!(data.energy("m1").unwrap() >= 0.);
    assert!(data.energy("unknown").is_none());
}

struct BrokenWattmeter {
    calls: u32,
}

impl Wattmeter for BrokenWattmeter {
    fn measure(&mut self, machines: &[String]) -> Result<Vec<f64>, SimulationError> {
        self.calls += 1;
        if self.calls > 2 {
            return Err(SimulationError::Wattmeter("connection lost".to_string()));
        }
        Ok(vec![50.; machines.len()])
    }
}

#[test]
// Wattmeter failure stops sampling and is reported on stop.
fn test_wattmeter_failure() {
    let meter = ContinuousEnergyMeter::start(
        vec!["m1".to_string()],
        Duration::from_millis(1),
        Box::new(BrokenWattmeter { calls: 0 }),
    );
    thread::sleep(Duration::from_millis(50));
    assert!(matches!(meter.stop(), Err(SimulationError::Wattmeter(_))));
}

#[test]
fn test_energy_of_measurements() {
    let data = PowerMeasurements {
        machines: vec!["m1".to_string(), "m2".to_string()],
        samples: vec![(0., vec![100., 10.]), (2., vec![200., 10.]), (3., vec![0., 0.])],
    };
    assert_eq!(data.len(), 3);
    assert_eq!(data.energy("m1"), Some(400.));
    assert_eq!(data.energy("m2"), Some(30.));
}

#[test]
fn test_synthetic_wattmeter_rejects_bad_noise() {
    assert!(SyntheticWattmeter::new(100., f64::NAN, 1).is_err());
}
