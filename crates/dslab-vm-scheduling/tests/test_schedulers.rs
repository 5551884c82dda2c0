use std::collections::BTreeMap;

use dslab_vm_scheduling::core::action::Action;
use dslab_vm_scheduling::core::cloud_state::CloudState;
use dslab_vm_scheduling::core::context::SimulationClock;
use dslab_vm_scheduling::core::environment::KnownData;
use dslab_vm_scheduling::core::error::SimulationError;
use dslab_vm_scheduling::core::resources::Resources;
use dslab_vm_scheduling::core::schedule::Schedule;
use dslab_vm_scheduling::core::scheduler::{scheduler_resolver, Scheduler, SchedulingInput};
use dslab_vm_scheduling::core::schedulers::best_fit_decreasing::BestFitDecreasing;
use dslab_vm_scheduling::core::schedulers::brute_force::{ActiveHosts, BruteForce, EnergyCost, MigrationCount};
use dslab_vm_scheduling::core::schedulers::first_fit::FirstFit;
use dslab_vm_scheduling::core::schedulers::model_based::{
    HostFeatures, LinearScoringModel, ModelBased, PlacementModel, VmFeatures,
};
use dslab_vm_scheduling::core::schedulers::no_scheduler::NoScheduler;
use dslab_vm_scheduling::core::schedulers::peak_pauser::{PeakPauser, PeakSignal};
use dslab_vm_scheduling::core::time_series::{GeoSeries, TimeSeries};
use dslab_vm_scheduling::core::vm::VirtualMachine;

fn res(cpu: u64, ram: u64) -> Resources {
    Resources::new().with("cpu", cpu).with("ram", ram)
}

fn state_with(hosts: &[(u64, u64)], vms: &[(u64, u64)]) -> CloudState {
    let mut state = CloudState::new();
    for (i, (cpu, ram)) in hosts.iter().enumerate() {
        state.add_host(&format!("pm{}", i + 1), res(*cpu, *ram), None);
    }
    for (i, (cpu, ram)) in vms.iter().enumerate() {
        Action::Boot {
            vm: VirtualMachine::new(i as u32 + 1, res(*cpu, *ram)),
            host: None,
        }
        .apply(&mut state)
        .unwrap();
    }
    state
}

fn reevaluate(scheduler: &mut dyn Scheduler, state: &CloudState, known: &KnownData, time: f64) -> Schedule {
    try_reevaluate(scheduler, state, known, time).unwrap()
}

fn try_reevaluate(
    scheduler: &mut dyn Scheduler,
    state: &CloudState,
    known: &KnownData,
    time: f64,
) -> Result<Schedule, SimulationError> {
    let clock = SimulationClock::new();
    clock.set_time(time);
    let ctx = clock.create_context(scheduler.name());
    let input = SchedulingInput {
        ctx: &ctx,
        time,
        period: 3600.,
        state,
        known,
    };
    scheduler.reevaluate(&input)
}

fn apply_all(state: &CloudState, schedule: &Schedule) -> CloudState {
    let mut result = state.snapshot();
    for item in schedule {
        item.action.apply(&mut result).unwrap();
    }
    assert!(result.check_capacity_invariant());
    result
}

#[test]
fn test_no_scheduler() {
    let state = state_with(&[(4, 8)], &[(1, 1)]);
    let schedule = reevaluate(&mut NoScheduler::new(), &state, &KnownData::default(), 0.);
    assert!(schedule.is_empty());
}

#[test]
// Two hosts {4, 8}, pending VMs (2,2), (3,3), (1,1).
// BFD places VM 2 (3,3) on pm1 (tie with pm2 resolved by ID), pm1 has {1, 5} left.
// VM 1 (2,2) does not fit pm1 and goes to pm2, which has {2, 6} left.
// VM 3 (1,1) goes to pm1, which has the smallest remaining capacity.
fn test_best_fit_decreasing_scenario() {
    let state = state_with(&[(4, 8), (4, 8)], &[(2, 2), (3, 3), (1, 1)]);
    let schedule = reevaluate(&mut BestFitDecreasing::new(), &state, &KnownData::default(), 0.);

    let order: Vec<u32> = schedule.actions().iter().map(|item| item.action.vm_id()).collect();
    assert_eq!(order, vec![2, 1, 3]);

    let result = apply_all(&state, &schedule);
    assert_eq!(result.vms_on(0), vec![2, 3]);
    assert_eq!(result.vms_on(1), vec![1]);
    assert_eq!(result.available(0).unwrap(), &res(0, 4));
    assert_eq!(result.available(1).unwrap(), &res(2, 6));
    assert!(result.pending_vms().is_empty());
}

#[test]
// Identical inputs produce identical assignments, ties in demand are resolved by VM ID.
fn test_best_fit_decreasing_determinism() {
    let hosts = [(8, 16), (6, 12), (8, 16), (4, 4)];
    let vms = [(2, 4), (4, 2), (2, 4), (4, 2), (1, 8), (3, 3), (2, 2), (4, 2)];
    let state = state_with(&hosts, &vms);
    let first = reevaluate(&mut BestFitDecreasing::new(), &state, &KnownData::default(), 0.);
    for _ in 0..5 {
        let state = state_with(&hosts, &vms);
        let next = reevaluate(&mut BestFitDecreasing::new(), &state, &KnownData::default(), 0.);
        assert_eq!(first, next);
    }
    let order: Vec<u32> = first.actions().iter().map(|item| item.action.vm_id()).collect();
    assert_eq!(&order[..3], &[2, 4, 8]);
    apply_all(&state, &first);
}

#[test]
fn test_best_fit_decreasing_leaves_unplaceable_pending() {
    let state = state_with(&[(4, 8)], &[(5, 1), (2, 2)]);
    let schedule = reevaluate(&mut BestFitDecreasing::new(), &state, &KnownData::default(), 0.);
    let result = apply_all(&state, &schedule);
    assert_eq!(result.pending_vms().iter().map(|vm| vm.id).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_first_fit() {
    let state = state_with(&[(2, 2), (8, 8), (8, 8)], &[(3, 3), (1, 1), (8, 8), (8, 8)]);
    let schedule = reevaluate(&mut FirstFit::new(), &state, &KnownData::default(), 0.);
    let result = apply_all(&state, &schedule);
    assert_eq!(result.host_of(1), Some(1));
    assert_eq!(result.host_of(2), Some(0));
    assert_eq!(result.host_of(3), Some(2));
    // no room left
    assert_eq!(result.host_of(4), None);
}

#[test]
// For workloads within the enumeration limits brute force is never worse than the heuristics.
fn test_brute_force_is_not_worse_than_heuristics() {
    let cases: Vec<(Vec<(u64, u64)>, Vec<(u64, u64)>)> = vec![
        (vec![(4, 8), (4, 8), (4, 8)], vec![(2, 2), (3, 3), (1, 1), (2, 4)]),
        (vec![(10, 10), (10, 10), (10, 10)], vec![(5, 1), (4, 4), (3, 6), (3, 2), (5, 5)]),
        (vec![(6, 6), (5, 5), (4, 4)], vec![(3, 3), (3, 3), (2, 2), (2, 2), (4, 4)]),
    ];
    let known = KnownData::default();
    for (hosts, vms) in cases {
        let state = state_with(&hosts, &vms);
        let brute = apply_all(
            &state,
            &reevaluate(&mut BruteForce::new(Box::new(ActiveHosts)), &state, &known, 0.),
        );
        for heuristic in [
            apply_all(&state, &reevaluate(&mut BestFitDecreasing::new(), &state, &known, 0.)),
            apply_all(&state, &reevaluate(&mut FirstFit::new(), &state, &known, 0.)),
        ] {
            let brute_key = (brute.pending_vms().len(), brute.active_hosts().len());
            let heuristic_key = (heuristic.pending_vms().len(), heuristic.active_hosts().len());
            assert!(brute_key <= heuristic_key, "{:?} > {:?}", brute_key, heuristic_key);
        }
    }
}

#[test]
fn test_brute_force_search_result() {
    // (3,3) and (1,1) fit together on one host, (2,2) needs another one
    let state = state_with(&[(4, 4), (4, 4), (4, 4)], &[(3, 3), (2, 2), (1, 1)]);
    let scheduler = BruteForce::new(Box::new(ActiveHosts));
    let best = scheduler.search(&state, &KnownData::default(), 0.).unwrap().unwrap();
    assert_eq!(best.unplaced, 0);
    assert_eq!(best.score, 2.);
    assert_eq!(best.placements, vec![(1, Some(0)), (2, Some(1)), (3, Some(0))]);
}

#[test]
fn test_brute_force_energy_cost_objective() {
    let mut state = CloudState::new();
    state.add_host("cheap", res(4, 4), Some("eu".to_string()));
    state.add_host("expensive", res(4, 4), Some("us".to_string()));
    Action::Boot {
        vm: VirtualMachine::new(1, res(2, 2)),
        host: None,
    }
    .apply(&mut state)
    .unwrap();
    let mut prices = GeoSeries::new();
    prices.insert("us", TimeSeries::constant(1.));
    prices.insert("eu", TimeSeries::constant(0.2));
    let known = KnownData {
        el_prices: prices,
        temperature: GeoSeries::new(),
    };
    let schedule = reevaluate(&mut BruteForce::new(Box::new(EnergyCost)), &state, &known, 0.);
    assert_eq!(
        schedule.actions()[0].action,
        Action::Migrate { vm_id: 1, host: 0 }
    );
}

#[test]
// Allocated VMs are consolidated when running VMs are included and migrations are not penalized.
fn test_brute_force_consolidation() {
    let mut state = state_with(&[(4, 4), (4, 4)], &[(2, 2), (2, 2)]);
    state.allocate(1, 0).unwrap();
    state.allocate(2, 1).unwrap();
    let known = KnownData::default();

    let mut consolidating = BruteForce::new(Box::new(ActiveHosts)).include_running(true);
    let result = apply_all(&state, &reevaluate(&mut consolidating, &state, &known, 0.));
    assert_eq!(result.active_hosts().len(), 1);

    let mut conservative = BruteForce::new(Box::new(MigrationCount)).include_running(true);
    assert!(reevaluate(&mut conservative, &state, &known, 0.).is_empty());
}

#[test]
fn test_brute_force_budget() {
    let state = state_with(&[(4, 4), (4, 4)], &[(1, 1), (1, 1), (1, 1)]);
    let known = KnownData::default();

    let mut scheduler = BruteForce::new(Box::new(ActiveHosts)).with_limits(8, 8, 1);
    let result = try_reevaluate(&mut scheduler, &state, &known, 0.);
    assert!(matches!(result, Err(SimulationError::SchedulerTimeout { .. })));

    let mut scheduler = BruteForce::new(Box::new(ActiveHosts)).with_limits(2, 8, 1000);
    let result = try_reevaluate(&mut scheduler, &state, &known, 0.);
    assert!(matches!(result, Err(SimulationError::SchedulerTimeout { .. })));

    let mut scheduler = BruteForce::new(Box::new(ActiveHosts)).with_limits(8, 1, 1000);
    let result = try_reevaluate(&mut scheduler, &state, &known, 0.);
    assert!(matches!(result, Err(SimulationError::SchedulerTimeout { .. })));
}

#[test]
fn test_peak_pauser() {
    let mut state = state_with(&[(4, 8), (4, 8)], &[(2, 2), (3, 3), (1, 1)]);
    state.allocate(1, 1).unwrap();
    state.allocate(2, 0).unwrap();
    let known = KnownData {
        el_prices: GeoSeries::single(TimeSeries::from_points(vec![(0., 10.), (3600., 1.)])),
        temperature: GeoSeries::new(),
    };
    let mut scheduler = PeakPauser::new(PeakSignal::Price, 5., None);

    // price is above the threshold, allocated VMs are paused, pending VM 3 is left alone
    let schedule = reevaluate(&mut scheduler, &state, &known, 0.);
    let paused = apply_all(&state, &schedule);
    assert_eq!(schedule.len(), 2);
    assert_eq!(paused.paused_vms().len(), 2);
    assert!(paused.active_hosts().is_empty());

    // price drops, VMs return to their hosts
    let schedule = reevaluate(&mut scheduler, &paused, &known, 3600.);
    let resumed = apply_all(&paused, &schedule);
    assert_eq!(resumed.host_of(1), Some(1));
    assert_eq!(resumed.host_of(2), Some(0));
    assert!(resumed.paused_vms().is_empty());

    // no signal data, no actions
    let schedule = reevaluate(&mut scheduler, &state, &KnownData::default(), 0.);
    assert!(schedule.is_empty());
}

#[test]
fn test_peak_pauser_unpauses_on_other_host() {
    let mut state = state_with(&[(4, 4), (4, 4)], &[(3, 3), (2, 2)]);
    state.allocate(1, 0).unwrap();
    Action::Pause { vm_id: 1 }.apply(&mut state).unwrap();
    // the last host of VM 1 is now occupied
    state.allocate(2, 0).unwrap();
    let known = KnownData {
        el_prices: GeoSeries::new(),
        temperature: GeoSeries::single(TimeSeries::constant(20.)),
    };
    let mut scheduler = PeakPauser::new(PeakSignal::Temperature, 25., None);
    let result = apply_all(&state, &reevaluate(&mut scheduler, &state, &known, 0.));
    assert_eq!(result.host_of(1), Some(1));
}

/// Model with fixed rankings used to check that suggestions are validated.
struct FixedModel {
    resources: Vec<String>,
    ranking: Vec<Vec<u32>>,
}

impl PlacementModel for FixedModel {
    fn resources(&self) -> &[String] {
        &self.resources
    }

    fn rank_hosts(&self, _vms: &[VmFeatures], _hosts: &[HostFeatures]) -> Result<Vec<Vec<u32>>, SimulationError> {
        Ok(self.ranking.clone())
    }
}

#[test]
// Infeasible and unknown hosts suggested by the model are skipped in rank order.
fn test_model_based_skips_infeasible_suggestions() {
    let state = state_with(&[(2, 2), (4, 4), (8, 8)], &[(3, 3), (8, 8), (1, 1)]);
    let model = FixedModel {
        resources: vec!["cpu".to_string(), "ram".to_string()],
        ranking: vec![vec![0, 42, 1, 2], vec![0, 1], vec![2]],
    };
    let mut scheduler = ModelBased::new(Box::new(model));
    let schedule = reevaluate(&mut scheduler, &state, &KnownData::default(), 0.);
    let result = apply_all(&state, &schedule);
    assert_eq!(result.host_of(1), Some(1));
    // no feasible host among suggestions
    assert_eq!(result.host_of(2), None);
    assert_eq!(result.host_of(3), Some(2));
}

#[test]
fn test_model_based_wrong_ranking_is_fatal() {
    let state = state_with(&[(4, 4)], &[(1, 1), (1, 1)]);
    let model = FixedModel {
        resources: vec!["cpu".to_string()],
        ranking: vec![vec![0]],
    };
    let result = try_reevaluate(&mut ModelBased::new(Box::new(model)), &state, &KnownData::default(), 0.);
    assert!(matches!(result, Err(SimulationError::Model(_))));
}

const LINEAR_MODEL: &str = r#"{
    "resources": ["cpu", "ram"],
    "vm_scaler": {"mean": [0, 0], "std": [1, 1]},
    "host_scaler": {"mean": [0, 0], "std": [1, 1]},
    "vm_weights": [0, 0],
    "host_weights": [-1, 0],
    "interaction_weights": [0, 0],
    "bias": 0
}"#;

#[test]
// The model prefers hosts with less available CPU, which makes it behave like best fit.
fn test_linear_scoring_model() {
    let model = LinearScoringModel::from_json(LINEAR_MODEL).unwrap();
    let state = state_with(&[(8, 8), (4, 8), (2, 8)], &[(3, 3)]);
    let mut scheduler = ModelBased::new(Box::new(model));
    let result = apply_all(&state, &reevaluate(&mut scheduler, &state, &KnownData::default(), 0.));
    assert_eq!(result.host_of(1), Some(1));
}

#[test]
fn test_malformed_model() {
    let truncated = LINEAR_MODEL.replace("\"host_weights\": [-1, 0]", "\"host_weights\": [-1]");
    assert!(matches!(
        LinearScoringModel::from_json(&truncated),
        Err(SimulationError::Model(_))
    ));
    assert!(matches!(
        LinearScoringModel::from_json("{not json"),
        Err(SimulationError::Model(_))
    ));
    let zero_std = LINEAR_MODEL.replace("\"std\": [1, 1]}", "\"std\": [0, 1]}");
    assert!(matches!(LinearScoringModel::from_json(&zero_std), Err(SimulationError::Model(_))));
}

#[test]
fn test_scheduler_resolver() {
    let names: BTreeMap<&str, &str> = [
        ("NoScheduler", "NoScheduler"),
        ("FBF", "FirstFit"),
        ("FirstFit", "FirstFit"),
        ("BFD", "BestFitDecreasing"),
        ("BruteForce[max_vms=4,objective=migrations]", "BruteForce"),
        ("PeakPauser[signal=temperature,threshold=30]", "PeakPauser"),
    ]
    .into_iter()
    .collect();
    for (config, name) in names {
        assert_eq!(scheduler_resolver(config).unwrap().name(), name);
    }
    assert!(matches!(scheduler_resolver("Unknown"), Err(SimulationError::Config(_))));
    assert!(matches!(scheduler_resolver("PeakPauser"), Err(SimulationError::Config(_))));
    assert!(matches!(
        scheduler_resolver("BruteForce[objective=fastest]"),
        Err(SimulationError::Config(_))
    ));
    assert!(matches!(scheduler_resolver("ModelBased"), Err(SimulationError::Config(_))));
    assert!(matches!(
        scheduler_resolver("ModelBased[model=/nonexistent/model.json]"),
        Err(SimulationError::Model(_))
    ));
}
