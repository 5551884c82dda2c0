use dslab_vm_scheduling::core::action::Action;
use dslab_vm_scheduling::core::error::SimulationError;
use dslab_vm_scheduling::core::schedule::Schedule;

fn sample_schedule() -> Schedule {
    let mut schedule = Schedule::new();
    schedule.add(Action::Pause { vm_id: 1 }, 0.).unwrap();
    schedule.add(Action::Migrate { vm_id: 2, host: 0 }, 3600.).unwrap();
    schedule.add(Action::Pause { vm_id: 3 }, 3600.).unwrap();
    schedule.add(Action::Unpause { vm_id: 1, host: None }, 5400.).unwrap();
    schedule.add(Action::Shutdown { vm_id: 2 }, 7200.).unwrap();
    schedule
}

#[test]
fn test_add_rejects_decreasing_time() {
    let mut schedule = sample_schedule();
    let result = schedule.add(Action::Pause { vm_id: 4 }, 100.);
    assert!(matches!(result, Err(SimulationError::OutOfOrder { time, last }) if time == 100. && last == 7200.));
    assert_eq!(schedule.len(), 5);
    // equal time is fine
    schedule.add(Action::Pause { vm_id: 4 }, 7200.).unwrap();
    assert_eq!(schedule.last_time(), Some(7200.));
}

#[test]
// Windowing returns actions in [t, t + period) in insertion order and leaves the source unchanged.
fn test_filter_current_actions() {
    let schedule = sample_schedule();
    let source = schedule.clone();

    let window = schedule.filter_current_actions(3600., 3600.);
    let vms: Vec<u32> = window.actions().iter().map(|item| item.action.vm_id()).collect();
    assert_eq!(vms, vec![2, 3, 1]);
    assert!(window.actions().iter().all(|item| item.time >= 3600. && item.time < 7200.));
    assert_eq!(schedule, source);

    assert_eq!(schedule.filter_current_actions(0., 3600.).len(), 1);
    assert_eq!(schedule.filter_current_actions(7200., 3600.).len(), 1);
    assert!(schedule.filter_current_actions(10000., 3600.).is_empty());
}

#[test]
fn test_filter_by_predicate() {
    let schedule = sample_schedule();
    let without_pauses = schedule.filter(|item| !matches!(item.action, Action::Pause { .. }));
    assert_eq!(without_pauses.len(), 3);
    assert_eq!(schedule.len(), 5);
    let names: Vec<&str> = without_pauses.actions().iter().map(|item| item.action.name()).collect();
    assert_eq!(names, vec!["migrate", "unpause", "shutdown"]);
}

#[test]
fn test_extend() {
    let mut history = Schedule::new();
    history.add(Action::Pause { vm_id: 1 }, 0.).unwrap();
    history.extend(&sample_schedule().filter_current_actions(3600., 3600.)).unwrap();
    assert_eq!(history.len(), 4);

    let mut late = Schedule::new();
    late.add(Action::Pause { vm_id: 9 }, 10000.).unwrap();
    assert!(late.extend(&sample_schedule()).is_err());
}

#[test]
fn test_write_csv() {
    let schedule = sample_schedule().filter_current_actions(3600., 3600.);
    let mut buffer = Vec::new();
    schedule.write_csv(&mut buffer).unwrap();
    let csv = String::from_utf8(buffer).unwrap();
    assert_eq!(
        csv,
        "time,action,vm,host\n3600.0,migrate,2,0\n3600.0,pause,3,\n5400.0,unpause,1,\n"
    );
}
