use rand::prelude::*;
use rand_pcg::Pcg64;

use dslab_vm_scheduling::core::action::Action;
use dslab_vm_scheduling::core::cloud::Cloud;
use dslab_vm_scheduling::core::cloud_state::CloudState;
use dslab_vm_scheduling::core::common::AllocationVerdict;
use dslab_vm_scheduling::core::error::{ActionError, Entity};
use dslab_vm_scheduling::core::resources::Resources;
use dslab_vm_scheduling::core::schedule::Schedule;
use dslab_vm_scheduling::core::vm::{VirtualMachine, VmStatus};

fn res(cpu: u64, ram: u64) -> Resources {
    Resources::new().with("cpu", cpu).with("ram", ram)
}

fn boot(state: &mut CloudState, id: u32, demand: Resources, host: Option<u32>) {
    Action::Boot {
        vm: VirtualMachine::new(id, demand),
        host,
    }
    .apply(state)
    .unwrap();
}

#[test]
fn test_allocate_and_deallocate() {
    let mut state = CloudState::new();
    let h = state.add_host("h", res(4, 8), None);
    boot(&mut state, 1, res(3, 2), None);
    assert_eq!(state.pending_vms().len(), 1);

    state.allocate(1, h).unwrap();
    assert_eq!(state.host_of(1), Some(h));
    assert_eq!(state.available(h).unwrap(), &res(1, 6));
    assert_eq!(state.load(h, "cpu"), 0.75);
    assert_eq!(state.active_hosts(), vec![h]);
    assert!(state.pending_vms().is_empty());

    // already allocated
    assert!(matches!(state.allocate(1, h), Err(ActionError::InvalidTransition { .. })));

    assert_eq!(state.deallocate(1), Ok(h));
    assert_eq!(state.available(h).unwrap(), &res(4, 8));
    assert_eq!(state.deallocate(1), Err(ActionError::NotAllocated(1)));
    assert!(state.check_capacity_invariant());
}

#[test]
fn test_allocation_errors() {
    let mut state = CloudState::new();
    let h = state.add_host("h", res(4, 8), None);
    boot(&mut state, 1, res(2, 10), None);

    assert_eq!(
        state.allocate(1, h),
        Err(ActionError::CapacityExceeded {
            vm_id: 1,
            host_id: h,
            resource: "ram".to_string(),
            requested: 10,
            available: 8,
        })
    );
    assert_eq!(state.allocate(1, 7), Err(ActionError::UnknownEntity(Entity::Host(7))));
    assert_eq!(state.allocate(2, h), Err(ActionError::UnknownEntity(Entity::Vm(2))));
    assert_eq!(
        state.can_allocate(&res(2, 10), h),
        AllocationVerdict::NotEnoughResource {
            resource: "ram".to_string(),
            requested: 10,
            available: 8,
        }
    );
    assert_eq!(state.can_allocate(&res(1, 1), 7), AllocationVerdict::HostNotFound);
    // failed allocation leaves state unchanged
    assert_eq!(state.available(h).unwrap(), &res(4, 8));
    assert_eq!(state.host_of(1), None);
}

#[test]
fn test_boot_with_host() {
    let mut state = CloudState::new();
    let h = state.add_host("h", res(4, 8), None);
    boot(&mut state, 1, res(3, 3), Some(h));
    assert_eq!(state.host_of(1), Some(h));
    assert_eq!(state.vm(1).unwrap().status, VmStatus::Running);

    // not enough capacity, VM stays pending
    boot(&mut state, 2, res(3, 3), Some(h));
    assert_eq!(state.host_of(2), None);
    assert_eq!(state.pending_vms().iter().map(|vm| vm.id).collect::<Vec<_>>(), vec![2]);

    // unknown host is an error
    let action = Action::Boot {
        vm: VirtualMachine::new(3, res(1, 1)),
        host: Some(5),
    };
    assert_eq!(action.apply(&mut state), Err(ActionError::UnknownEntity(Entity::Host(5))));
    assert!(!state.contains_vm(3));
}

#[test]
fn test_apply_is_not_idempotent() {
    let mut state = CloudState::new();
    let h1 = state.add_host("h1", res(4, 8), None);
    let h2 = state.add_host("h2", res(4, 8), None);
    let vm = VirtualMachine::new(1, res(1, 1));
    let boot = Action::Boot { vm, host: Some(h1) };
    boot.apply(&mut state).unwrap();
    assert!(matches!(boot.apply(&mut state), Err(ActionError::InvalidTransition { .. })));

    let migrate = Action::Migrate { vm_id: 1, host: h2 };
    migrate.apply(&mut state).unwrap();
    assert!(matches!(migrate.apply(&mut state), Err(ActionError::InvalidTransition { .. })));

    let shutdown = Action::Shutdown { vm_id: 1 };
    shutdown.apply(&mut state).unwrap();
    assert!(matches!(shutdown.apply(&mut state), Err(ActionError::InvalidTransition { .. })));
    // terminated VM cannot be booted again
    assert!(boot.apply(&mut state).is_err());
    assert!(state.is_terminated(1));
    assert!(!state.contains_vm(1));
    assert_eq!(state.available(h2).unwrap(), &res(4, 8));
}

#[test]
fn test_shutdown_unknown_vm() {
    let mut state = CloudState::new();
    state.add_host("h", res(4, 8), None);
    assert_eq!(
        Action::Shutdown { vm_id: 42 }.apply(&mut state),
        Err(ActionError::UnknownEntity(Entity::Vm(42)))
    );
}

#[test]
// Pause followed by Unpause on the same host restores the allocation and the available resources.
fn test_pause_unpause_restores_state() {
    let mut state = CloudState::new();
    let h1 = state.add_host("h1", res(4, 8), None);
    let h2 = state.add_host("h2", res(4, 8), None);
    boot(&mut state, 1, res(2, 3), Some(h2));
    boot(&mut state, 2, res(1, 1), Some(h1));
    let before = state.snapshot();

    Action::Pause { vm_id: 1 }.apply(&mut state).unwrap();
    assert_eq!(state.vm(1).unwrap().status, VmStatus::Paused);
    assert_eq!(state.host_of(1), None);
    assert_eq!(state.available(h2).unwrap(), &res(4, 8));
    assert_eq!(state.paused_vms().len(), 1);
    // paused VM is not pending
    assert!(state.pending_vms().is_empty());
    assert!(matches!(
        Action::Migrate { vm_id: 1, host: h1 }.apply(&mut state),
        Err(ActionError::InvalidTransition { .. })
    ));

    Action::Unpause { vm_id: 1, host: None }.apply(&mut state).unwrap();
    assert_eq!(state.host_of(1), Some(h2));
    assert_eq!(state.available(h2).unwrap(), before.available(h2).unwrap());
    assert_eq!(state.allocations(), before.allocations());
    assert_eq!(state.vm(1).unwrap().status, VmStatus::Running);
}

#[test]
fn test_unpause_requires_room() {
    let mut state = CloudState::new();
    let h = state.add_host("h", res(4, 8), None);
    boot(&mut state, 1, res(3, 3), Some(h));
    Action::Pause { vm_id: 1 }.apply(&mut state).unwrap();
    boot(&mut state, 2, res(2, 2), Some(h));

    let snapshot = state.snapshot();
    let result = Action::Unpause { vm_id: 1, host: None }.apply(&mut state);
    assert!(matches!(result, Err(ActionError::CapacityExceeded { .. })));
    assert_eq!(state, snapshot);

    // paused VM without last host needs explicit target
    boot(&mut state, 3, res(1, 1), None);
    Action::Pause { vm_id: 3 }.apply(&mut state).unwrap();
    let result = Action::Unpause { vm_id: 3, host: None }.apply(&mut state);
    assert!(matches!(result, Err(ActionError::InvalidTransition { .. })));
    Action::Unpause { vm_id: 3, host: Some(h) }.apply(&mut state).unwrap();
    assert_eq!(state.host_of(3), Some(h));
}

#[test]
// Failed unpause keeps the VM paused and unallocated.
fn test_failed_unpause_keeps_vm_paused() {
    let mut state = CloudState::new();
    let h1 = state.add_host("h1", res(4, 8), None);
    let h2 = state.add_host("h2", res(2, 2), None);
    boot(&mut state, 1, res(3, 3), Some(h1));
    Action::Pause { vm_id: 1 }.apply(&mut state).unwrap();
    let snapshot = state.snapshot();

    for target in [h2, 99] {
        assert!(Action::Unpause { vm_id: 1, host: Some(target) }.apply(&mut state).is_err());
        assert_eq!(state, snapshot);
        assert_eq!(state.vm(1).unwrap().status, VmStatus::Paused);
        assert_eq!(state.vm(1).unwrap().last_host, Some(h1));
    }
    Action::Unpause { vm_id: 1, host: None }.apply(&mut state).unwrap();
    assert_eq!(state.vm(1).unwrap().status, VmStatus::Running);
    assert_eq!(state.host_of(1), Some(h1));
}

#[test]
// Migration either moves the VM updating both hosts, or leaves the state unchanged.
fn test_migration_atomicity() {
    let mut state = CloudState::new();
    let h1 = state.add_host("h1", res(4, 8), None);
    let h2 = state.add_host("h2", res(2, 2), None);
    let h3 = state.add_host("h3", res(4, 4), None);
    boot(&mut state, 1, res(3, 3), Some(h1));

    let snapshot = state.snapshot();
    let result = Action::Migrate { vm_id: 1, host: h2 }.apply(&mut state);
    assert!(matches!(result, Err(ActionError::CapacityExceeded { host_id, .. }) if host_id == h2));
    assert_eq!(state, snapshot);

    let result = Action::Migrate { vm_id: 1, host: 9 }.apply(&mut state);
    assert_eq!(result, Err(ActionError::UnknownEntity(Entity::Host(9))));
    assert_eq!(state, snapshot);

    Action::Migrate { vm_id: 1, host: h3 }.apply(&mut state).unwrap();
    assert_eq!(state.host_of(1), Some(h3));
    assert_eq!(state.available(h1).unwrap(), &res(4, 8));
    assert_eq!(state.available(h3).unwrap(), &res(1, 1));
    assert_eq!(state.vms_on(h3), vec![1]);
    assert!(state.vms_on(h1).is_empty());
}

#[test]
// Random sequences of actions never break the capacity invariant.
fn test_capacity_invariant_random_actions() {
    let mut rng = Pcg64::seed_from_u64(7);
    let mut state = CloudState::new();
    for i in 0..4 {
        state.add_host(&format!("h{}", i), res(8, 16), None);
    }
    let mut next_vm = 0;
    for _ in 0..2000 {
        let vm_id = rng.gen_range(0..next_vm + 1);
        let host = rng.gen_range(0..5);
        let action = match rng.gen_range(0..6) {
            0 => {
                next_vm += 1;
                Action::Boot {
                    vm: VirtualMachine::new(next_vm, res(rng.gen_range(1..5), rng.gen_range(1..9))),
                    host: if rng.gen_bool(0.5) { Some(host) } else { None },
                }
            }
            1 => Action::Shutdown { vm_id },
            2 => Action::Pause { vm_id },
            3 => Action::Unpause {
                vm_id,
                host: if rng.gen_bool(0.5) { Some(host) } else { None },
            },
            _ => Action::Migrate { vm_id, host },
        };
        let _ = action.apply(&mut state);
        assert!(state.check_capacity_invariant(), "invariant broken by {}", action);
    }
}

#[test]
fn test_cloud_commit_and_reset() {
    let mut initial = CloudState::new();
    let h = initial.add_host("h", res(4, 8), None);
    let mut cloud = Cloud::new(initial.clone());

    cloud
        .apply_real(&Action::Boot {
            vm: VirtualMachine::new(1, res(3, 3)),
            host: None,
        })
        .unwrap();
    cloud
        .apply_real(&Action::Boot {
            vm: VirtualMachine::new(2, res(3, 3)),
            host: None,
        })
        .unwrap();

    let sandbox = cloud.prepare_sandbox().clone();
    assert_eq!(&sandbox, cloud.real());

    let mut schedule = Schedule::new();
    schedule.add(Action::Migrate { vm_id: 1, host: h }, 0.).unwrap();
    schedule.add(Action::Migrate { vm_id: 2, host: h }, 0.).unwrap();
    let outcome = cloud.commit(&schedule);
    assert_eq!(outcome.committed.len(), 1);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].action.vm_id(), 2);
    assert!(matches!(outcome.rejected[0].reason, ActionError::CapacityExceeded { .. }));
    assert_eq!(cloud.real().host_of(1), Some(h));
    assert!(cloud.sandbox().is_none());

    cloud.reset_to_real();
    assert_eq!(cloud.sandbox(), Some(cloud.real()));

    cloud.reset_to_initial();
    assert_eq!(cloud.real(), &initial);
    assert!(cloud.sandbox().is_none());
}
