use super::*;

fn resources(
    max_running_jobs: Option<usize>,
    array_batch_size: Option<usize>,
) -> ResourceRequest {
    ResourceRequest {
        max_running_jobs,
        array_batch_size,
        ..ResourceRequest::default()
    }
}

fn ceiling(max_array_size: Option<usize>) -> SystemCapability {
    SystemCapability {
        scheduler_available: max_array_size.is_some(),
        max_array_size,
    }
}

#[test]
fn caller_cannot_exceed_administrative_ceiling() {
    let conf = reconcile(10, Some(500), None, None, &resources(Some(100), None), &ceiling(None));
    assert_eq!(conf.max_running_jobs, 100);

    let conf = reconcile(10, Some(50), None, None, &resources(Some(100), None), &ceiling(None));
    assert_eq!(conf.max_running_jobs, 50);
}

#[test]
fn max_running_jobs_defaults_to_one() {
    let conf = reconcile(10, None, None, None, &resources(None, None), &ceiling(None));
    assert_eq!(conf.max_running_jobs, 1);

    let conf = reconcile(10, Some(7), None, None, &resources(None, None), &ceiling(None));
    assert_eq!(conf.max_running_jobs, 7);

    let conf = reconcile(10, None, None, None, &resources(Some(42), None), &ceiling(None));
    assert_eq!(conf.max_running_jobs, 42);
}

/// When both a system ceiling and a preference exist, the result is the
/// three-way minimum, whichever of the three happens to be smallest.
#[test]
fn batch_size_three_way_minimum() {
    let orderings = [
        (5usize, 10usize, 20usize),
        (5, 20, 10),
        (10, 5, 20),
        (10, 20, 5),
        (20, 5, 10),
        (20, 10, 5),
    ];

    for (system, preferred, simulations) in orderings {
        let conf = reconcile(
            simulations,
            None,
            Some(preferred),
            None,
            &resources(None, None),
            &ceiling(Some(system)),
        );
        assert_eq!(conf.array_batch_size, 5, "failed for ({system}, {preferred}, {simulations})");
    }
}

#[test]
fn batch_size_within_simulation_count() {
    for count in [1usize, 2, 99, 250, 1001] {
        let conf = reconcile(count, None, None, None, &resources(None, None), &ceiling(None));
        assert!(conf.array_batch_size >= 1);
        assert!(conf.array_batch_size <= count);
        assert_eq!(conf.array_batch_size, count);
    }
}

#[test]
fn batch_size_never_exceeds_system_ceiling() {
    let conf = reconcile(250, None, None, None, &resources(None, None), &ceiling(Some(64)));
    assert_eq!(conf.array_batch_size, 64);

    let conf = reconcile(250, None, Some(1000), None, &resources(None, None), &ceiling(Some(64)));
    assert_eq!(conf.array_batch_size, 64);
}

/// An explicitly oversized caller batch size is clamped, never an error.
#[test]
fn oversized_caller_batch_size_is_clamped() {
    let conf = reconcile(250, None, Some(500), None, &resources(Some(100), None), &ceiling(Some(999)));
    assert_eq!(conf.array_batch_size, 250);
    assert_eq!(conf.max_running_jobs, 100);
}

#[test]
fn platform_defaults_apply_without_caller_overrides() {
    // 250 simulations, no caller overrides, platform allows 100 running,
    // system ceiling unknown.
    let conf = reconcile(250, None, None, None, &resources(Some(100), None), &ceiling(None));
    assert_eq!(conf.array_batch_size, 250);
    assert_eq!(conf.max_running_jobs, 100);
    assert!(conf.dependency);
}

#[test]
fn caller_preference_wins_over_platform_preference() {
    let conf = reconcile(250, None, Some(20), None, &resources(None, Some(80)), &ceiling(None));
    assert_eq!(conf.array_batch_size, 20);

    let conf = reconcile(250, None, None, None, &resources(None, Some(80)), &ceiling(None));
    assert_eq!(conf.array_batch_size, 80);
}

#[test]
fn dependency_mode_defaults_on() {
    let res = resources(None, None);
    assert!(reconcile(3, None, None, None, &res, &ceiling(None)).dependency);
    assert!(!reconcile(3, None, None, Some(false), &res, &ceiling(None)).dependency);
}

/// Reconciliation is a pure function: identical inputs, identical outputs.
#[test]
fn reconcile_is_idempotent() {
    let res = resources(Some(100), Some(30));
    let cap = ceiling(Some(500));

    let first = reconcile(250, Some(40), Some(25), Some(false), &res, &cap);
    let second = reconcile(250, Some(40), Some(25), Some(false), &res, &cap);

    assert_eq!(first, second);
}

#[test]
fn degenerate_inputs_stay_schedulable() {
    // A zero preference or ceiling can never produce an unschedulable array.
    let conf = reconcile(10, Some(0), Some(0), None, &resources(None, None), &ceiling(Some(0)));
    assert_eq!(conf.max_running_jobs, 1);
    assert_eq!(conf.array_batch_size, 1);
}
