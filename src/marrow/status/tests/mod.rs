use super::*;
use crate::test_utils::running;
use crate::test_utils::sample_config;
use crate::test_utils::sample_experiment;
use crate::test_utils::FakeScheduler;
use crate::test_utils::REAL_FS;

#[test]
fn scheduler_codes_fold_into_three_states() {
    for code in ["Q", "H", "W", "T", "S"] {
        assert_eq!(state_from_code(code), State::Pending);
    }
    for code in ["R", "E", "B"] {
        assert_eq!(state_from_code(code), State::Running);
    }
    for code in ["F", "X"] {
        assert_eq!(state_from_code(code), State::Finished);
    }
}

#[test]
fn unknown_codes_count_as_pending() {
    assert_eq!(state_from_code("?"), State::Pending);
    assert_eq!(state_from_code(""), State::Pending);
}

#[test]
fn completions_come_from_the_status_files() {
    let (config, _tmp) = sample_config();
    let experiment = sample_experiment(&config, 3);

    let done = REAL_FS
        .truncate_and_canonicalize_folder(&config.simulation_dir("flu", "baseline", 0))
        .unwrap();
    REAL_FS
        .write_utf8_truncate(&done.join(JOB_STATUS_FILE_NAME), "0\n")
        .unwrap();

    let failed = REAL_FS
        .truncate_and_canonicalize_folder(&config.simulation_dir("flu", "baseline", 1))
        .unwrap();
    REAL_FS
        .write_utf8_truncate(&failed.join(JOB_STATUS_FILE_NAME), "137\n")
        .unwrap();

    let report =
        experiment_status(&config, &experiment, &FakeScheduler::default(), &REAL_FS).unwrap();

    assert_eq!(
        report.completions,
        vec![
            SimulationCompletion {
                index: 0,
                exit_code: Some(0),
            },
            SimulationCompletion {
                index: 1,
                exit_code: Some(137),
            },
            SimulationCompletion {
                index: 2,
                exit_code: None,
            },
        ]
    );
}

#[test]
fn an_unsubmitted_experiment_reports_no_jobs() {
    let (config, _tmp) = sample_config();
    let experiment = sample_experiment(&config, 1);

    let client = FakeScheduler::default();
    let report = experiment_status(&config, &experiment, &client, &REAL_FS).unwrap();

    assert!(report.jobs.is_empty());
    assert!(!report.submitted);
    assert_eq!(client.status_queries.get(), 0);
}

#[test]
fn the_record_drives_the_scheduler_query() {
    let (config, _tmp) = sample_config();
    let experiment = sample_experiment(&config, 1);

    REAL_FS
        .truncate_and_canonicalize_folder(&experiment.home)
        .unwrap();
    record::write_record(&experiment.home, &["1[].pbs01".to_string()], &REAL_FS).unwrap();

    let client = FakeScheduler {
        statuses: Some(vec![running("1[].pbs01")]),
        ..Default::default()
    };

    let report = experiment_status(&config, &experiment, &client, &REAL_FS).unwrap();

    assert_eq!(report.jobs, vec![running("1[].pbs01")]);
    assert_eq!(client.status_queries.get(), 1);
}

#[test]
fn an_unreachable_scheduler_still_reports_completions() {
    let (config, _tmp) = sample_config();
    let experiment = sample_experiment(&config, 1);

    REAL_FS
        .truncate_and_canonicalize_folder(&experiment.home)
        .unwrap();
    record::write_record(&experiment.home, &["1[].pbs01".to_string()], &REAL_FS).unwrap();

    let client = FakeScheduler {
        statuses: None,
        ..Default::default()
    };

    let report = experiment_status(&config, &experiment, &client, &REAL_FS).unwrap();

    assert!(report.jobs.is_empty());
    assert_eq!(report.completions.len(), 1);
}
