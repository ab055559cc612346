extern crate tempdir;

use std::path::PathBuf;

use tempdir::TempDir;

use super::*;
use crate::file_system::FileSystemInteractor;

const REAL_FS: FileSystemInteractor = FileSystemInteractor { dry_run: false };

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new("config_folder").expect("A temp folder could not be created.");
    let file = dir.path().join("marrow.toml");
    std::fs::write(&file, contents).unwrap();
    (dir, file)
}

/// This test will fail if the semantics of the config file are changed.
/// If that happens, update the user documentation and make sure the rest of
/// the application reflects these changes.
#[test]
fn config_file_all_values() {
    let (_dir, file) = write_config(
        r#"
        job_directory = "/cluster/jobs"
        name_directory = true
        sim_name_directory = false
        dir_exist_ok = false

        [resources]
        job_name = "measles"
        nodes = 2
        ncpus = 4
        mem = "8gb"
        wall_time = "02:00:00"
        queue = "workq"
        email = "modeller@example.org"
        requeue = false
        modules = ["gcc", "openmpi"]
        mpi_type = "mpirun"
        max_running_jobs = 50
        array_batch_size = 25
        retries = 2

        [additional_args.placement]
        name = "-l"
        value = "place=scatter"
        "#,
    );

    let config = PlatformConfig::from_file(&file, &REAL_FS).unwrap();

    assert_eq!(config.job_directory, PathBuf::from("/cluster/jobs"));
    assert_eq!(config.resources.nodes, Some(2));
    assert_eq!(config.resources.mpi_type, MpiType::Mpirun);
    assert_eq!(config.resources.max_running_jobs, Some(50));
    assert_eq!(config.resources.retries, 2);
    assert_eq!(
        config.additional_args.unwrap()["placement"],
        QsubArg {
            name: "-l".to_string(),
            value: "place=scatter".to_string()
        }
    );
}

#[test]
fn config_defaults() {
    let (_dir, file) = write_config(r#"job_directory = "/cluster/jobs""#);

    let config = PlatformConfig::from_file(&file, &REAL_FS).unwrap();

    assert!(config.name_directory);
    assert!(!config.sim_name_directory);
    assert!(!config.dir_exist_ok);
    assert_eq!(config.resources.nodes, Some(1));
    assert_eq!(config.resources.max_running_jobs, Some(100));
    assert_eq!(config.resources.mpi_type, MpiType::Pmi2);
    assert!(config.resources.requeue);
    assert_eq!(config.resources.retries, 0);
}

/// A missing job directory is a fatal construction error, not something
/// discovered at submission time.
#[test]
fn missing_job_directory_fails_construction() {
    let (_dir, file) = write_config(r#"[resources]"#);
    assert!(PlatformConfig::from_file(&file, &REAL_FS).is_err());

    let (_dir, file) = write_config(r#"job_directory = """#);
    assert!(PlatformConfig::from_file(&file, &REAL_FS).is_err());
}

#[test]
fn invalid_mpi_type_fails_construction() {
    let (_dir, file) = write_config(
        r#"
        job_directory = "/cluster/jobs"
        [resources]
        mpi_type = "telepathy"
        "#,
    );

    assert!(PlatformConfig::from_file(&file, &REAL_FS).is_err());
}

#[test]
fn relative_job_directory_is_anchored() {
    let (_dir, file) = write_config(r#"job_directory = "jobs""#);

    let config = PlatformConfig::from_file(&file, &REAL_FS).unwrap();

    assert!(config.job_directory.is_absolute());
    assert!(config.job_directory.ends_with("jobs"));
}

fn sample_config(job_directory: &str) -> PlatformConfig {
    PlatformConfig {
        job_directory: PathBuf::from(job_directory),
        resources: ResourceRequest::default(),
        name_directory: true,
        sim_name_directory: false,
        dir_exist_ok: false,
        additional_args: None,
    }
}

#[test]
fn addressing_is_deterministic() {
    let config = sample_config("/cluster/jobs");

    assert_eq!(config.suite_dir("flu"), PathBuf::from("/cluster/jobs/flu"));
    assert_eq!(
        config.experiment_dir("flu", "baseline"),
        PathBuf::from("/cluster/jobs/flu/baseline")
    );
    assert_eq!(
        config.simulation_dir("flu", "baseline", 17),
        PathBuf::from("/cluster/jobs/flu/baseline/17")
    );

    // Same identity, same path.
    assert_eq!(
        config.simulation_dir("flu", "baseline", 17),
        config.simulation_dir("flu", "baseline", 17)
    );
}

#[test]
fn addressing_honours_naming_toggles() {
    let mut config = sample_config("/cluster/jobs");
    config.name_directory = false;
    config.sim_name_directory = true;

    assert_eq!(
        config.experiment_dir("flu", "baseline"),
        PathBuf::from("/cluster/jobs/baseline")
    );
    assert_eq!(config.simulation_dir_name("baseline", 3), "baseline_3");
}
