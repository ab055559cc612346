use std::collections::BTreeMap;
use std::env;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::bailc;
use crate::constants::EMPTY_MODULES;
use crate::constants::MAX_RUNNING_JOBS_DEFAULT;
use crate::constants::NODES_DEFAULT;
use crate::constants::RETRIES_DEFAULT;
use crate::constants::TRUE_DEFAULT;
use crate::error::ctx;
use crate::file_system::FileOperations;

/// The MPI mode embedded in the generated array job script.
///
/// `pmi2` and `pmix` let the scheduler's own launcher wire the processes up,
/// `mpirun` launches them independently. Anything else is rejected when the
/// configuration is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MpiType {
    /// For older versions of MPICH or OpenMPI, or an MPI library that
    /// explicitly requires PMI2.
    #[default]
    Pmi2,

    /// The scheduler-native PMIx wire-up.
    Pmix,

    /// Launch the processes independently through `mpirun`.
    Mpirun,
}

impl Display for MpiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MpiType::Pmi2 => write!(f, "pmi2"),
            MpiType::Pmix => write!(f, "pmix"),
            MpiType::Mpirun => write!(f, "mpirun"),
        }
    }
}

/// The structure for providing raw scheduler directives.
///
/// These are passed through to the array job script verbatim, as
/// `#PBS {name} {value}` lines. This is the escape hatch for options the
/// platform does not model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QsubArg {
    /// The flag of the directive, for example `-l`.
    pub name: String,

    /// The value of the directive, for example `place=scatter`.
    pub value: String,
}

/// The scheduler-facing resource request for every job of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRequest {
    /// The job name shown by the scheduler. Defaults to the experiment name.
    pub job_name: Option<String>,

    /// How many nodes to request per job.
    #[serde(default = "NODES_DEFAULT")]
    pub nodes: Option<usize>,

    /// CPUs to request per job.
    pub ncpus: Option<usize>,

    /// Memory to request per job, in scheduler notation, for example "8gb".
    pub mem: Option<String>,

    /// Limit on the runtime of each job, as hrs:min:sec.
    pub wall_time: Option<String>,

    /// Which queue to submit the jobs to.
    pub queue: Option<String>,

    /// Where the scheduler should send job status emails, if anywhere.
    pub email: Option<String>,

    /// Whether the jobs are eligible for requeuing after a node failure.
    #[serde(default = "TRUE_DEFAULT")]
    pub requeue: bool,

    /// Modules to load on the compute node before running.
    #[serde(default = "EMPTY_MODULES")]
    pub modules: Vec<String>,

    /// The MPI mode for the generated scripts.
    #[serde(default)]
    pub mpi_type: MpiType,

    /// The administrative ceiling on concurrently running jobs
    /// per experiment. A caller-supplied value can never exceed this.
    #[serde(default = "MAX_RUNNING_JOBS_DEFAULT")]
    pub max_running_jobs: Option<usize>,

    /// The preferred size of one submitted job array, if any.
    pub array_batch_size: Option<usize>,

    /// How many times a failing simulation is retried.
    #[serde(default = "RETRIES_DEFAULT")]
    pub retries: usize,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        ResourceRequest {
            job_name: None,
            nodes: NODES_DEFAULT(),
            ncpus: None,
            mem: None,
            wall_time: None,
            queue: None,
            email: None,
            requeue: true,
            modules: vec![],
            mpi_type: MpiType::default(),
            max_running_jobs: MAX_RUNNING_JOBS_DEFAULT(),
            array_batch_size: None,
            retries: 0,
        }
    }
}

/// The platform configuration, read from `marrow.toml`.
//
// changing this struct? existing job directories keep their old layout,
// so make sure the addressing functions below stay backwards compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// The root under which all suites, experiments and simulations live.
    ///
    /// This is the only required field; its absence fails construction.
    pub job_directory: PathBuf,

    /// The scheduler-facing resource request.
    #[serde(default)]
    pub resources: ResourceRequest,

    /// Whether suites get their own directory level. When disabled,
    /// experiments are addressed directly under the job directory.
    #[serde(default = "TRUE_DEFAULT")]
    pub name_directory: bool,

    /// Whether simulation directories are prefixed with the experiment name
    /// instead of being the bare index.
    #[serde(default)]
    pub sim_name_directory: bool,

    /// Whether creating an experiment whose directory already exists is
    /// allowed.
    #[serde(default)]
    pub dir_exist_ok: bool,

    /// Raw directives appended verbatim to the array job script.
    pub additional_args: Option<BTreeMap<String, QsubArg>>,
}

impl PlatformConfig {
    /// Load and validate the platform configuration.
    ///
    /// A missing `job_directory` or an unrecognized `mpi_type` fails here,
    /// never later. A relative job directory is anchored at the current
    /// working directory.
    pub fn from_file<F: FileOperations>(path: &Path, fs: &F) -> Result<PlatformConfig> {
        let mut config: PlatformConfig = fs.try_read_toml(path)?;

        if config.job_directory.as_os_str().is_empty() {
            bailc!(
                "No job directory configured", ;
                "The `job_directory` field of {path:?} is empty", ;
                "Set it to the directory that should hold all experiment files",
            );
        }

        if config.job_directory.is_relative() {
            config.job_directory = env::current_dir()
                .with_context(ctx!(
                  "Could not resolve the current working directory", ;
                  "Use an absolute `job_directory` in {path:?}",
                ))?
                .join(&config.job_directory);
        }

        Ok(config)
    }

    /// The directory of a suite. A pure function of identity.
    pub fn suite_dir(&self, suite: &str) -> PathBuf {
        if self.name_directory {
            self.job_directory.join(suite)
        } else {
            self.job_directory.clone()
        }
    }

    /// The directory of an experiment within its suite.
    pub fn experiment_dir(&self, suite: &str, experiment: &str) -> PathBuf {
        self.suite_dir(suite).join(experiment)
    }

    /// The directory name of one simulation within its experiment.
    pub fn simulation_dir_name(&self, experiment: &str, index: usize) -> String {
        format!("{}{index}", self.simulation_dir_prefix(experiment))
    }

    /// What precedes the index in a simulation's directory name.
    pub fn simulation_dir_prefix(&self, experiment: &str) -> String {
        if self.sim_name_directory {
            format!("{experiment}_")
        } else {
            String::new()
        }
    }

    /// The directory of one simulation.
    pub fn simulation_dir(&self, suite: &str, experiment: &str, index: usize) -> PathBuf {
        self.experiment_dir(suite, experiment)
            .join(self.simulation_dir_name(experiment, index))
    }
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
