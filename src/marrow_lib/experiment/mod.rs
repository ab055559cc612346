/// Reading and writing the per-item job record.
pub mod record;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use chrono::DateTime;
use chrono::Local;
use serde::Deserialize;
use serde::Serialize;

use crate::bailc;
use crate::config::PlatformConfig;
use crate::constants::EXPERIMENT_LOCK_FILE_NAME;
use crate::error::ctx;
use crate::file_system::FileOperations;

/// One array element of an experiment.
///
/// Simulations are not created by the user; they are expanded from the
/// experiment's simulation count and addressed by their ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simulation {
    /// The ordinal of this simulation within its experiment.
    pub index: usize,
}

/// Describes one experiment: a named collection of simulations owned by a
/// suite, immutable once submitted.
///
/// Persisted as a lockfile inside its own directory so that status and
/// cancel operations work long after the submitting process has exited.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Experiment {
    /// The suite this experiment belongs to.
    pub suite: String,

    /// The name of this experiment.
    pub name: String,

    /// How many independent simulations this experiment consists of.
    pub simulation_count: usize,

    /// The opaque payload every simulation executes in its own directory.
    pub command: String,

    /// Retry count override for this experiment's simulations.
    pub retries: Option<usize>,

    /// The time of creation of the experiment.
    pub creation_time: DateTime<Local>,

    /// The directory in which the contents of this experiment reside.
    pub home: PathBuf,

    /// Whether this experiment has been handed to the scheduler.
    pub submitted: bool,
}

impl Experiment {
    /// Initialise a new experiment under the configured job directory.
    pub fn new(
        suite: &str,
        name: &str,
        simulation_count: usize,
        command: &str,
        retries: Option<usize>,
        config: &PlatformConfig,
    ) -> Result<Self> {
        if simulation_count == 0 {
            bailc!(
                "An experiment cannot be empty", ;
                "Experiment {suite}/{name} was created with zero simulations", ;
                "Specify a positive simulation count",
            );
        }

        let home = config.experiment_dir(suite, name);

        if home.exists() && !config.dir_exist_ok {
            bailc!(
                "The experiment directory already exists", ;
                "A directory or file exists at {home:?}", ;
                "Choose a new experiment name or set `dir_exist_ok` in the configuration",
            );
        }

        Ok(Experiment {
            suite: suite.to_string(),
            name: name.to_string(),
            simulation_count,
            command: command.to_string(),
            retries,
            creation_time: Local::now(),
            home,
            submitted: false,
        })
    }

    /// Save the experiment lockfile into its home directory.
    pub fn save(&self, fs: &impl FileOperations) -> Result<PathBuf> {
        let saving_path = self.home.join(EXPERIMENT_LOCK_FILE_NAME);

        fs.try_write_toml(&saving_path, &self)?;

        Ok(saving_path)
    }

    /// Load a previously saved experiment from its directory.
    pub fn load(dir: &Path, fs: &impl FileOperations) -> Result<Experiment> {
        fs.try_read_toml(&dir.join(EXPERIMENT_LOCK_FILE_NAME))
            .with_context(ctx!(
              "Could not load the experiment stored in {dir:?}", ;
              "Ensure that the experiment exists and was created by marrow",
            ))
    }

    /// Expand the experiment into its simulations.
    pub fn simulations(&self) -> impl Iterator<Item = Simulation> {
        (0..self.simulation_count).map(|index| Simulation { index })
    }
}
