use std::path::Path;

use anyhow::Result;
use log::warn;
use marrow_lib::config::PlatformConfig;
use marrow_lib::constants::JOB_STATUS_FILE_NAME;
use marrow_lib::experiment::record;
use marrow_lib::experiment::Experiment;
use marrow_lib::file_system::FileOperations;

use crate::pbs::PbsJobStatus;
use crate::pbs::SchedulerClient;

/// The coarse state of a job, folded down from the scheduler's
/// single-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Queued, held, or waiting to be scheduled.
    Pending,

    /// Running, exiting, or an array with live subjobs.
    Running,

    /// Left the queue for good.
    Finished,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Pending => write!(f, "pending"),
            State::Running => write!(f, "running"),
            State::Finished => write!(f, "finished"),
        }
    }
}

/// Fold a scheduler state code into a [State].
///
/// Codes we do not recognize count as pending, which keeps an unknown
/// job from being cancelled as "already finished".
pub fn state_from_code(code: &str) -> State {
    match code {
        "R" | "E" | "B" => State::Running,
        "F" | "X" => State::Finished,
        _ => State::Pending,
    }
}

/// What one simulation's working directory says about its run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationCompletion {
    pub index: usize,

    /// The recorded exit code, if the runner got far enough to leave one.
    pub exit_code: Option<i32>,
}

/// Everything `status` reports about one experiment.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub suite: String,
    pub experiment: String,
    pub submitted: bool,

    /// One entry per job id in the record, in record order. Empty when
    /// the experiment was never submitted or the scheduler is
    /// unreachable.
    pub jobs: Vec<PbsJobStatus>,

    /// One entry per simulation, in index order.
    pub completions: Vec<SimulationCompletion>,
}

/// Gather the status of an experiment from the scheduler and from the
/// filesystem.
///
/// A scheduler that stopped answering does not fail the report: jobs
/// that already wrote their status file are still accounted for.
pub fn experiment_status(
    config: &PlatformConfig,
    experiment: &Experiment,
    client: &impl SchedulerClient,
    fs: &impl FileOperations,
) -> Result<StatusReport> {
    let jobs = match record::read_record(&experiment.home, fs)? {
        Some(ids) => match client.job_statuses(&ids) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Could not reach the scheduler: {e:?}");
                vec![]
            }
        },
        None => vec![],
    };

    let mut completions = Vec::with_capacity(experiment.simulation_count);
    for simulation in experiment.simulations() {
        let dir = config.simulation_dir(&experiment.suite, &experiment.name, simulation.index);

        completions.push(SimulationCompletion {
            index: simulation.index,
            exit_code: read_exit_code(&dir, fs),
        });
    }

    Ok(StatusReport {
        suite: experiment.suite.clone(),
        experiment: experiment.name.clone(),
        submitted: experiment.submitted,
        jobs,
        completions,
    })
}

/// The exit code a runner left behind, or [None] if it has not finished.
fn read_exit_code(simulation_dir: &Path, fs: &impl FileOperations) -> Option<i32> {
    let contents = fs.read_utf8(&simulation_dir.join(JOB_STATUS_FILE_NAME)).ok()?;

    contents.trim().parse().ok()
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
