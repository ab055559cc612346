use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use log::debug;
use log::error;
use log::info;
use log::warn;
use marrow_lib::batch::reconcile;
use marrow_lib::batch::JobConfiguration;
use marrow_lib::batch::SystemCapability;
use marrow_lib::bailc;
use marrow_lib::config::PlatformConfig;
use marrow_lib::ctx;
use marrow_lib::experiment::record;
use marrow_lib::experiment::Experiment;
use marrow_lib::experiment::Simulation;
use marrow_lib::file_system::FileOperations;

use crate::pbs::probe::probe;
use crate::pbs::SchedulerClient;
use crate::scripts::create_batch_files;
use crate::scripts::BatchItem;
use crate::status::state_from_code;
use crate::status::State;

/// The caller-supplied knobs for one submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Cap on simultaneously running jobs.
    pub max_running_jobs: Option<usize>,

    /// Preferred size of each submitted job array.
    pub array_batch_size: Option<usize>,

    /// Whether consecutive arrays wait on their predecessor.
    pub dependency: Option<bool>,

    /// Template variable overrides, applied last.
    pub overrides: BTreeMap<String, String>,
}

/// The caller-visible result of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No job record exists: the item was never submitted, or its record
    /// has been purged. Nothing to do.
    NotSubmitted,

    /// Every recorded job has already left the queue.
    Finished,

    /// `qdel` was invoked; one outcome per recorded id.
    Cancelled(Vec<(String, bool)>),

    /// The cancel attempt failed before any job could be addressed.
    Failed(String),
}

/// Functionality associated with running on PBS.
#[derive(Debug)]
pub struct PbsHandler<T>
where
    T: SchedulerClient,
{
    /// The way of interaction with PBS. (May be cli or library based).
    pub internal: T,

    /// What the one-time probe discovered about this installation.
    pub capability: SystemCapability,
}

impl<T> PbsHandler<T>
where
    T: SchedulerClient,
{
    /// Probe the installation once and construct a handler around the
    /// result.
    pub fn from_probe(internal: T) -> Self {
        let capability = probe(&internal);
        debug!("Scheduler capability: {capability:?}");

        Self {
            internal,
            capability,
        }
    }

    /// Reconcile the job configuration and synthesize every artifact for
    /// an experiment, without submitting anything.
    pub fn prepare_experiment(
        &self,
        config: &PlatformConfig,
        experiment: &Experiment,
        options: &SubmitOptions,
        fs: &impl FileOperations,
    ) -> Result<JobConfiguration> {
        let job = reconcile(
            experiment.simulation_count,
            options.max_running_jobs,
            options.array_batch_size,
            options.dependency,
            &config.resources,
            &self.capability,
        );
        debug!("Reconciled job configuration: {job:?}");

        create_batch_files(
            config,
            BatchItem::Experiment(experiment),
            &job,
            &options.overrides,
            fs,
        )?;

        Ok(job)
    }

    /// Synthesize all artifacts for an experiment and hand it to the
    /// scheduler.
    ///
    /// ### Returns
    /// The scheduler-assigned ids of the submitted job arrays.
    pub fn run_experiment(
        &self,
        config: &PlatformConfig,
        experiment: &mut Experiment,
        options: &SubmitOptions,
        fs: &impl FileOperations,
    ) -> Result<Vec<String>> {
        if experiment.submitted || record::read_record(&experiment.home, fs)?.is_some() {
            let what = format!("{}/{}", experiment.suite, experiment.name);
            bailc!(
                "Experiment {what} has already been submitted", ;
                "A job record exists in {:?}", experiment.home;
                "Cancel the experiment first, or create a new one",
            );
        }

        self.prepare_experiment(config, experiment, options, fs)?;

        let ids = self.internal.submit(&experiment.home)?;
        debug!("The scheduler assigned ids: {ids:?}");

        record::write_record(&experiment.home, &ids, fs)?;

        experiment.submitted = true;
        experiment.save(fs)?;

        Ok(ids)
    }

    /// Submitting a single simulation is a no-op: simulations ride inside
    /// their experiment's job array.
    pub fn submit_simulation(
        &self,
        experiment: &Experiment,
        simulation: &Simulation,
    ) -> Result<()> {
        debug!(
            "Simulation {} of {}/{} is submitted through its experiment; nothing to do",
            simulation.index, experiment.suite, experiment.name
        );

        Ok(())
    }

    /// Cancel an experiment and, depth-first, any simulation that recorded
    /// its own job id. A failing child never aborts its siblings.
    pub fn cancel_experiment(
        &self,
        config: &PlatformConfig,
        suite: &str,
        name: &str,
        force: bool,
        fs: &impl FileOperations,
    ) -> Result<CancelOutcome> {
        let dir = config.experiment_dir(suite, name);

        let top = self.cancel_item(&dir, &format!("experiment {suite}/{name}"), force, fs)?;

        let mut cancelled = match &top {
            CancelOutcome::Cancelled(outcomes) => outcomes.clone(),
            _ => vec![],
        };

        if !dir.exists() {
            return Ok(top);
        }

        for entry in fs::read_dir(&dir).with_context(ctx!(
          "Could not list the experiment directory {dir:?}", ;
          "Ensure that you have permissions to read it",
        ))? {
            let path = match entry {
                Ok(entry) if entry.path().is_dir() => entry.path(),
                Ok(_) => continue,
                Err(e) => {
                    error!("Could not read an entry of {dir:?}: {e:?}");
                    continue;
                }
            };

            let what = format!("simulation {:?}", path.file_name().unwrap_or_default());
            match self.cancel_item(&path, &what, force, fs) {
                Ok(CancelOutcome::Cancelled(more)) => cancelled.extend(more),
                Ok(_) => {}
                Err(e) => error!("Could not cancel {what}: {e:?}"),
            }
        }

        if cancelled.is_empty() {
            Ok(top)
        } else {
            Ok(CancelOutcome::Cancelled(cancelled))
        }
    }

    /// Cancel one simulation by its index.
    pub fn cancel_simulation(
        &self,
        config: &PlatformConfig,
        suite: &str,
        experiment: &str,
        index: usize,
        force: bool,
        fs: &impl FileOperations,
    ) -> Result<CancelOutcome> {
        let dir = config.simulation_dir(suite, experiment, index);

        self.cancel_item(
            &dir,
            &format!("simulation {index} of {suite}/{experiment}"),
            force,
            fs,
        )
    }

    /// Cancel every experiment of a suite.
    ///
    /// Propagation is synchronous and depth-first, and continues past
    /// individual failures: one broken experiment does not shield its
    /// siblings from cancellation.
    pub fn cancel_suite(
        &self,
        config: &PlatformConfig,
        suite: &str,
        force: bool,
        fs: &impl FileOperations,
    ) -> Result<Vec<(String, CancelOutcome)>> {
        let dir = config.suite_dir(suite);

        if !dir.exists() {
            info!("The suite {suite} has no directory; nothing to cancel");
            return Ok(vec![]);
        }

        let mut outcomes = Vec::new();

        for entry in fs::read_dir(&dir).with_context(ctx!(
          "Could not list the suite directory {dir:?}", ;
          "Ensure that you have permissions to read it",
        ))? {
            let path = match entry {
                Ok(entry) if entry.path().is_dir() => entry.path(),
                Ok(_) => continue,
                Err(e) => {
                    error!("Could not read an entry of {dir:?}: {e:?}");
                    continue;
                }
            };

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            match self.cancel_experiment(config, suite, &name, force, fs) {
                Ok(outcome) => outcomes.push((name, outcome)),
                Err(e) => {
                    error!("Could not cancel experiment {suite}/{name}: {e:?}");
                    outcomes.push((name, CancelOutcome::Failed(format!("{}", e.root_cause()))));
                }
            }
        }

        Ok(outcomes)
    }

    /// Cancel whatever job record exists in one item directory.
    ///
    /// A missing record is not a failure: cancelling an unsubmitted or
    /// already purged item is an idempotent no-op.
    fn cancel_item(
        &self,
        dir: &Path,
        what: &str,
        force: bool,
        fs: &impl FileOperations,
    ) -> Result<CancelOutcome> {
        let Some(ids) = record::read_record(dir, fs)? else {
            info!("No job record for {what}; nothing to cancel");
            return Ok(CancelOutcome::NotSubmitted);
        };

        let live = if force {
            ids
        } else {
            match self.internal.job_statuses(&ids) {
                Ok(statuses) => {
                    let finished: Vec<&str> = statuses
                        .iter()
                        .filter(|s| state_from_code(&s.state) == State::Finished)
                        .map(|s| s.job_id.as_str())
                        .collect();

                    ids.into_iter()
                        .filter(|id| !finished.contains(&id.as_str()))
                        .collect()
                }
                Err(e) => {
                    warn!("Could not query the state of {what}, cancelling anyway: {e:?}");
                    ids
                }
            }
        };

        if live.is_empty() {
            info!("{what} is not running, no cancel needed");
            return Ok(CancelOutcome::Finished);
        }

        let mut outcomes = Vec::new();
        for id in live {
            match self.internal.cancel(&id) {
                Ok(()) => {
                    info!("Cancelled job {id} of {what}");
                    outcomes.push((id, true));
                }
                Err(e) => {
                    error!("Could not cancel job {id} of {what}: {e:?}");
                    outcomes.push((id, false));
                }
            }
        }

        Ok(CancelOutcome::Cancelled(outcomes))
    }
}

#[cfg(test)]
#[path = "tests/handler.rs"]
mod tests;
