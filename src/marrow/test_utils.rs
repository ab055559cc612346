use std::cell::Cell;
use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Result;
use marrow_lib::config::PlatformConfig;
use marrow_lib::config::ResourceRequest;
use marrow_lib::experiment::Experiment;
use marrow_lib::file_system::FileSystemInteractor;
use tempdir::TempDir;

use crate::pbs::PbsJobStatus;
use crate::pbs::SchedulerClient;

pub const REAL_FS: FileSystemInteractor = FileSystemInteractor { dry_run: false };

/// A scriptable in-memory stand-in for the PBS command line tools.
///
/// Every interaction is recorded so tests can assert which calls were
/// (or were not) made.
pub struct FakeScheduler {
    pub queue_ok: bool,
    pub server_ok: bool,

    /// The raw `max_array_size` the fake server reports, [None] makes
    /// the query fail.
    pub max_array_size: Option<usize>,

    /// The ids handed out on submission, [None] makes submission fail.
    pub submit_ids: Option<Vec<String>>,

    /// The table returned by status queries, [None] makes them fail.
    pub statuses: Option<Vec<PbsJobStatus>>,

    /// Job ids whose cancellation fails.
    pub fail_cancel_for: Vec<String>,

    pub submissions: RefCell<Vec<PathBuf>>,
    pub cancelled: RefCell<Vec<String>>,
    pub status_queries: Cell<usize>,
}

impl Default for FakeScheduler {
    fn default() -> Self {
        Self {
            queue_ok: true,
            server_ok: true,
            max_array_size: Some(10000),
            submit_ids: Some(vec!["1234[].pbs01".to_string()]),
            statuses: Some(vec![]),
            fail_cancel_for: vec![],
            submissions: RefCell::new(vec![]),
            cancelled: RefCell::new(vec![]),
            status_queries: Cell::new(0),
        }
    }
}

impl SchedulerClient for FakeScheduler {
    fn queue_responds(&self) -> Result<bool> {
        Ok(self.queue_ok)
    }

    fn server_responds(&self) -> Result<bool> {
        Ok(self.server_ok)
    }

    fn read_max_array_size(&self) -> Result<usize> {
        self.max_array_size
            .ok_or_else(|| anyhow!("the server did not answer"))
    }

    fn submit(&self, experiment_dir: &Path) -> Result<Vec<String>> {
        self.submissions
            .borrow_mut()
            .push(experiment_dir.to_path_buf());

        self.submit_ids
            .clone()
            .ok_or_else(|| anyhow!("qsub failed"))
    }

    fn cancel(&self, job_id: &str) -> Result<()> {
        if self.fail_cancel_for.iter().any(|id| id == job_id) {
            return Err(anyhow!("qdel failed for {job_id}"));
        }

        self.cancelled.borrow_mut().push(job_id.to_string());
        Ok(())
    }

    fn job_statuses(&self, _job_ids: &[String]) -> Result<Vec<PbsJobStatus>> {
        self.status_queries.set(self.status_queries.get() + 1);

        self.statuses
            .clone()
            .ok_or_else(|| anyhow!("qstat failed"))
    }
}

/// A platform configuration rooted in a fresh temporary directory.
pub fn sample_config() -> (PlatformConfig, TempDir) {
    let tmp = TempDir::new("marrow").unwrap();

    let config = PlatformConfig {
        job_directory: tmp.path().to_path_buf(),
        resources: ResourceRequest::default(),
        name_directory: true,
        sim_name_directory: false,
        dir_exist_ok: false,
        additional_args: None,
    };

    (config, tmp)
}

pub fn sample_experiment(config: &PlatformConfig, simulation_count: usize) -> Experiment {
    Experiment::new(
        "flu",
        "baseline",
        simulation_count,
        "./model.sh",
        None,
        config,
    )
    .unwrap()
}

pub fn running(job_id: &str) -> PbsJobStatus {
    PbsJobStatus {
        job_id: job_id.to_string(),
        job_name: "baseline".to_string(),
        state: "R".to_string(),
    }
}

pub fn finished(job_id: &str) -> PbsJobStatus {
    PbsJobStatus {
        job_id: job_id.to_string(),
        job_name: "baseline".to_string(),
        state: "F".to_string(),
    }
}
