use std::path::Path;

use anyhow::Result;

/// The core submission and cancellation functionality.
pub mod handler;

/// Currently used implementation of interacting with PBS through the CLI.
pub mod interactor;

/// Discovery of what the local PBS installation supports.
pub mod probe;

/// One row of scheduler data for a tracked job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbsJobStatus {
    /// The scheduler-assigned job id.
    pub job_id: String,

    /// The name of the job as shown by the scheduler.
    pub job_name: String,

    /// The single-letter PBS state code, for example `Q`, `R`, or `F`.
    pub state: String,
}

/// The interface for interacting with a PBS cluster.
/// This can be via a version-specific CLI, via a REST API, or via a library.
pub trait SchedulerClient {
    /// Check that the queue client exists and the server answers queries.
    fn queue_responds(&self) -> Result<bool>;

    /// Check that the node client exists and responds.
    fn server_responds(&self) -> Result<bool>;

    /// Read the server's configured `max_array_size`, unadjusted.
    fn read_max_array_size(&self) -> Result<usize>;

    /// Invoke the generated submission script in an experiment directory.
    ///
    /// Returns the scheduler-assigned id of every submitted job array.
    fn submit(&self, experiment_dir: &Path) -> Result<Vec<String>>;

    /// Cancel a job by its scheduler-assigned id.
    fn cancel(&self, job_id: &str) -> Result<()>;

    /// Get the scheduler's view of the given job ids.
    fn job_statuses(&self, job_ids: &[String]) -> Result<Vec<PbsJobStatus>>;
}
