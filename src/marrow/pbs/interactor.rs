use std::path::Path;
use std::process::Command;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use marrow_lib::constants::BATCH_SCRIPT_FILE_NAME;
use marrow_lib::ctx;

use crate::pbs::PbsJobStatus;
use crate::pbs::SchedulerClient;

/// Pick the `max_array_size` attribute out of a `qmgr -c "p s"` server dump.
pub fn parse_max_array_size(output: &str) -> Option<usize> {
    for line in output.lines() {
        if line.contains("max_array_size") {
            if let Some((_, value)) = line.split_once('=') {
                return value.trim().parse::<usize>().ok();
            }
        }
    }

    None
}

/// Parse the tabular output of `qstat -x`.
///
/// The first two lines are the header and its underline; every following
/// row is whitespace-delimited with the state code in the fifth column.
pub fn parse_status_table(output: &str) -> Vec<PbsJobStatus> {
    let mut result = Vec::new();

    for row in output.trim().lines().skip(2) {
        let fields: Vec<&str> = row.split_whitespace().collect();
        if fields.len() < 6 {
            continue;
        }

        result.push(PbsJobStatus {
            job_id: fields[0].to_string(),
            job_name: fields[1].to_string(),
            state: fields[4].to_string(),
        });
    }

    result
}

/// An implementation of the [SchedulerClient] trait for interacting with
/// PBS via the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct PbsCli {}

/// These use the command set of PBS Professional; OpenPBS ships the same
/// client tools.
impl SchedulerClient for PbsCli {
    /// Check that `qstat` exists and the server actually answers a query.
    fn queue_responds(&self) -> Result<bool> {
        let version = Command::new("qstat").arg("--version").output()?;

        if !version.status.success() {
            return Ok(false);
        }

        Ok(Command::new("qstat").output()?.status.success())
    }

    fn server_responds(&self) -> Result<bool> {
        Ok(Command::new("pbsnodes")
            .arg("--version")
            .output()?
            .status
            .success())
    }

    /// Read `max_array_size` from the server configuration dump.
    fn read_max_array_size(&self) -> Result<usize> {
        let qmgr = Command::new("qmgr").arg("-c").arg("p s").output()?;

        if !qmgr.status.success() {
            return Err(anyhow!("qmgr failed to print the server configuration"));
        }

        parse_max_array_size(&String::from_utf8_lossy(&qmgr.stdout))
            .ok_or(anyhow!("The server configuration has no max_array_size"))
    }

    /// Run the generated submission script and collect the array ids it
    /// echoes, one per line.
    fn submit(&self, experiment_dir: &Path) -> Result<Vec<String>> {
        let proc = Command::new("bash")
            .arg(BATCH_SCRIPT_FILE_NAME)
            .current_dir(experiment_dir)
            .output()
            .with_context(ctx!(
              "Failed to invoke {BATCH_SCRIPT_FILE_NAME} in {experiment_dir:?}", ;
              "Ensure that bash is available on this machine",
            ))?;

        if !proc.status.success() {
            return Err(anyhow!("The submission script failed to run")).with_context(ctx!(
                "qsub printed: {}", String::from_utf8_lossy(&proc.stderr);
                "Please ensure that you are submitting from a PBS cluster node",
            ));
        }

        let ids: Vec<String> = String::from_utf8_lossy(&proc.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        if ids.is_empty() {
            return Err(anyhow!("The scheduler did not return any job ids")).with_context(ctx!(
                "The submission script in {experiment_dir:?} produced no output", ;
                "Was the script edited by hand?",
            ));
        }

        Ok(ids)
    }

    fn cancel(&self, job_id: &str) -> Result<()> {
        let proc = Command::new("qdel").arg(job_id).output().with_context(ctx!(
          "Failed to invoke qdel", ;
          "Ensure that PBS is installed and available in the PATH",
        ))?;

        if !proc.status.success() {
            return Err(anyhow!("qdel failed for {job_id}")).with_context(ctx!(
                "qdel printed: {}", String::from_utf8_lossy(&proc.stderr);
                "The job may have left the queue already",
            ));
        }

        Ok(())
    }

    fn job_statuses(&self, job_ids: &[String]) -> Result<Vec<PbsJobStatus>> {
        let qstat = Command::new("qstat")
            .arg("-x")
            .args(job_ids)
            .output()
            .with_context(ctx!(
              "Failed to invoke qstat", ;
              "Ensure that PBS is installed and available in the PATH",
            ))?;

        Ok(parse_status_table(&String::from_utf8_lossy(&qstat.stdout)))
    }
}

#[cfg(test)]
#[path = "tests/interactor.rs"]
mod tests;
