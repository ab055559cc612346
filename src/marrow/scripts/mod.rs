use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use log::debug;
use marrow_lib::bailc;
use marrow_lib::batch::JobConfiguration;
use marrow_lib::config::MpiType;
use marrow_lib::config::PlatformConfig;
use marrow_lib::constants::BATCH_SCRIPT_FILE_NAME;
use marrow_lib::constants::JOB_RECORD_FILE_NAME;
use marrow_lib::constants::JOB_STATUS_FILE_NAME;
use marrow_lib::constants::RUN_SCRIPT_FILE_NAME;
use marrow_lib::constants::SCRIPT_PERMISSIONS;
use marrow_lib::constants::SUBMISSION_SCRIPT_FILE_NAME;
use marrow_lib::experiment::Experiment;
use marrow_lib::experiment::Simulation;
use marrow_lib::file_system::FileOperations;

/// What a set of batch artifacts is being generated for.
#[derive(Debug, Clone, Copy)]
pub enum BatchItem<'a> {
    /// A whole experiment: the array scripts plus one runner per
    /// simulation.
    Experiment(&'a Experiment),

    /// One simulation: only its runner script.
    Simulation(&'a Experiment, &'a Simulation),

    /// A suite. Suites have no scripts of their own.
    Suite,
}

/// Synthesize every script an item needs to run on the scheduler.
///
/// All scripts are written relative to the item's directory and marked
/// executable. The rendered values come from the platform configuration
/// and the reconciled job configuration, with `overrides` applied last.
pub fn create_batch_files(
    config: &PlatformConfig,
    item: BatchItem<'_>,
    job: &JobConfiguration,
    overrides: &BTreeMap<String, String>,
    fs: &impl FileOperations,
) -> Result<()> {
    match item {
        BatchItem::Experiment(experiment) => {
            let vars = template_vars(config, experiment, job, overrides);

            let home = fs.truncate_and_canonicalize_folder(&experiment.home)?;

            write_script(&home.join(BATCH_SCRIPT_FILE_NAME), generate_batch(&vars), fs)?;
            write_script(
                &home.join(SUBMISSION_SCRIPT_FILE_NAME),
                generate_submission(config, experiment, &vars),
                fs,
            )?;

            for simulation in experiment.simulations() {
                create_batch_files(
                    config,
                    BatchItem::Simulation(experiment, &simulation),
                    job,
                    overrides,
                    fs,
                )?;
            }

            Ok(())
        }

        BatchItem::Simulation(experiment, simulation) => {
            let vars = template_vars(config, experiment, job, overrides);

            let dir = fs.truncate_and_canonicalize_folder(&config.simulation_dir(
                &experiment.suite,
                &experiment.name,
                simulation.index,
            ))?;

            write_script(
                &dir.join(RUN_SCRIPT_FILE_NAME),
                generate_simulation_script(&rewrite_home_prefix(&dir), &vars),
                fs,
            )
        }

        BatchItem::Suite => {
            bailc!(
                "Suites have no batch scripts", ;
                "Scripts exist per experiment and per simulation only", ;
                "Generate scripts for one of the suite's experiments instead",
            );
        }
    }
}

/// The top-level driver. Running it chops the simulations into job
/// arrays of the reconciled size and `qsub`s each chunk, chaining them
/// with `afterok` dependencies when requested.
///
/// `qsub -J` rejects a range whose end equals its start, so a chunk of
/// one becomes a plain job with `PBS_ARRAY_INDEX` passed explicitly.
fn generate_batch(vars: &BTreeMap<String, String>) -> String {
    format!(
        "#!/bin/bash
NJOBS={}
BATCH_SIZE={}
MAX_RUNNING={}
DEPENDENCY={}

LAST_ID=
START=0
> {}
while [ \"$START\" -lt \"$NJOBS\" ]; do
    END=$((START + BATCH_SIZE - 1))
    if [ \"$END\" -ge \"$NJOBS\" ]; then
        END=$((NJOBS - 1))
    fi

    DEPEND=
    if [ \"$DEPENDENCY\" = true ] && [ -n \"$LAST_ID\" ]; then
        DEPEND=\"-W depend=afterok:$LAST_ID\"
    fi

    if [ \"$START\" -eq \"$END\" ]; then
        LAST_ID=$(qsub -v PBS_ARRAY_INDEX=$START $DEPEND {})
    else
        LAST_ID=$(qsub -J $START-$END -W max_run_subjobs=$MAX_RUNNING $DEPEND {})
    fi
    echo \"$LAST_ID\"
    echo \"$LAST_ID\" >> {}

    START=$((END + 1))
done
",
        var(vars, "njobs"),
        var(vars, "array_batch_size"),
        var(vars, "max_running_jobs"),
        var(vars, "dependency"),
        JOB_RECORD_FILE_NAME,
        SUBMISSION_SCRIPT_FILE_NAME,
        SUBMISSION_SCRIPT_FILE_NAME,
        JOB_RECORD_FILE_NAME,
    )
}

/// The scheduler-executed array script: the `#PBS` resource directives
/// followed by a dispatch on `$PBS_ARRAY_INDEX` into the matching
/// simulation directory.
fn generate_submission(
    config: &PlatformConfig,
    experiment: &Experiment,
    vars: &BTreeMap<String, String>,
) -> String {
    let mut directives = format!(
        "#!/bin/bash
#PBS -N {}
#PBS -l {}
",
        var(vars, "job_name"),
        var(vars, "select"),
    );

    if let Some(wall_time) = non_empty(vars, "wall_time") {
        directives.push_str(&format!("#PBS -l walltime={wall_time}\n"));
    }

    if let Some(queue) = non_empty(vars, "queue") {
        directives.push_str(&format!("#PBS -q {queue}\n"));
    }

    if let Some(email) = non_empty(vars, "email") {
        directives.push_str(&format!("#PBS -M {email}\n#PBS -m abe\n"));
    }

    directives.push_str(&format!("#PBS -r {}\n", var(vars, "requeue")));

    if let Some(additional) = &config.additional_args {
        for arg in additional.values() {
            directives.push_str(&format!("#PBS {} {}\n", arg.name, arg.value));
        }
    }

    let mut body = String::new();
    for module in &config.resources.modules {
        body.push_str(&format!("module load {module}\n"));
    }

    let launcher = match config.resources.mpi_type {
        MpiType::Mpirun => "mpirun ",
        MpiType::Pmi2 | MpiType::Pmix => "",
    };

    let experiment_dir = rewrite_home_prefix(&experiment.home);
    let sim_prefix = config.simulation_dir_prefix(&experiment.name);

    format!(
        "{directives}
{body}cd {experiment_dir}/{sim_prefix}$PBS_ARRAY_INDEX
{launcher}./{}
",
        RUN_SCRIPT_FILE_NAME,
    )
}

/// The per-simulation runner. It enters its own directory, records the
/// array job's id there, retries the command, and leaves the exit code
/// behind in the status file.
fn generate_simulation_script(simulation_dir: &str, vars: &BTreeMap<String, String>) -> String {
    format!(
        "#!/bin/bash
cd {simulation_dir}
echo \"$PBS_JOBID\" > {}

ATTEMPT=0
RETRIES={}
until {}; do
    STATUS=$?
    ATTEMPT=$((ATTEMPT + 1))
    if [ \"$ATTEMPT\" -gt \"$RETRIES\" ]; then
        echo \"$STATUS\" > {}
        exit $STATUS
    fi
done

echo 0 > {}
",
        JOB_RECORD_FILE_NAME,
        var(vars, "retries"),
        var(vars, "command"),
        JOB_STATUS_FILE_NAME,
        JOB_STATUS_FILE_NAME,
    )
}

/// Build the variable map the templates render from.
///
/// Caller overrides are applied last and therefore win over every
/// computed value.
fn template_vars(
    config: &PlatformConfig,
    experiment: &Experiment,
    job: &JobConfiguration,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let resources = &config.resources;

    let mut vars = BTreeMap::from([
        ("njobs".to_string(), experiment.simulation_count.to_string()),
        (
            "array_batch_size".to_string(),
            job.array_batch_size.to_string(),
        ),
        (
            "max_running_jobs".to_string(),
            job.max_running_jobs.to_string(),
        ),
        ("dependency".to_string(), job.dependency.to_string()),
        (
            "job_name".to_string(),
            resources
                .job_name
                .clone()
                .unwrap_or_else(|| experiment.name.clone()),
        ),
        (
            "select".to_string(),
            assemble_select(
                resources.nodes,
                resources.ncpus,
                resources.mem.as_deref(),
            ),
        ),
        (
            "wall_time".to_string(),
            resources.wall_time.clone().unwrap_or_default(),
        ),
        (
            "queue".to_string(),
            resources.queue.clone().unwrap_or_default(),
        ),
        (
            "email".to_string(),
            resources.email.clone().unwrap_or_default(),
        ),
        (
            "requeue".to_string(),
            if resources.requeue { "y" } else { "n" }.to_string(),
        ),
        ("command".to_string(), experiment.command.clone()),
        (
            "retries".to_string(),
            experiment
                .retries
                .unwrap_or(resources.retries)
                .to_string(),
        ),
    ]);

    vars.extend(overrides.clone());

    debug!("Rendering scripts with: {vars:?}");

    vars
}

/// Assemble the `-l select=...` resource string.
///
/// The chunk count always comes first; cpu and memory terms attach to it
/// in that order when present.
pub fn assemble_select(nodes: Option<usize>, ncpus: Option<usize>, mem: Option<&str>) -> String {
    let mut select = format!("select={}", nodes.unwrap_or(1));

    if let Some(ncpus) = ncpus {
        select.push_str(&format!(":ncpus={ncpus}"));
    }

    if let Some(mem) = mem {
        select.push_str(&format!(":mem={mem}"));
    }

    select
}

/// Replace a leading home-directory prefix with the literal `$HOME`, so
/// the generated scripts stay valid when the tree is mirrored between
/// machines.
pub fn rewrite_home_prefix(path: &Path) -> String {
    match env::var_os("HOME") {
        Some(home) => rewrite_prefix(path, Path::new(&home)),
        None => path.display().to_string(),
    }
}

pub(crate) fn rewrite_prefix(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) => PathBuf::from("$HOME").join(rest).display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

fn write_script(path: &Path, contents: String, fs: &impl FileOperations) -> Result<()> {
    fs.write_utf8_truncate(path, &contents)?;
    fs.set_permissions(path, SCRIPT_PERMISSIONS)
}

fn var<'a>(vars: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    vars.get(key).map(String::as_str).unwrap_or_default()
}

fn non_empty<'a>(vars: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    Some(var(vars, key)).filter(|v| !v.is_empty())
}
