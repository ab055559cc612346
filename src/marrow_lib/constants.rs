use anstyle::AnsiColor;
use anstyle::Color;
use anstyle::Style;

/// The name of the array driver script placed in an experiment directory.
///
/// This is the script that `marrow` invokes to hand the experiment over, and
/// it is the only artifact that embeds the reconciled job configuration.
pub const BATCH_SCRIPT_FILE_NAME: &str = "batch.sh";

/// The name of the array job script that PBS itself executes.
pub const SUBMISSION_SCRIPT_FILE_NAME: &str = "sbatch.pbs";

/// The name of the per-simulation runner script.
pub const RUN_SCRIPT_FILE_NAME: &str = "_run.sh";

/// The job record: one scheduler-assigned id per line.
pub const JOB_RECORD_FILE_NAME: &str = "job_id.txt";

/// The exit status breadcrumb written by a finished runner.
pub const JOB_STATUS_FILE_NAME: &str = "job_status.txt";

/// The lockfile persisting an experiment in its own directory.
pub const EXPERIMENT_LOCK_FILE_NAME: &str = "experiment.lock";

/// The permissions every generated script gets after being written.
pub const SCRIPT_PERMISSIONS: u32 = 0o755;

/// By default one node is requested per job.
pub const NODES_DEFAULT: fn() -> Option<usize> = || Some(1);

/// The administrative default for concurrently running jobs per experiment.
pub const MAX_RUNNING_JOBS_DEFAULT: fn() -> Option<usize> = || Some(100);

/// By default a failing simulation is not retried.
pub const RETRIES_DEFAULT: fn() -> usize = || 0;

/// The default for boolean toggles that are on unless disabled.
pub const TRUE_DEFAULT: fn() -> bool = || true;

/// The default list of modules to load on the compute node.
pub const EMPTY_MODULES: fn() -> Vec<String> = Vec::new;

/// Create a style with a defined foreground color.
pub const fn style_from_fg(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

/// The styling for the program name.
pub const PRIMARY_STYLE: Style = style_from_fg(AnsiColor::Green).bold();

/// The styling for item names.
pub const NAME_STYLE: Style = Style::new().bold();

/// The styling for error messages.
pub const ERROR_STYLE: Style = style_from_fg(AnsiColor::Red).bold().blink();

/// The styling for help messages.
pub const HELP_STYLE: Style = style_from_fg(AnsiColor::Green).bold().underline();
