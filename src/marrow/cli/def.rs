use std::path::PathBuf;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

/// Structure of the main command (marrow).
#[allow(unused)]
#[derive(Parser, Debug)]
#[command(
    about = "Marrow, a PBS job-array submission layer for simulation experiments",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// The main command issued.
    #[command(subcommand)]
    pub command: MarrowCommand,

    /// The path to the platform configuration file.
    #[arg(short, long, default_value = "./marrow.toml", global = true)]
    pub config: PathBuf,

    /// Verbose mode, displays debug info. For even more try: -vv.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Dry run, compute and log but don't write or submit anything.
    #[arg(short, long, global = true)]
    pub dry: bool,
}

/// Arguments supplied with the `submit` command.
#[derive(Args, Debug, Clone)]
pub struct SubmitStruct {
    /// The suite this experiment belongs to.
    #[arg(value_name = "SUITE")]
    pub suite: String,

    /// The name of the experiment.
    #[arg(value_name = "EXPERIMENT")]
    pub experiment: String,

    /// How many independent simulations this experiment consists of.
    #[arg(short = 'n', long)]
    pub simulations: usize,

    /// The command every simulation runs inside its own directory.
    #[arg(long)]
    pub command: String,

    /// Cap on simultaneously running jobs. The administratively
    /// configured ceiling still applies.
    #[arg(long)]
    pub max_running_jobs: Option<usize>,

    /// Preferred size of each submitted job array.
    #[arg(long)]
    pub array_batch_size: Option<usize>,

    /// Submit the job arrays independently instead of chaining each one
    /// on its predecessor's completion.
    #[arg(long)]
    pub independent: bool,

    /// How many times a failing simulation is retried.
    #[arg(long)]
    pub retries: Option<usize>,

    /// Override a template variable, for example: `--set queue=workq`.
    /// Overrides are applied last and always win.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub overrides: Vec<(String, String)>,
}

/// Arguments supplied with the `status` command.
#[derive(Args, Debug, Clone)]
pub struct StatusStruct {
    /// The suite of the experiment for which to fetch status.
    #[arg(value_name = "SUITE")]
    pub suite: String,

    /// The experiment for which to fetch status.
    #[arg(value_name = "EXPERIMENT")]
    pub experiment: String,
}

/// Structure of the cancel subcommand.
#[derive(Args, Debug, Clone)]
pub struct CancelStruct {
    /// The suite to cancel. Cancels every contained experiment when no
    /// experiment is given.
    #[arg(value_name = "SUITE")]
    pub suite: String,

    /// The experiment to cancel.
    #[arg(value_name = "EXPERIMENT")]
    pub experiment: Option<String>,

    /// Cancel a single simulation by its index,
    /// for example: `marrow cancel flu baseline -i 5`.
    #[arg(short = 'i', long)]
    pub simulation: Option<usize>,

    /// Cancel regardless of the currently known job state.
    #[arg(short, long)]
    pub force: bool,
}

/// Enum for the main command.
#[derive(Subcommand, Debug, Clone)]
pub enum MarrowCommand {
    /// Create the submission scripts for a new experiment and hand it to PBS.
    #[command()]
    Submit(SubmitStruct),

    /// Display the scheduler's view of a submitted experiment.
    #[command()]
    Status(StatusStruct),

    /// Cancel a suite, an experiment, or a single simulation.
    #[command()]
    Cancel(CancelStruct),

    /// Check for a PBS installation and report its array size ceiling.
    #[command()]
    Probe,
}

/// Parse a `KEY=VALUE` pair for `--set`.
fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("`{raw}` must be of the form KEY=VALUE")),
    }
}
