use std::env;
use std::process::exit;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use clap::CommandFactory;
use clap::FromArgMatches;
use colog::default_builder;
use colog::formatter;
use log::debug;
use log::error;
use log::info;
use log::trace;
use log::LevelFilter;
use marrow_lib::bailc;
use marrow_lib::config::PlatformConfig;
use marrow_lib::constants::ERROR_STYLE;
use marrow_lib::constants::NAME_STYLE;
use marrow_lib::constants::PRIMARY_STYLE;
use marrow_lib::ctx;
use marrow_lib::experiment::Experiment;
use marrow_lib::file_system::FileSystemInteractor;

use super::log::LogTokens;
use super::printing::get_styles;
use crate::cli::def::CancelStruct;
use crate::cli::def::Cli;
use crate::cli::def::MarrowCommand;
use crate::cli::printing::format_table;
use crate::pbs::handler::CancelOutcome;
use crate::pbs::handler::PbsHandler;
use crate::pbs::handler::SubmitOptions;
use crate::pbs::interactor::PbsCli;
use crate::pbs::probe::probe;
use crate::status::experiment_status;
use crate::status::state_from_code;

/// This function parses the command that marrow was run with.
pub fn parse_command() {
    let styled = Cli::command().styles(get_styles()).get_matches();

    // This unwrap will print the error if the command is wrong.
    let command = Cli::from_arg_matches(&styled).unwrap();

    // https://github.com/rust-lang/rust/blob/master/library/std/src/backtrace.rs
    let backtrace_enabled = match env::var("RUST_LIB_BACKTRACE") {
        Ok(s) => s != "0",
        Err(_) => match env::var("RUST_BACKTRACE") {
            Ok(s) => s != "0",
            Err(_) => false,
        },
    };

    if backtrace_enabled {
        eprintln!("{:?}", process_command(&command));
    } else if let Err(e) = process_command(&command) {
        eprintln!("{}error:{:#} {}", ERROR_STYLE, ERROR_STYLE, e.root_cause());
        eprint!("{}", e);
        exit(1);
    }
}

/// CLAP has parsed the command, now we process it.
pub fn process_command(cmd: &Cli) -> Result<()> {
    setup_logging(cmd)?;

    let file_system = FileSystemInteractor { dry_run: cmd.dry };

    match &cmd.command {
        MarrowCommand::Submit(args) => {
            debug!("Reading the configuration: {:?}", cmd.config);

            let config = PlatformConfig::from_file(&cmd.config, &file_system)?;
            trace!("The configuration is: {config:#?}");

            let handler = PbsHandler::from_probe(PbsCli {});

            if !cmd.dry && !handler.capability.scheduler_available {
                bailc!(
                    "No usable PBS installation was found", ;
                    "qstat or pbsnodes did not respond on this machine", ;
                    "Run marrow on a PBS submission host, or use --dry to \
                     inspect the generated scripts",
                );
            }

            let mut experiment = Experiment::new(
                &args.suite,
                &args.experiment,
                args.simulations,
                &args.command,
                args.retries,
                &config,
            )?;

            let options = SubmitOptions {
                max_running_jobs: args.max_running_jobs,
                array_batch_size: args.array_batch_size,
                dependency: args.independent.then_some(false),
                overrides: args.overrides.iter().cloned().collect(),
            };

            if cmd.dry {
                let job = handler.prepare_experiment(&config, &experiment, &options, &file_system)?;
                debug!("Would have used: {job:?}");
                info!("Would have submitted the experiment (dry)");
            } else {
                let ids = handler.run_experiment(&config, &mut experiment, &options, &file_system)?;

                info!(
                    "Experiment {}/{} submitted as {} job array(s)",
                    experiment.suite,
                    experiment.name,
                    ids.len()
                );
                for id in ids {
                    info!("  {id}");
                }
            }
        }

        MarrowCommand::Status(args) => {
            debug!("Reading the configuration: {:?}", cmd.config);

            let config = PlatformConfig::from_file(&cmd.config, &file_system)?;

            let experiment = Experiment::load(
                &config.experiment_dir(&args.suite, &args.experiment),
                &file_system,
            )?;

            let report = experiment_status(&config, &experiment, &PbsCli {}, &file_system)?;

            println!(
                "{}{}/{}{:#}",
                NAME_STYLE, report.suite, report.experiment, NAME_STYLE
            );

            if !report.submitted {
                info!(
                    "Experiment {}/{} has not been submitted yet",
                    report.suite, report.experiment
                );
            }

            if !report.jobs.is_empty() {
                let mut table = vec![vec![
                    "job id".to_string(),
                    "name".to_string(),
                    "state".to_string(),
                ]];

                for job in &report.jobs {
                    table.push(vec![
                        job.job_id.clone(),
                        job.job_name.clone(),
                        state_from_code(&job.state).to_string(),
                    ]);
                }

                print!("{}", format_table(table));
            }

            let done = report
                .completions
                .iter()
                .filter(|c| c.exit_code == Some(0))
                .count();
            let failed = report
                .completions
                .iter()
                .filter(|c| matches!(c.exit_code, Some(code) if code != 0))
                .count();

            println!(
                "{}{done} succeeded, {failed} failed, {} outstanding{:#}",
                PRIMARY_STYLE,
                report.completions.len() - done - failed,
                PRIMARY_STYLE,
            );
        }

        MarrowCommand::Cancel(args) => {
            debug!("Reading the configuration: {:?}", cmd.config);

            let config = PlatformConfig::from_file(&cmd.config, &file_system)?;
            let handler = PbsHandler::from_probe(PbsCli {});

            if cmd.dry {
                info!("Would have cancelled {} (dry)", cancel_target(args));
                return Ok(());
            }

            match (&args.experiment, args.simulation) {
                (Some(experiment), Some(index)) => {
                    let outcome = handler.cancel_simulation(
                        &config,
                        &args.suite,
                        experiment,
                        index,
                        args.force,
                        &file_system,
                    )?;

                    report_outcome(&cancel_target(args), &outcome);
                }
                (Some(experiment), None) => {
                    let outcome = handler.cancel_experiment(
                        &config,
                        &args.suite,
                        experiment,
                        args.force,
                        &file_system,
                    )?;

                    report_outcome(&cancel_target(args), &outcome);
                }
                (None, None) => {
                    for (name, outcome) in
                        handler.cancel_suite(&config, &args.suite, args.force, &file_system)?
                    {
                        report_outcome(&format!("experiment {}/{name}", args.suite), &outcome);
                    }
                }
                (None, Some(_)) => {
                    bailc!(
                        "A simulation cannot be cancelled without its experiment", ;
                        "Simulation indices are only unique within one experiment", ;
                        "Provide the experiment name as well",
                    );
                }
            }
        }

        MarrowCommand::Probe => {
            let capability = probe(&PbsCli {});

            if capability.scheduler_available {
                println!("{}PBS is available{:#}", PRIMARY_STYLE, PRIMARY_STYLE);

                match capability.max_array_size {
                    Some(ceiling) => println!("usable array size ceiling: {ceiling}"),
                    None => println!("no array size ceiling could be determined"),
                }
            } else {
                println!("{}PBS is not available{:#}", PRIMARY_STYLE, PRIMARY_STYLE);
            }
        }
    }

    Ok(())
}

/// A human readable name for what a cancel invocation targets.
fn cancel_target(args: &CancelStruct) -> String {
    match (&args.experiment, args.simulation) {
        (Some(experiment), Some(index)) => {
            format!("simulation {index} of {}/{experiment}", args.suite)
        }
        (Some(experiment), None) => format!("experiment {}/{experiment}", args.suite),
        _ => format!("suite {}", args.suite),
    }
}

fn report_outcome(what: &str, outcome: &CancelOutcome) {
    match outcome {
        CancelOutcome::NotSubmitted => info!("{what} was never submitted"),
        CancelOutcome::Finished => info!("{what} had already finished"),
        CancelOutcome::Cancelled(jobs) => {
            let failed = jobs.iter().filter(|(_, ok)| !ok).count();

            if failed == 0 {
                info!("{what}: cancelled {} job(s)", jobs.len());
            } else {
                info!(
                    "{what}: cancelled {} job(s), {failed} could not be cancelled",
                    jobs.len() - failed
                );
            }
        }
        CancelOutcome::Failed(reason) => error!("{what} could not be cancelled: {reason}"),
    }
}

/// Prepare the log levels for the application.
fn setup_logging(cmd: &Cli) -> Result<()> {
    let mut log_build = default_builder();
    log_build.format(formatter(LogTokens));

    if cmd.verbose == 2 {
        log_build.filter(None, LevelFilter::Trace);
    } else if cmd.verbose == 1 {
        log_build.filter(None, LevelFilter::Debug);
    } else if cmd.verbose == 0 {
        log_build.filter(None, LevelFilter::Info);
    } else {
        return Err(anyhow!("Only two levels of verbosity supported (ie. -vv)")).context("");
    }

    log_build.try_init().with_context(ctx!(
        "Failed to initialize the command line interface", ;
        "Make sure you are using a supported terminal",
    ))?;

    Ok(())
}
