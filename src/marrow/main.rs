//! Marrow hands experiments over to a PBS scheduler as job arrays.

/// The command line interface and relevant structures.
#[cfg(not(tarpaulin_include))]
pub mod cli;

/// A framework for submitting, cancelling, and querying experiments by
/// interfacing with a local installation of PBS.
pub mod pbs;

/// Generation of the submission artifacts placed in experiment directories.
pub mod scripts;

/// Functionality for checking and displaying the status of already
/// submitted experiments.
pub mod status;

/// Convenience functions for unit tests.
#[cfg(test)]
pub mod test_utils;

/// The main CLI entry-point of the `marrow` utility.
///
/// This function parses command-line arguments and executes
/// sub-commands as specified by the user.
#[cfg(not(tarpaulin_include))]
fn main() {
    cli::process::parse_command();
}
