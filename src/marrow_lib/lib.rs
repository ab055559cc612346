//! The architecture of our codebase, shared between the CLI and its tests.

/// A struct and related methods for the platform configuration,
/// declaratively specifying where jobs live and what they may request.
pub mod config;

/// The setup of suites, experiments, and simulations.
pub mod experiment;

/// Reconciling concurrency knobs into a schedulable job configuration.
pub mod batch;

/// Common file operations
pub mod file_system;

/// The error handling for `marrow`.
pub mod error;

/// Constant values.
pub mod constants;
