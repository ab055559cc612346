use std::cmp::min;

use log::debug;

use crate::config::ResourceRequest;

/// What a one-time probe discovered about the local scheduler installation.
///
/// Constructed once per process and passed explicitly; a fresh probe
/// requires a fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemCapability {
    /// Whether a responsive scheduler installation was found.
    pub scheduler_available: bool,

    /// The installation's hard ceiling on job-array sizes, if known.
    pub max_array_size: Option<usize>,
}

/// The reconciled configuration baked into one experiment submission.
///
/// Recomputed on every submission and never persisted on its own; the
/// generated scripts are the only durable copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfiguration {
    /// Concurrency ceiling on simultaneously running jobs.
    pub max_running_jobs: usize,

    /// How many array elements are submitted together as one array.
    pub array_batch_size: usize,

    /// Whether consecutive arrays are chained on predecessor completion.
    pub dependency: bool,
}

/// Fold the caller's knobs, the platform defaults, and the discovered
/// system ceiling into one schedulable [JobConfiguration].
///
/// The system ceiling is a hard scheduler limit that is never exceeded
/// regardless of caller intent, and the simulation count is a hard logical
/// limit. The caller's and platform's values are soft preferences: an
/// oversized `array_batch_size` is silently clamped, never an error.
///
/// This function cannot fail; every missing input degrades to a safe
/// default. A discovered ceiling of zero is unsatisfiable as stated, so
/// the floor of one wins over it: schedulability is preferred over the
/// ceiling in that one degenerate case, and the submission is left to the
/// scheduler's own rejection.
pub fn reconcile(
    simulation_count: usize,
    max_running_jobs: Option<usize>,
    array_batch_size: Option<usize>,
    dependency: Option<bool>,
    resources: &ResourceRequest,
    capability: &SystemCapability,
) -> JobConfiguration {
    // The caller can never exceed an administratively configured ceiling.
    let max_running = match (max_running_jobs, resources.max_running_jobs) {
        (Some(caller), Some(admin)) => min(caller, admin),
        (Some(caller), None) => caller,
        (None, Some(admin)) => admin,
        (None, None) => 1,
    };

    let preference = array_batch_size.or(resources.array_batch_size);

    let batch = match (capability.max_array_size, preference) {
        (Some(ceiling), Some(preferred)) => min(ceiling, min(preferred, simulation_count)),
        (Some(ceiling), None) => min(ceiling, simulation_count),
        (None, Some(preferred)) => min(preferred, simulation_count),
        // One array spanning every simulation.
        (None, None) => simulation_count,
    };

    if preference.is_some_and(|preferred| preferred > batch) {
        debug!("Requested array batch size clamped to {batch}");
    }

    JobConfiguration {
        max_running_jobs: max_running.max(1),
        array_batch_size: batch.max(1),
        dependency: dependency.unwrap_or(true),
    }
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
