use log::debug;
use marrow_lib::batch::SystemCapability;

use crate::pbs::SchedulerClient;

/// Discover what the local PBS installation is capable of.
///
/// The two tool checks are independent; only when both succeed is the
/// array size ceiling read at all. The reported ceiling is the raw server
/// value minus one, leaving headroom for the reconciler's own bookkeeping
/// element.
///
/// This function never fails: a missing tool, an unresponsive server, or
/// an unparsable configuration all degrade to "no ceiling known". The
/// reconciler treats that as the absence of an additional constraint.
pub fn probe(client: &impl SchedulerClient) -> SystemCapability {
    let queue = client.queue_responds().unwrap_or(false);
    let server = client.server_responds().unwrap_or(false);

    if !(queue && server) {
        debug!("No responsive PBS installation found (qstat: {queue}, pbsnodes: {server})");
        return SystemCapability {
            scheduler_available: false,
            max_array_size: None,
        };
    }

    let max_array_size = match client.read_max_array_size() {
        Ok(raw) => Some(raw.saturating_sub(1)),
        Err(e) => {
            debug!("Could not read max_array_size: {e:?}");
            None
        }
    };

    SystemCapability {
        scheduler_available: true,
        max_array_size,
    }
}

#[cfg(test)]
#[path = "tests/probe.rs"]
mod tests;
