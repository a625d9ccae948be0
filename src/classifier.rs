//! Threshold classification of probe outcomes

use crate::probe::ProbeOutcome;
use crate::types::ProbeStatus;
use std::time::Duration;

/// Map a probe outcome onto a status.
///
/// Failures are always `Unreachable`. A successful handshake is `CoLocated`
/// only when strictly faster than `threshold`; equal or slower is
/// `ReachableDistant`.
pub fn classify(outcome: &ProbeOutcome, threshold: Duration) -> ProbeStatus {
    match outcome {
        ProbeOutcome::Failure { .. } => ProbeStatus::Unreachable,
        ProbeOutcome::Success { elapsed } => classify_elapsed(*elapsed, threshold),
    }
}

/// Classification of a successful handshake by elapsed time alone
pub fn classify_elapsed(elapsed: Duration, threshold: Duration) -> ProbeStatus {
    if elapsed < threshold {
        ProbeStatus::CoLocated
    } else {
        ProbeStatus::ReachableDistant
    }
}
