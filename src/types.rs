//! Type definitions shared across the probing pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Classification of a single measured address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    /// Handshake completed below the threshold
    CoLocated,
    /// Handshake completed at or above the threshold
    ReachableDistant,
    /// Resolution, connection or handshake failed
    Unreachable,
}

impl ProbeStatus {
    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::CoLocated => "COLO",
            Self::ReachableDistant => "SLOW",
            Self::Unreachable => "FAIL",
        }
    }

    /// CSS class used by the HTML report
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::CoLocated => "colo",
            Self::ReachableDistant => "slow",
            Self::Unreachable => "fail",
        }
    }

    pub fn is_co_located(&self) -> bool {
        matches!(self, Self::CoLocated)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a probe (or the resolution that precedes it) failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The per-probe timeout fired
    Timeout,
    /// The remote host actively refused the TCP connection
    ConnectionRefused,
    /// Any other I/O failure while connecting
    Connection,
    /// TCP connected but the TLS handshake failed
    Handshake,
    /// The target could not be probed at all (e.g. unusable SNI name)
    InvalidTarget,
    /// The endpoint's domain did not resolve to any address
    Resolution,
    /// The worker running the probe died before reporting
    Aborted,
}

impl FailureKind {
    /// Expected network-level unreachability, as opposed to a local problem
    /// worth surfacing in the logs at warn level.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionRefused | Self::Connection | Self::Handshake | Self::Resolution
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection refused",
            Self::Connection => "connection error",
            Self::Handshake => "handshake error",
            Self::InvalidTarget => "invalid target",
            Self::Resolution => "resolution failure",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
