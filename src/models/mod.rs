//! Data models for the probing pipeline

pub mod config;
pub mod endpoint;
pub mod result;

// Re-export main model types
pub use config::Config;
pub use endpoint::{Endpoint, ProbeTarget, ResolvedAddress};
pub use result::{Enrichment, ProbeFailure, ProbeResult};
