//! Nightwatch
//!
//! A crate for assembling a nightly observation report for a fixed location:
//! the 18:00 → 06:00 window, hourly cloud cover, rise/set/transit times for a
//! set of bodies, satellite passes and the moon phase.

use thiserror::Error;

pub mod align;
pub mod config;
pub mod ephemeris;
pub mod events;
pub mod output;
pub mod passes;
pub mod phase;
pub mod reference;
pub mod report;
pub mod satellite;
pub mod tle;
pub mod weather;
pub mod window;

pub use config::{Config, ObserverLocation};
pub use report::{NightlyReport, ReportAssembler};
pub use window::ObservationWindow;

/// Result type alias for nightwatch operations.
pub type NightwatchResult<T> = Result<T, NightwatchError>;

/// Error types for nightwatch operations.
///
/// Everything a provider can raise is recovered at the report step that
/// called it; only `ConfigError` and `OutputError` reach the binary.
#[derive(Error, Debug, Clone)]
pub enum NightwatchError {
    #[error("ProviderUnavailable: {0}")]
    ProviderUnavailable(String),
    #[error("DataAlignmentMiss: {0}")]
    DataAlignmentMiss(String),
    #[error("ParseFailure: {0}")]
    ParseFailure(String),
    #[error("ComputationError: {0}")]
    ComputationError(String),
    #[error("ConfigError: {0}")]
    ConfigError(String),
    #[error("OutputError: {0}")]
    OutputError(String),
}

/// Builds the blocking HTTP client shared by the network providers.
pub(crate) fn http_client() -> NightwatchResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent(concat!("nightwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            NightwatchError::ProviderUnavailable(format!("Failed to create HTTP client: {e}"))
        })
}
