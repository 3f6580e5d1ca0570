//! Error taxonomy for the monitoring pipeline
//!
//! Each variant maps to one failure class. Only [`MonitorError::Acquisition`]
//! is ever surfaced to a client; the others are recorded and absorbed by the
//! pipeline.

use thiserror::Error;

/// Failures produced by the monitoring components
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    /// Host metrics could not be read from the OS
    #[error("unable to acquire system metrics: {0}")]
    Acquisition(String),

    /// The anomaly model is missing and could not be trained or read
    #[error("anomaly model unavailable: {0}")]
    ModelUnavailable(String),

    /// Alert delivery failed (auth, timeout, network, addressing)
    #[error("alert transport failed: {0}")]
    Transport(String),

    /// A configuration value was present but unusable
    #[error("invalid configuration value for {key}: {reason}")]
    Configuration { key: String, reason: String },
}

impl MonitorError {
    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Acquisition(_) => "acquisition",
            MonitorError::ModelUnavailable(_) => "model_unavailable",
            MonitorError::Transport(_) => "transport",
            MonitorError::Configuration { .. } => "configuration",
        }
    }
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
