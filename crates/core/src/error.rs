//! Error types for the monitoring pipeline

use thiserror::Error;

/// Result type alias using MonitorError
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Monitoring pipeline errors.
///
/// A failed assertion is never an error: it is recorded on the checkpoint
/// and reported as data. Errors here are infrastructure failures or
/// programming-contract violations.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The browser layer could not produce a screenshot or an observation.
    /// Aborts the current checkpoint; checkpoints recorded earlier stay
    /// usable for a partial report.
    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Checkpoint '{0}' has already been validated")]
    AlreadyValidated(String),

    #[error("Checkpoint '{0}' has not been validated")]
    NotValidated(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Annotation failed: {0}")]
    Annotation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
