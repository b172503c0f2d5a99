//! Error types for the browser driver

use tagwatch_core::MonitorError;
use thiserror::Error;

/// Result type alias using BrowserError
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Node.js not found. Install Node and run: npx playwright install chromium")]
    NodeNotFound,

    #[error("Driver failed to start: {0}")]
    Startup(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Driver command failed: {0}")]
    Command(String),

    #[error("Timed out waiting for the driver")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every driver failure is an infrastructure failure from the pipeline's
/// point of view: it aborts the checkpoint, never a validation outcome.
impl From<BrowserError> for MonitorError {
    fn from(e: BrowserError) -> Self {
        MonitorError::Capture(e.to_string())
    }
}
