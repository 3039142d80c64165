//! Error types for diagnostics.

use pmp_common::PmpError;
use thiserror::Error;

/// Errors that can occur while computing diagnostics.
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// The field has no time axis but the operation needs one.
    #[error("'{0}' has no time axis")]
    NoTimeAxis(String),

    /// Not enough valid data to compute a result.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Two fields were expected to share a grid.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    /// Matrix decomposition failed.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    #[error(transparent)]
    Field(#[from] PmpError),
}

impl DiagnosticsError {
    /// Create an InsufficientData error.
    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }
}

/// Result type for diagnostics.
pub type Result<T> = std::result::Result<T, DiagnosticsError>;
