//! Error types for metrics computation.

use diagnostics::DiagnosticsError;
use pmp_common::PmpError;
use pmp_io::DatasetError;
use thiserror::Error;

/// Errors that can occur while resolving datasets or computing metrics.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A variable token carried a non-numeric level suffix.
    #[error("Invalid level '{segment}' in variable '{variable}'")]
    InvalidLevel { variable: String, segment: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown variability mode.
    #[error("Unknown variability mode: {0}")]
    UnknownMode(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    #[error(transparent)]
    Field(#[from] PmpError),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetricsError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
