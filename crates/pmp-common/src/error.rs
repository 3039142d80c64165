//! Error types for the common data model.

use thiserror::Error;

/// Result type alias using PmpError.
pub type PmpResult<T> = Result<T, PmpError>;

/// Errors raised while building or manipulating gridded fields.
#[derive(Debug, Error)]
pub enum PmpError {
    #[error("Shape mismatch for '{name}': expected {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Unknown grid preset: {0}")]
    UnknownGridPreset(String),

    #[error("Selection is empty: {0}")]
    EmptySelection(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Grids do not match: {0}")]
    GridMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PmpError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create an InvalidGrid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create a GridMismatch error.
    pub fn grid_mismatch(msg: impl Into<String>) -> Self {
        Self::GridMismatch(msg.into())
    }
}
