//! Error types for dataset location and reading.

use std::path::PathBuf;

use pmp_common::PmpError;
use thiserror::Error;

/// Errors that can occur while locating or reading datasets.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Unresolved placeholder '%({name})' in template '{template}'")]
    UnresolvedPlaceholder { name: String, template: String },

    #[error("Malformed template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("'{selection}' is not a valid obs for '{variable}' according to the obs catalog")]
    UnknownObservation { variable: String, selection: String },

    #[error("Alias '{alias}' for '{variable}' points to another alias '{target}'")]
    AliasChain {
        variable: String,
        alias: String,
        target: String,
    },

    #[error("Catalog entry '{reference}' for '{variable}' is malformed: {reason}")]
    MalformedEntry {
        variable: String,
        reference: String,
        reason: String,
    },

    #[error("Dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("Variable '{variable}' not found in {path}")]
    VariableNotFound { path: PathBuf, variable: String },

    #[error("Level {level} Pa not available for '{variable}'")]
    LevelNotFound { variable: String, level: f64 },

    #[error("Failed to read dataset: {0}")]
    Read(String),

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Field(#[from] PmpError),
}

impl DatasetError {
    /// Create an UnknownObservation error.
    pub fn unknown_observation(variable: impl Into<String>, selection: impl Into<String>) -> Self {
        Self::UnknownObservation {
            variable: variable.into(),
            selection: selection.into(),
        }
    }

    /// Create a MalformedEntry error.
    pub fn malformed_entry(
        variable: impl Into<String>,
        reference: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedEntry {
            variable: variable.into(),
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create a Read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Whether the error means the dataset or file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DatasetNotFound(_) => true,
            Self::FileRead(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
