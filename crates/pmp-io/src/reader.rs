//! Field readers: the I/O backend behind dataset descriptors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pmp_common::{BoundingBox, Field, TimeWindow};
use tracing::debug;

use crate::error::{DatasetError, Result};

/// Tolerance when matching a requested level (Pa) against stored levels.
const LEVEL_TOLERANCE: f64 = 1e-3;

/// What to read from a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadRequest<'a> {
    pub variable: &'a str,
    /// Vertical level in Pa.
    pub level: Option<f64>,
    pub domain: Option<BoundingBox>,
    pub window: Option<TimeWindow>,
}

impl<'a> ReadRequest<'a> {
    pub fn new(variable: &'a str) -> Self {
        Self {
            variable,
            ..Default::default()
        }
    }

    pub fn at_level(mut self, level: Option<f64>) -> Self {
        self.level = level;
        self
    }

    pub fn within(mut self, domain: Option<BoundingBox>) -> Self {
        self.domain = domain;
        self
    }

    pub fn during(mut self, window: Option<TimeWindow>) -> Self {
        self.window = window;
        self
    }
}

/// Opens a dataset path and returns the requested variable as a field.
pub trait FieldReader {
    fn read(&self, path: &Path, request: &ReadRequest<'_>) -> Result<Field>;
}

impl<T: FieldReader + ?Sized> FieldReader for &T {
    fn read(&self, path: &Path, request: &ReadRequest<'_>) -> Result<Field> {
        (**self).read(path, request)
    }
}

/// Apply the time window and domain of a request to a field that was read
/// in full.
pub fn apply_request(field: Field, request: &ReadRequest<'_>) -> Result<Field> {
    let field = match &request.window {
        Some(window) => field.select_times(window)?,
        None => field,
    };
    let field = match &request.domain {
        Some(domain) => field.subset(domain)?,
        None => field,
    };
    Ok(field)
}

/// In-memory dataset store keyed by path.
///
/// Each path holds any number of variables; a variable may be stored at
/// several levels.
#[derive(Debug, Default, Clone)]
pub struct MemoryReader {
    datasets: HashMap<PathBuf, HashMap<String, Vec<Field>>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `field` under `path`, keyed by the field's name.
    pub fn insert(&mut self, path: impl Into<PathBuf>, field: Field) {
        self.datasets
            .entry(path.into())
            .or_default()
            .entry(field.name.clone())
            .or_default()
            .push(field);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, field: Field) -> Self {
        self.insert(path, field);
        self
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.datasets.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl FieldReader for MemoryReader {
    fn read(&self, path: &Path, request: &ReadRequest<'_>) -> Result<Field> {
        let variables = self
            .datasets
            .get(path)
            .ok_or_else(|| DatasetError::DatasetNotFound(path.to_path_buf()))?;

        let candidates = variables
            .get(request.variable)
            .ok_or_else(|| DatasetError::VariableNotFound {
                path: path.to_path_buf(),
                variable: request.variable.to_string(),
            })?;

        let field = match request.level {
            Some(level) => candidates
                .iter()
                .find(|f| f.level.is_some_and(|l| (l - level).abs() < LEVEL_TOLERANCE))
                .ok_or_else(|| DatasetError::LevelNotFound {
                    variable: request.variable.to_string(),
                    level,
                })?,
            None => candidates
                .iter()
                .find(|f| f.level.is_none())
                .or_else(|| candidates.first())
                .ok_or_else(|| DatasetError::VariableNotFound {
                    path: path.to_path_buf(),
                    variable: request.variable.to_string(),
                })?,
        };

        debug!(path = ?path, variable = %request.variable, level = ?request.level, "Read field from memory");
        apply_request(field.clone(), request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(name: &str, value: f32) -> Field {
        Field::fixed(name, vec![0.0, 10.0], vec![0.0, 10.0], vec![value; 4]).unwrap()
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let reader = MemoryReader::new();
        let err = reader
            .read(Path::new("/nope.nc"), &ReadRequest::new("ts"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_variable() {
        let reader = MemoryReader::new().with("/a.nc", fixed("ts", 1.0));
        let err = reader
            .read(Path::new("/a.nc"), &ReadRequest::new("pr"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::VariableNotFound { .. }));
    }

    #[test]
    fn test_level_selection() {
        let reader = MemoryReader::new()
            .with("/ta.nc", fixed("ta", 1.0).with_level(85000.0))
            .with("/ta.nc", fixed("ta", 2.0).with_level(50000.0));

        let field = reader
            .read(Path::new("/ta.nc"), &ReadRequest::new("ta").at_level(Some(50000.0)))
            .unwrap();
        assert_eq!(field.data[0], 2.0);

        let err = reader
            .read(Path::new("/ta.nc"), &ReadRequest::new("ta").at_level(Some(20000.0)))
            .unwrap_err();
        assert!(matches!(err, DatasetError::LevelNotFound { .. }));
    }

    #[test]
    fn test_domain_applied() {
        let reader = MemoryReader::new().with("/a.nc", fixed("sftlf", 100.0));
        let domain = BoundingBox::from_lat_lon((5.0, 15.0), (5.0, 15.0));
        let field = reader
            .read(Path::new("/a.nc"), &ReadRequest::new("sftlf").within(Some(domain)))
            .unwrap();
        assert_eq!(field.slice_len(), 1);
    }
}
