//! On-disk dataset trees for tests.
//!
//! Each dataset is written as a small placeholder file, so path resolution
//! and fingerprinting see real files, while the field contents are served
//! by a [`MemoryReader`] keyed by the same absolute paths.

use std::fs;
use std::path::{Path, PathBuf};

use pmp_common::Field;
use pmp_io::MemoryReader;
use tempfile::TempDir;

/// A temporary directory of datasets plus a reader serving them.
pub struct DatasetTree {
    dir: TempDir,
    reader: MemoryReader,
}

impl DatasetTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            reader: MemoryReader::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a dataset relative to the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a placeholder file at `relative` and serve `field` from it.
    ///
    /// The placeholder contents depend on the field name and the path, so
    /// different datasets have different fingerprints.
    pub fn add(&mut self, relative: &str, field: Field) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dataset directory");
        }
        fs::write(&path, format!("{}:{}", field.name, relative)).expect("write dataset placeholder");
        self.reader.insert(path.clone(), field);
        path
    }

    /// Write a file that exists on disk but that the reader cannot serve.
    pub fn add_unreadable(&mut self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dataset directory");
        }
        fs::write(&path, b"not a dataset").expect("write placeholder");
        path
    }

    pub fn reader(&self) -> &MemoryReader {
        &self.reader
    }
}

impl Default for DatasetTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmp_io::{FieldReader, ReadRequest};

    #[test]
    fn test_add_serves_field() {
        let mut tree = DatasetTree::new();
        let field = Field::fixed("sftlf", vec![0.0], vec![0.0], vec![50.0]).unwrap();
        let path = tree.add("fx/sftlf.nc", field.clone());

        assert!(path.exists());
        let read = tree.reader().read(&path, &ReadRequest::new("sftlf")).unwrap();
        assert_eq!(read, field);
    }
}
