//! Dataset location and reading for climate diagnostics.
//!
//! # Architecture
//!
//! Files are located through `%(name)` naming templates:
//!
//! - [`PathTemplate`] parses a pattern and resolves it against bindings
//! - [`DatasetDescriptor`] holds naming attributes plus the per-dataset
//!   transformations (land masking, regrid target, target mask)
//! - [`ObsCatalog`] maps variables to observation aliases and records
//! - [`ObservationCatalogEntry`] is a descriptor configured from a catalog
//!   record
//!
//! Reading goes through the [`FieldReader`] trait. [`MemoryReader`] is
//! always available; the NetCDF reader needs the `netcdf` feature.

pub mod catalog;
pub mod descriptor;
pub mod error;
#[cfg(feature = "netcdf")]
mod netcdf_reader;
pub mod observation;
pub mod reader;
pub mod template;

// Re-exports
pub use catalog::{CatalogValue, ObsCatalog, ObsRecord, ResolvedObs, DEFAULT_SELECTION};
pub use descriptor::{
    file_checksum, DatasetDescriptor, FetchOptions, TableConvention, LAND_FRACTION_VARIABLE,
};
pub use error::{DatasetError, Result};
#[cfg(feature = "netcdf")]
pub use netcdf_reader::NetCdfReader;
pub use observation::{ObservationCatalogEntry, OBS_TEMPLATE};
pub use reader::{apply_request, FieldReader, MemoryReader, ReadRequest};
pub use template::{Bindings, PathTemplate};
