//! Observation datasets located through the observation catalog.

use std::path::PathBuf;

use tracing::debug;

use crate::catalog::ObsCatalog;
use crate::descriptor::DatasetDescriptor;
use crate::error::Result;
use crate::template::PathTemplate;

/// File layout of observation datasets under the observation root.
pub const OBS_TEMPLATE: &str = "%(realm)/%(frequency)/%(variable)/%(reference)/%(ac)/%(filename)";

/// An observational dataset resolved from the catalog.
#[derive(Debug, Clone)]
pub struct ObservationCatalogEntry {
    pub descriptor: DatasetDescriptor,
    pub reference_name: String,
    pub variable: String,
    pub filename: String,
}

impl ObservationCatalogEntry {
    /// Look up `selection` for `variable` and configure the entry from the
    /// record's source table.
    pub fn lookup(
        root: impl Into<PathBuf>,
        catalog: &ObsCatalog,
        variable: &str,
        selection: &str,
        file_mask_template: Option<PathTemplate>,
    ) -> Result<Self> {
        let resolved = catalog.resolve(variable, selection)?;
        let table = resolved.table(variable)?;
        let filename = resolved.filename(variable)?.to_string();
        let reference_name = resolved.reference.to_string();

        let mut descriptor = DatasetDescriptor::new(root, PathTemplate::parse(OBS_TEMPLATE)?)
            .with_file_mask_template(file_mask_template);
        descriptor.configure(table);
        descriptor.variable = Some(variable.to_string());
        descriptor.set_custom("reference", reference_name.as_str());
        descriptor.set_custom("filename", filename.as_str());

        debug!(
            variable = %variable,
            selection = %selection,
            reference = %reference_name,
            table = %table,
            "Resolved observation"
        );

        Ok(Self {
            descriptor,
            reference_name,
            variable: variable.to_string(),
            filename,
        })
    }

    /// Path of the observation file.
    pub fn materialize(&self) -> Result<PathBuf> {
        self.descriptor.materialize()
    }

    /// Observation path relative to the observation root.
    pub fn relative_path(&self) -> Result<String> {
        self.descriptor.template.resolve(&self.descriptor.bindings())
    }
}
