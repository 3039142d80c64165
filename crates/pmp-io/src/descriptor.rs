//! Dataset descriptors: naming attributes plus per-dataset transformations.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use pmp_common::{Field, GridSpec, RegridMethod, RegridTool, Regridder, Region, TimeWindow};
use tracing::{debug, warn};

use crate::error::{DatasetError, Result};
use crate::reader::{FieldReader, ReadRequest};
use crate::template::{Bindings, PathTemplate};

/// Variable holding land fraction in mask files.
pub const LAND_FRACTION_VARIABLE: &str = "sftlf";

/// Naming and averaging convention implied by a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConvention {
    pub realm: &'static str,
    pub frequency: &'static str,
    pub ac: &'static str,
}

impl TableConvention {
    /// Classify a source table.
    ///
    /// `Omon` is ocean monthly and `fx` is a fixed field. Every other table
    /// is treated as atmosphere monthly; unknown tables are not rejected.
    pub fn for_table(table: &str) -> Self {
        match table {
            "Omon" => Self {
                realm: "ocn",
                frequency: "mo",
                ac: "ac",
            },
            "fx" => Self {
                realm: "",
                frequency: "fx",
                ac: "",
            },
            _ => Self {
                realm: "atm",
                frequency: "mo",
                ac: "ac",
            },
        }
    }
}

/// Options for [`DatasetDescriptor::get`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions<'a> {
    pub level: Option<f64>,
    pub region: Option<&'a Region>,
    pub window: Option<TimeWindow>,
}

/// A dataset located through a file-naming template.
///
/// Attributes are assigned incrementally; only the ones the template
/// references must be set before [`materialize`](Self::materialize).
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    pub root: PathBuf,
    pub template: PathTemplate,

    pub realm: Option<String>,
    pub frequency: Option<String>,
    pub table: Option<String>,
    pub case_id: Option<String>,
    pub ext: Option<String>,
    pub model_version: Option<String>,
    pub realization: Option<String>,
    pub period: Option<String>,
    pub variable: Option<String>,
    pub ac: Option<String>,
    /// Extra placeholder bindings (e.g. `reference`, `filename`, `mip`).
    pub custom: Bindings,

    /// Pre-rendered path of the land-fraction file used to mask the source.
    pub file_mask_template: Option<PathTemplate>,
    pub target_grid: Option<GridSpec>,
    /// Cells of the target grid to mask after regridding (`true` = masked).
    pub target_mask: Option<Vec<bool>>,
    pub regrid_tool: Option<RegridTool>,
    pub regrid_method: Option<RegridMethod>,
}

impl DatasetDescriptor {
    pub fn new(root: impl Into<PathBuf>, template: PathTemplate) -> Self {
        Self {
            root: root.into(),
            template,
            realm: None,
            frequency: None,
            table: None,
            case_id: None,
            ext: None,
            model_version: None,
            realization: None,
            period: None,
            variable: None,
            ac: None,
            custom: Bindings::new(),
            file_mask_template: None,
            target_grid: None,
            target_mask: None,
            regrid_tool: None,
            regrid_method: None,
        }
    }

    /// Parse `template` and build a descriptor for it.
    pub fn from_pattern(root: impl Into<PathBuf>, template: &str) -> Result<Self> {
        Ok(Self::new(root, PathTemplate::parse(template)?))
    }

    pub fn with_file_mask_template(mut self, mask: Option<PathTemplate>) -> Self {
        self.file_mask_template = mask;
        self
    }

    /// Set realm, frequency and averaging convention from a source table.
    pub fn configure(&mut self, table: &str) {
        let convention = TableConvention::for_table(table);
        if !matches!(table, "Omon" | "fx" | "Amon") {
            debug!(table = %table, "Unrecognized source table, treating as atmosphere monthly");
        }
        self.realm = Some(convention.realm.to_string());
        self.frequency = Some(convention.frequency.to_string());
        self.ac = Some(convention.ac.to_string());
    }

    /// Bind an extra placeholder.
    pub fn set_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.insert(key.into(), value.into());
    }

    /// Record the regrid target and how to get there.
    pub fn set_target_grid(&mut self, grid: GridSpec, tool: RegridTool, method: RegridMethod) {
        self.target_grid = Some(grid);
        self.regrid_tool = Some(tool);
        self.regrid_method = Some(method);
    }

    /// Current placeholder bindings.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = self.custom.clone();
        let named = [
            ("realm", &self.realm),
            ("frequency", &self.frequency),
            ("table", &self.table),
            ("case_id", &self.case_id),
            ("ext", &self.ext),
            ("model_version", &self.model_version),
            ("realization", &self.realization),
            ("period", &self.period),
            ("variable", &self.variable),
            ("ac", &self.ac),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                bindings.insert(key.to_string(), value.clone());
            }
        }
        bindings
    }

    /// Resolve the dataset's path.
    pub fn materialize(&self) -> Result<PathBuf> {
        let relative = self.template.resolve(&self.bindings())?;
        Ok(self.under_root(&relative))
    }

    /// Resolve the path of the source land-fraction file, if one is set.
    pub fn mask_path(&self) -> Result<Option<PathBuf>> {
        match &self.file_mask_template {
            Some(template) => Ok(Some(self.under_root(&template.resolve(&self.bindings())?))),
            None => Ok(None),
        }
    }

    /// Join a resolved path onto the root. An empty leading segment (e.g. an
    /// empty realm) must not turn the path absolute.
    fn under_root(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// CRC-32 checksum of the dataset file as 8 hex digits.
    pub fn fingerprint(&self) -> Result<String> {
        let path = self.materialize()?;
        file_checksum(&path)
    }

    /// Read `variable` and apply this dataset's transformations.
    ///
    /// In order: read (level, time window), mask the source by the land
    /// fraction file when the region carries a value, regrid onto the target
    /// grid, apply the target mask, then cut the region's domain.
    pub fn get(
        &self,
        reader: &dyn FieldReader,
        regridder: &dyn Regridder,
        variable: &str,
        options: FetchOptions<'_>,
    ) -> Result<Field> {
        let path = self.materialize()?;
        let request = ReadRequest::new(variable)
            .at_level(options.level)
            .during(options.window);
        let mut field = reader.read(&path, &request)?;
        debug!(path = ?path, variable = %variable, "Read dataset");

        if let Some(value) = options.region.and_then(|r| r.value) {
            self.mask_source(reader, &mut field, value);
        }

        if let Some(grid) = &self.target_grid {
            let tool = self.regrid_tool.unwrap_or_default();
            let method = self.regrid_method.unwrap_or_default();
            field = regridder.regrid(&field, grid, tool, method)?;
            debug!(tool = %tool, method = %method, nx = grid.nx, ny = grid.ny, "Regridded dataset");

            if let Some(mask) = &self.target_mask {
                field.mask_where(mask)?;
            }
        }

        if let Some(domain) = options.region.and_then(|r| r.domain) {
            field = field.subset(&domain)?;
        }

        Ok(field)
    }

    /// Mask source cells whose land fraction differs from `value`.
    ///
    /// A missing or unreadable mask leaves the field untouched.
    fn mask_source(&self, reader: &dyn FieldReader, field: &mut Field, value: f64) {
        let mask_path = match self.mask_path() {
            Ok(Some(path)) => path,
            Ok(None) => {
                debug!("No land fraction file for dataset, source left unmasked");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Could not resolve land fraction path, source left unmasked");
                return;
            }
        };

        let mask = match reader.read(&mask_path, &ReadRequest::new(LAND_FRACTION_VARIABLE)) {
            Ok(mask) => mask,
            Err(e) => {
                warn!(path = ?mask_path, error = %e, "Could not read land fraction, source left unmasked");
                return;
            }
        };

        if !mask.same_grid(field) {
            warn!(path = ?mask_path, "Land fraction grid differs from dataset grid, source left unmasked");
            return;
        }

        let cells: Vec<bool> = mask
            .slice(0)
            .iter()
            .map(|&frac| f64::from(frac) != value)
            .collect();
        if let Err(e) = field.mask_where(&cells) {
            warn!(error = %e, "Could not apply land fraction mask");
        }
    }
}

/// CRC-32 checksum of a file's contents as 8 lowercase hex digits.
pub fn file_checksum(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DatasetError::DatasetNotFound(path.to_path_buf())
        } else {
            DatasetError::FileRead(e)
        }
    })?;

    let mut reader = BufReader::new(file);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:08x}", hasher.finalize()))
}
