//! Land/sea mask cache.
//!
//! Holds, per model version, the model's own land fraction (when one can be
//! found) and one land fraction on the configured target grid, shared by
//! every resolver of the run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use pmp_common::grid::grids;
use pmp_common::{Field, GridSpec, RegridMethod, RegridTool, Regridder, TargetGrid};
use pmp_io::{DatasetDescriptor, FieldReader, ReadRequest, LAND_FRACTION_VARIABLE};
use tracing::{debug, info, warn};

use crate::error::{MetricsError, Result};
use crate::parameter::Parameter;

/// Grid preset that maps to the built-in 2.5° global grid.
const DEFAULT_PRESET: &str = "2.5x2.5";

/// Land fraction of one model version.
///
/// All fields are `None` when the version has no usable land fraction file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskInfo {
    pub raw: Option<Field>,
    pub filename: Option<String>,
    pub fingerprint: Option<String>,
}

impl MaskInfo {
    pub fn is_missing(&self) -> bool {
        self.raw.is_none() && self.filename.is_none() && self.fingerprint.is_none()
    }
}

/// Produces a land fraction on a grid.
pub trait LandSeaMaskGenerator {
    /// Land fraction in `[0, 1]`, `NaN` where unknown.
    fn generate(&self, grid: &GridSpec) -> Result<Field>;
}

/// Generates masks by regridding a reference land fraction file.
pub struct RegriddedMaskGenerator<'a> {
    reader: &'a dyn FieldReader,
    regridder: &'a dyn Regridder,
    path: PathBuf,
}

impl<'a> RegriddedMaskGenerator<'a> {
    pub fn new(reader: &'a dyn FieldReader, regridder: &'a dyn Regridder, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            regridder,
            path: path.into(),
        }
    }
}

impl LandSeaMaskGenerator for RegriddedMaskGenerator<'_> {
    fn generate(&self, grid: &GridSpec) -> Result<Field> {
        let source = self
            .reader
            .read(&self.path, &ReadRequest::new(LAND_FRACTION_VARIABLE))?;
        let mut field =
            self.regridder
                .regrid(&source, grid, RegridTool::Regrid2, RegridMethod::Conservative)?;

        // Reference files are usually in percent.
        let max = field
            .data
            .iter()
            .filter(|v| !v.is_nan())
            .fold(0.0f32, |m, &v| m.max(v));
        if max > 1.0 {
            field.scale(0.01);
        }
        Ok(field)
    }
}

/// Per-model-version land fractions plus the target-grid mask.
#[derive(Debug, Clone)]
pub struct LandSeaMaskCache {
    versions: BTreeMap<String, MaskInfo>,
    target_grid: GridSpec,
    target_mask: Field,
}

impl LandSeaMaskCache {
    pub fn get(&self, model_version: &str) -> Option<&MaskInfo> {
        self.versions.get(model_version)
    }

    pub fn versions(&self) -> impl Iterator<Item = (&str, &MaskInfo)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn target_grid(&self) -> &GridSpec {
        &self.target_grid
    }

    /// Land fraction (percent) on the target grid.
    pub fn target_mask(&self) -> &Field {
        &self.target_mask
    }

    /// Cells of the target grid whose land fraction differs from `value`.
    pub fn target_mask_for(&self, value: f64) -> Vec<bool> {
        self.target_mask
            .slice(0)
            .iter()
            .map(|&frac| f64::from(frac) != value)
            .collect()
    }
}

/// Descriptor of a model version's land fraction file.
pub fn sftlf_descriptor(parameter: &Parameter, model_version: &str) -> Result<DatasetDescriptor> {
    let mut sft = DatasetDescriptor::from_pattern(&parameter.mod_data_path, parameter.sftlf_template())?;
    sft.model_version = Some(model_version.to_string());
    sft.table = Some("fx".to_string());
    sft.realm = Some("atmos".to_string());
    sft.period = parameter.period.clone();
    sft.ext = Some("nc".to_string());
    sft.case_id = parameter.case_id.clone();
    sft.realization = Some("r0i0p0".to_string());
    sft.variable = Some(LAND_FRACTION_VARIABLE.to_string());
    sft.set_custom("mip", parameter.mip.as_str());
    sft.set_custom("exp", parameter.exp.as_str());
    Ok(sft)
}

/// Read one model version's land fraction file.
pub fn load_version(parameter: &Parameter, reader: &dyn FieldReader, model_version: &str) -> Result<MaskInfo> {
    let sft = sftlf_descriptor(parameter, model_version)?;
    let path = sft.materialize()?;
    let raw = reader.read(&path, &ReadRequest::new(LAND_FRACTION_VARIABLE))?;
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .ok_or_else(|| MetricsError::config(format!("'{}' has no file name", path.display())))?;
    let fingerprint = sft.fingerprint()?;
    Ok(MaskInfo {
        raw: Some(raw),
        filename: Some(filename),
        fingerprint: Some(fingerprint),
    })
}

/// Grid the target mask is built on.
pub fn mask_grid(target: &TargetGrid) -> Result<GridSpec> {
    match target {
        TargetGrid::Preset(name) if name == DEFAULT_PRESET => Ok(grids::uniform_2p5()),
        other => Ok(other.resolve()?),
    }
}

/// Fill unknown cells as land and convert to percent in `[0, 100]`.
pub fn normalize_land_fraction(field: &mut Field) {
    for v in &mut field.data {
        let frac = if v.is_nan() { 1.0 } else { *v };
        *v = (frac * 100.0).clamp(0.0, 100.0);
    }
}

/// Build the mask cache.
///
/// A model version without a readable land fraction gets an all-`None`
/// entry; the other versions are unaffected. Failing to build the
/// target-grid mask is an error.
pub fn build(
    parameter: &Parameter,
    reader: &dyn FieldReader,
    generator: &dyn LandSeaMaskGenerator,
) -> Result<LandSeaMaskCache> {
    let mut versions = BTreeMap::new();
    for model_version in &parameter.model_versions {
        let info = match load_version(parameter, reader, model_version) {
            Ok(info) => {
                debug!(model = %model_version, filename = ?info.filename, "Loaded land fraction");
                info
            }
            Err(e) => {
                warn!(model = %model_version, error = %e, "No land fraction for model version");
                MaskInfo::default()
            }
        };
        versions.insert(model_version.clone(), info);
    }

    let target_grid = mask_grid(&parameter.target_grid)?;
    let mut target_mask = generator.generate(&target_grid)?;
    normalize_land_fraction(&mut target_mask);

    info!(
        versions = versions.len(),
        missing = versions.values().filter(|v: &&MaskInfo| v.is_missing()).count(),
        nx = target_grid.nx,
        ny = target_grid.ny,
        "Built land/sea mask cache"
    );

    Ok(LandSeaMaskCache {
        versions,
        target_grid,
        target_mask,
    })
}

/// Explicit handle to a mask cache that is built on first use and shared
/// afterwards.
///
/// A failed build is remembered and not retried.
pub struct MaskCacheSlot<'a> {
    cache: Option<Rc<LandSeaMaskCache>>,
    builder: Option<Box<dyn Fn() -> Result<LandSeaMaskCache> + 'a>>,
    failure: Option<String>,
}

impl<'a> MaskCacheSlot<'a> {
    /// A slot that builds the cache the first time it is needed.
    pub fn lazy(builder: impl Fn() -> Result<LandSeaMaskCache> + 'a) -> Self {
        Self {
            cache: None,
            builder: Some(Box::new(builder)),
            failure: None,
        }
    }

    /// A slot holding an already-built cache.
    pub fn ready(cache: Rc<LandSeaMaskCache>) -> Self {
        Self {
            cache: Some(cache),
            builder: None,
            failure: None,
        }
    }

    /// A slot with no cache and no way to build one.
    pub fn empty() -> Self {
        Self {
            cache: None,
            builder: None,
            failure: None,
        }
    }

    pub fn is_built(&self) -> bool {
        self.cache.is_some()
    }

    pub fn get(&self) -> Option<Rc<LandSeaMaskCache>> {
        self.cache.clone()
    }

    /// Return the cache, building it first if needed.
    pub fn get_or_build(&mut self) -> Result<Rc<LandSeaMaskCache>> {
        if let Some(cache) = &self.cache {
            return Ok(Rc::clone(cache));
        }
        if let Some(failure) = &self.failure {
            return Err(MetricsError::config(format!("land/sea mask cache unavailable: {}", failure)));
        }
        let builder = self
            .builder
            .take()
            .ok_or_else(|| MetricsError::config("land/sea mask requested but no mask source configured"))?;
        match builder() {
            Ok(cache) => {
                let cache = Rc::new(cache);
                self.cache = Some(Rc::clone(&cache));
                Ok(cache)
            }
            Err(e) => {
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }
}
