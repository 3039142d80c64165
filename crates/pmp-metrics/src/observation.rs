//! Observation resolution for one (variable, region, observation) request.

use std::rc::Rc;

use pmp_common::{Field, Region, Regridder, TimeWindow};
use pmp_io::{FetchOptions, FieldReader, ObsCatalog, ObservationCatalogEntry, PathTemplate};
use tracing::{debug, error};

use crate::error::{MetricsError, Result};
use crate::parameter::Parameter;
use crate::sftlf::{LandSeaMaskCache, MaskCacheSlot};

/// Table whose observations are regridded with the ocean settings.
const OCEAN_TABLE: &str = "Omon";

/// A fully configured observation dataset.
///
/// Construction runs three steps: the pressure level is parsed from the
/// variable token, the land fraction file of the selected observation is
/// located if possible, and the catalog entry is configured with regrid
/// settings and, for regions with a land fraction value, a target mask.
#[derive(Debug, Clone)]
pub struct ObservationResolver {
    /// Base variable name, level suffix removed.
    pub variable: String,
    /// Pressure level in Pa.
    pub level: Option<f64>,
    pub region: Option<Region>,
    pub selection: String,
    pub entry: ObservationCatalogEntry,
    sftlf: Option<Rc<LandSeaMaskCache>>,
}

impl ObservationResolver {
    pub fn new(
        parameter: &Parameter,
        var_name_long: &str,
        region: Option<Region>,
        selection: &str,
        catalog: &ObsCatalog,
        masks: &mut MaskCacheSlot<'_>,
    ) -> Result<Self> {
        let level = calculate_level_from_var(var_name_long)?;
        let variable = base_variable(var_name_long).to_string();

        let mask_name = create_obs_mask_name(parameter, catalog, &variable, selection);
        let mut entry = ObservationCatalogEntry::lookup(
            &parameter.obs_data_path,
            catalog,
            &variable,
            selection,
            mask_name,
        )?;

        let sftlf = setup_obs_file(&mut entry, parameter, catalog, &variable, region.as_ref(), masks)?;

        debug!(
            variable = %variable,
            level = ?level,
            selection = %selection,
            reference = %entry.reference_name,
            region = ?region.as_ref().map(|r| r.id.as_str()),
            "Configured observation"
        );

        Ok(Self {
            variable,
            level,
            region,
            selection: selection.to_string(),
            entry,
            sftlf,
        })
    }

    /// Mask cache this resolver used, if its region needed one.
    pub fn sftlf(&self) -> Option<&LandSeaMaskCache> {
        self.sftlf.as_deref()
    }

    /// Fetch the observation with the region applied.
    pub fn get(&self, reader: &dyn FieldReader, regridder: &dyn Regridder) -> Result<Field> {
        self.get_within(reader, regridder, None)
    }

    /// Fetch the observation restricted to a time window.
    pub fn get_within(
        &self,
        reader: &dyn FieldReader,
        regridder: &dyn Regridder,
        window: Option<TimeWindow>,
    ) -> Result<Field> {
        let options = FetchOptions {
            level: self.level,
            region: self.region.as_ref(),
            window,
        };
        Ok(self
            .entry
            .descriptor
            .get(reader, regridder, &self.variable, options)?)
    }
}

/// Variable name without its level suffix.
pub fn base_variable(var_name_long: &str) -> &str {
    var_name_long.split('_').next().unwrap_or(var_name_long)
}

/// Pressure level in Pa encoded as a trailing `_<hPa>` segment.
pub fn calculate_level_from_var(var_name_long: &str) -> Result<Option<f64>> {
    let segments: Vec<&str> = var_name_long.split('_').collect();
    if segments.len() < 2 {
        return Ok(None);
    }
    let last = segments[segments.len() - 1];
    let hpa: f64 = last.parse().map_err(|_| MetricsError::InvalidLevel {
        variable: var_name_long.to_string(),
        segment: last.to_string(),
    })?;
    Ok(Some(hpa * 100.0))
}

/// Locate the land fraction file of the selected observation.
///
/// Best effort: every failure is logged and yields `None`.
pub fn create_obs_mask_name(
    parameter: &Parameter,
    catalog: &ObsCatalog,
    variable: &str,
    selection: &str,
) -> Option<PathTemplate> {
    match find_obs_mask(parameter, catalog, variable, selection) {
        Ok(path) => Some(PathTemplate::rendered(path)),
        Err(e) => {
            error!(
                variable = %variable,
                selection = %selection,
                error = %e,
                "Could not figure out obs mask name from obs catalog"
            );
            None
        }
    }
}

fn find_obs_mask(
    parameter: &Parameter,
    catalog: &ObsCatalog,
    variable: &str,
    selection: &str,
) -> Result<String> {
    let resolved = catalog.resolve(variable, selection)?;
    let ref_name = resolved.record.ref_name.as_deref().ok_or_else(|| {
        MetricsError::config(format!(
            "observation '{}' of '{}' has no RefName",
            resolved.reference, variable
        ))
    })?;
    let mask = ObservationCatalogEntry::lookup(
        &parameter.obs_data_path,
        catalog,
        pmp_io::LAND_FRACTION_VARIABLE,
        ref_name,
        None,
    )?;
    Ok(mask.relative_path()?)
}

/// Whether the variable's default observation is an ocean product.
///
/// Follows the default observation even when another one is selected.
pub fn use_omon(catalog: &ObsCatalog, variable: &str) -> Result<bool> {
    Ok(catalog.default_table(variable)? == OCEAN_TABLE)
}

fn setup_obs_file(
    entry: &mut ObservationCatalogEntry,
    parameter: &Parameter,
    catalog: &ObsCatalog,
    variable: &str,
    region: Option<&Region>,
    masks: &mut MaskCacheSlot<'_>,
) -> Result<Option<Rc<LandSeaMaskCache>>> {
    let descriptor = &mut entry.descriptor;
    let (tool, method) = if use_omon(catalog, variable)? {
        descriptor.table = Some(OCEAN_TABLE.to_string());
        descriptor.realm = Some("ocn".to_string());
        (parameter.regrid_tool_ocn, parameter.regrid_method_ocn)
    } else {
        descriptor.table = Some("Amon".to_string());
        descriptor.realm = Some("atm".to_string());
        (parameter.regrid_tool, parameter.regrid_method)
    };

    descriptor.set_target_grid(parameter.target_grid.resolve()?, tool, method);

    let Some(value) = region.and_then(|r| r.value) else {
        return Ok(None);
    };
    let cache = masks.get_or_build()?;
    descriptor.target_mask = Some(cache.target_mask_for(value));
    Ok(Some(cache))
}

/// Expand the configured observation selections for a variable.
pub fn observation_list(parameter: &Parameter, catalog: &ObsCatalog, variable: &str) -> Vec<String> {
    catalog.observation_list(&parameter.reference_data_set, variable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_extraction() {
        assert_eq!(calculate_level_from_var("ts").unwrap(), None);
        assert_eq!(calculate_level_from_var("ta_850").unwrap(), Some(85000.0));
        assert_eq!(calculate_level_from_var("ua_200").unwrap(), Some(20000.0));
    }

    #[test]
    fn test_level_extraction_rejects_text() {
        let err = calculate_level_from_var("ta_abc").unwrap_err();
        match err {
            MetricsError::InvalidLevel { segment, .. } => assert_eq!(segment, "abc"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base_variable() {
        assert_eq!(base_variable("ta_850"), "ta");
        assert_eq!(base_variable("ts"), "ts");
    }
}
