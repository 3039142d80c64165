//! Mode extraction and model-versus-observation comparison.

use diagnostics::{cor_xy, departures, leading_eof, rms_xy, EofMode};
use pmp_common::{Field, GridSpec, PmpError, RegridMethod, RegridTool, Regridder};
use tracing::debug;

use crate::error::Result;
use crate::modes::VariabilityMode;
use crate::results::ModeStatistics;

// ============================================================================
// Preprocessing
// ============================================================================

/// Adjust units, attach monthly bounds and cut the mode's domain.
pub fn prepare(field: &Field, mode: &VariabilityMode) -> Result<Field> {
    let mut out = field.clone();
    let factor = mode.unit_adjustment();
    if factor != 1.0 {
        out.scale(factor);
    }
    out.set_time_bounds_monthly()?;
    Ok(out.subset(&mode.domain)?)
}

/// Ocean weight `(100 - sftlf) / 100` of every cell.
pub fn ocean_weights(sftlf: &Field) -> Vec<f32> {
    sftlf.slice(0).iter().map(|&lf| (100.0 - lf) / 100.0).collect()
}

// ============================================================================
// Modes
// ============================================================================

/// Leading EOF of an observed field.
pub fn obs_mode(field: &Field, mode: &VariabilityMode) -> Result<EofMode> {
    let anomalies = departures(&prepare(field, mode)?)?;
    let eof = leading_eof(&anomalies)?;
    debug!(mode = %mode.name, frac = eof.frac, "Observed mode");
    Ok(eof)
}

/// Leading EOF of a model field.
///
/// With a land fraction, anomalies are weighted by ocean fraction before
/// the decomposition and the pattern is divided by the same weight
/// afterwards; cells with zero weight end up missing.
pub fn model_mode(field: &Field, sftlf: Option<&Field>, mode: &VariabilityMode) -> Result<EofMode> {
    let Some(sftlf) = sftlf else {
        return obs_mode(field, mode);
    };
    if !field.same_grid(sftlf) {
        return Err(PmpError::grid_mismatch(format!(
            "'{}' and its land fraction are on different grids",
            field.name
        ))
        .into());
    }

    let weights = ocean_weights(sftlf);
    let mut weighted = field.clone();
    weighted.scale_by(&weights)?;

    let anomalies = departures(&prepare(&weighted, mode)?)?;
    let mut eof = leading_eof(&anomalies)?;

    let weight_field = Field::fixed("ocean_weight", field.lats.clone(), field.lons.clone(), weights)?
        .subset(&mode.domain)?;
    for (value, &w) in eof.pattern.data.iter_mut().zip(&weight_field.data) {
        *value = if w == 0.0 { f32::NAN } else { *value / w };
    }

    debug!(mode = %mode.name, frac = eof.frac, "Model mode with land fraction weighting");
    Ok(eof)
}

// ============================================================================
// Comparison
// ============================================================================

/// Regrid the model pattern onto the observed pattern's grid and compare.
pub fn compare(
    obs: &EofMode,
    model: &EofMode,
    regridder: &dyn Regridder,
    tool: RegridTool,
    method: RegridMethod,
) -> Result<ModeStatistics> {
    let grid = GridSpec::from_axes(&obs.pattern.lats, &obs.pattern.lons)?;
    let pattern = if model.pattern.same_grid(&obs.pattern) {
        model.pattern.clone()
    } else {
        regridder.regrid(&model.pattern, &grid, tool, method)?
    };

    Ok(ModeStatistics {
        cor: cor_xy(&obs.pattern, &pattern)?,
        frac: model.frac,
        rms: rms_xy(&obs.pattern, &pattern)?,
    })
}
