//! Leading empirical orthogonal function of a time-varying field.
//!
//! Anomalies are centred in time and weighted by sqrt(cos(latitude)) before
//! a singular value decomposition of the (time x space) matrix. Cells with a
//! missing value at any time step are left out and stay missing in the
//! pattern.

use nalgebra::DMatrix;
use pmp_common::Field;
use tracing::debug;

use crate::error::{DiagnosticsError, Result};

/// First variance mode of a field.
#[derive(Debug, Clone)]
pub struct EofMode {
    /// Spatial pattern as covariance with the unit-variance PC, in the
    /// field's units.
    pub pattern: Field,
    /// Principal component time series, unit variance.
    pub pc: Vec<f64>,
    /// Fraction of total variance explained, in [0, 1].
    pub frac: f64,
}

/// Compute the leading EOF.
///
/// The sign is fixed so that the pattern value with the largest magnitude
/// is positive.
pub fn leading_eof(field: &Field) -> Result<EofMode> {
    if !field.is_time_varying() {
        return Err(DiagnosticsError::NoTimeAxis(field.name.clone()));
    }
    let nt = field.nt();
    if nt < 2 {
        return Err(DiagnosticsError::insufficient(format!(
            "'{}' needs at least 2 time steps, has {}",
            field.name, nt
        )));
    }

    let n = field.slice_len();
    let columns: Vec<usize> = (0..n)
        .filter(|&k| (0..nt).all(|t| !field.slice(t)[k].is_nan()))
        .collect();
    if columns.is_empty() {
        return Err(DiagnosticsError::insufficient(format!(
            "'{}' has no cell valid at every time step",
            field.name
        )));
    }

    let area = field.area_weights();
    let sqrt_w: Vec<f64> = columns.iter().map(|&k| area[k].sqrt()).collect();

    // Centred anomalies, unweighted.
    let mut anomalies = DMatrix::<f64>::zeros(nt, columns.len());
    for (c, &k) in columns.iter().enumerate() {
        let mean = (0..nt).map(|t| f64::from(field.slice(t)[k])).sum::<f64>() / nt as f64;
        for t in 0..nt {
            anomalies[(t, c)] = f64::from(field.slice(t)[k]) - mean;
        }
    }

    let mut weighted = anomalies.clone();
    for (c, w) in sqrt_w.iter().enumerate() {
        weighted.column_mut(c).scale_mut(*w);
    }

    let svd = weighted.svd(true, false);
    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| DiagnosticsError::Decomposition("left singular vectors missing".to_string()))?;
    let singular = &svd.singular_values;

    let total: f64 = singular.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return Err(DiagnosticsError::insufficient(format!(
            "'{}' has no variance",
            field.name
        )));
    }
    let lead = singular
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .ok_or_else(|| DiagnosticsError::Decomposition("no singular values".to_string()))?;
    let s0 = singular[lead];
    let frac = s0 * s0 / total;

    // PC scaled to unit variance (ddof = 1).
    let scale = ((nt - 1) as f64).sqrt();
    let mut pc: Vec<f64> = u.column(lead).iter().map(|v| v * scale).collect();

    let mut values: Vec<f64> = (0..columns.len())
        .map(|c| {
            (0..nt).map(|t| anomalies[(t, c)] * pc[t]).sum::<f64>() / (nt - 1) as f64
        })
        .collect();

    let flip = values
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .is_some_and(|v| v < 0.0);
    if flip {
        values.iter_mut().for_each(|v| *v = -*v);
        pc.iter_mut().for_each(|v| *v = -*v);
    }

    let mut data = vec![f32::NAN; n];
    for (c, &k) in columns.iter().enumerate() {
        data[k] = values[c] as f32;
    }
    let mut pattern = Field::fixed(field.name.clone(), field.lats.clone(), field.lons.clone(), data)?;
    pattern.units = field.units.clone();
    pattern.level = field.level;

    debug!(
        variable = %field.name,
        nt = nt,
        cells = columns.len(),
        frac = frac,
        "Computed leading EOF"
    );

    Ok(EofMode { pattern, pc, frac })
}
