//! Area-weighted spatial statistics between two fields on the same grid.
//!
//! Only cells valid in both fields contribute. Weights are generated from
//! cos(latitude).

use pmp_common::Field;

use crate::error::{DiagnosticsError, Result};

/// Pairs of valid values with their weights.
fn valid_pairs<'a>(
    a: &'a [f32],
    b: &'a [f32],
    weights: &'a [f64],
) -> impl Iterator<Item = (f64, f64, f64)> + 'a {
    a.iter()
        .zip(b)
        .zip(weights)
        .filter(|((x, y), w)| !x.is_nan() && !y.is_nan() && **w > 0.0)
        .map(|((x, y), w)| (f64::from(*x), f64::from(*y), *w))
}

/// Weighted root-mean-square difference.
pub fn weighted_rms(a: &[f32], b: &[f32], weights: &[f64]) -> Result<f64> {
    check_lengths(a, b, weights)?;
    let (sum, wsum) = valid_pairs(a, b, weights)
        .fold((0.0, 0.0), |(s, ws), (x, y, w)| (s + w * (x - y).powi(2), ws + w));
    if wsum == 0.0 {
        return Err(DiagnosticsError::insufficient("no overlapping valid cells"));
    }
    Ok((sum / wsum).sqrt())
}

/// Weighted, centred Pearson correlation.
pub fn weighted_correlation(a: &[f32], b: &[f32], weights: &[f64]) -> Result<f64> {
    check_lengths(a, b, weights)?;

    let (sx, sy, ws) = valid_pairs(a, b, weights)
        .fold((0.0, 0.0, 0.0), |(sx, sy, ws), (x, y, w)| (sx + w * x, sy + w * y, ws + w));
    if ws == 0.0 {
        return Err(DiagnosticsError::insufficient("no overlapping valid cells"));
    }
    let (mx, my) = (sx / ws, sy / ws);

    let (cov, vx, vy) = valid_pairs(a, b, weights).fold((0.0, 0.0, 0.0), |(c, vx, vy), (x, y, w)| {
        let (dx, dy) = (x - mx, y - my);
        (c + w * dx * dy, vx + w * dx * dx, vy + w * dy * dy)
    });
    if vx == 0.0 || vy == 0.0 {
        return Err(DiagnosticsError::insufficient("constant field has no correlation"));
    }
    Ok(cov / (vx.sqrt() * vy.sqrt()))
}

/// Area-weighted RMS difference of the first time slice of two fields.
pub fn rms_xy(a: &Field, b: &Field) -> Result<f64> {
    check_grids(a, b)?;
    weighted_rms(a.slice(0), b.slice(0), &a.area_weights())
}

/// Area-weighted spatial correlation of the first time slice of two fields.
pub fn cor_xy(a: &Field, b: &Field) -> Result<f64> {
    check_grids(a, b)?;
    weighted_correlation(a.slice(0), b.slice(0), &a.area_weights())
}

fn check_grids(a: &Field, b: &Field) -> Result<()> {
    if !a.same_grid(b) {
        return Err(DiagnosticsError::GridMismatch(format!(
            "'{}' is {}x{}, '{}' is {}x{}",
            a.name,
            a.nlat(),
            a.nlon(),
            b.name,
            b.nlat(),
            b.nlon()
        )));
    }
    Ok(())
}

fn check_lengths(a: &[f32], b: &[f32], weights: &[f64]) -> Result<()> {
    if a.len() != b.len() || a.len() != weights.len() {
        return Err(DiagnosticsError::GridMismatch(format!(
            "lengths differ: {}, {}, {} weights",
            a.len(),
            b.len(),
            weights.len()
        )));
    }
    Ok(())
}
