//! Annual cycle climatology and departures.

use chrono::Datelike;
use pmp_common::Field;
use tracing::debug;

use crate::error::{DiagnosticsError, Result};

/// Calendar month (0 = January) of every time step.
///
/// Uses the monthly bounds when they are set, the time axis otherwise.
fn month_indices(field: &Field) -> Vec<usize> {
    match &field.time_bounds {
        Some(bounds) if bounds.len() == field.times.len() => {
            bounds.iter().map(|b| b.month_index()).collect()
        }
        _ => field.times.iter().map(|t| t.month0() as usize).collect(),
    }
}

/// Mean of each calendar month at every grid cell.
///
/// Returns 12 slices, January first. Months without any valid value are
/// `NaN`.
pub fn annual_cycle(field: &Field) -> Result<Vec<f32>> {
    if !field.is_time_varying() {
        return Err(DiagnosticsError::NoTimeAxis(field.name.clone()));
    }

    let n = field.slice_len();
    let mut sums = vec![0.0f64; 12 * n];
    let mut counts = vec![0u32; 12 * n];

    for (t, month) in month_indices(field).into_iter().enumerate() {
        let slice = field.slice(t);
        for (k, &v) in slice.iter().enumerate() {
            if !v.is_nan() {
                sums[month * n + k] += f64::from(v);
                counts[month * n + k] += 1;
            }
        }
    }

    Ok(sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { (s / f64::from(c)) as f32 } else { f32::NAN })
        .collect())
}

/// Subtract the annual cycle from every time step.
pub fn departures(field: &Field) -> Result<Field> {
    let cycle = annual_cycle(field)?;
    let n = field.slice_len();

    let mut out = field.clone();
    for (t, month) in month_indices(field).into_iter().enumerate() {
        let clim = &cycle[month * n..(month + 1) * n];
        for (v, &c) in out.slice_mut(t).iter_mut().zip(clim) {
            *v -= c;
        }
    }

    debug!(variable = %field.name, nt = field.nt(), "Removed annual cycle");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(values: &[f32]) -> Field {
        let times = (0..values.len())
            .map(|i| NaiveDate::from_ymd_opt(2000 + (i / 12) as i32, (i % 12) as u32 + 1, 15).unwrap())
            .collect();
        Field::new("ts", times, vec![0.0], vec![0.0], values.to_vec()).unwrap()
    }

    #[test]
    fn test_pure_seasonal_cycle_removed() {
        let year: Vec<f32> = (0..12).map(|m| m as f32).collect();
        let values: Vec<f32> = year.iter().chain(year.iter()).copied().collect();
        let anomalies = departures(&monthly(&values)).unwrap();
        assert!(anomalies.data.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_departures_keep_interannual_signal() {
        let mut values = vec![0.0f32; 24];
        values[0] = 1.0; // January 2000
        values[12] = 3.0; // January 2001
        let anomalies = departures(&monthly(&values)).unwrap();
        assert!((anomalies.data[0] + 1.0).abs() < 1e-6);
        assert!((anomalies.data[12] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_values_skipped() {
        let mut values = vec![2.0f32; 24];
        values[1] = f32::NAN;
        let cycle = annual_cycle(&monthly(&values)).unwrap();
        assert_eq!(cycle[1], 2.0);
        let anomalies = departures(&monthly(&values)).unwrap();
        assert!(anomalies.data[1].is_nan());
    }

    #[test]
    fn test_requires_time_axis() {
        let field = Field::fixed("sftlf", vec![0.0], vec![0.0], vec![1.0]).unwrap();
        assert!(matches!(annual_cycle(&field), Err(DiagnosticsError::NoTimeAxis(_))));
    }
}
