//! Synthetic field generators.
//!
//! Values come from a closure of `(t, j, i)` so tests can state exactly what
//! every cell should contain.

use chrono::NaiveDate;
use pmp_common::{Field, GridSpec};

/// Evenly spaced axis.
pub fn axis(start: f64, n: usize, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Mid-month dates for `nmonths` consecutive months starting in January of
/// `start_year`.
pub fn monthly_times(start_year: i32, nmonths: usize) -> Vec<NaiveDate> {
    (0..nmonths)
        .map(|m| {
            let year = start_year + (m / 12) as i32;
            let month = (m % 12) as u32 + 1;
            NaiveDate::from_ymd_opt(year, month, 15).expect("valid mid-month date")
        })
        .collect()
}

/// Monthly field with values `f(t, j, i)`.
pub fn monthly_field(
    name: &str,
    start_year: i32,
    nmonths: usize,
    lats: &[f64],
    lons: &[f64],
    f: impl Fn(usize, usize, usize) -> f32,
) -> Field {
    let mut data = Vec::with_capacity(nmonths * lats.len() * lons.len());
    for t in 0..nmonths {
        for j in 0..lats.len() {
            for i in 0..lons.len() {
                data.push(f(t, j, i));
            }
        }
    }
    Field::new(
        name,
        monthly_times(start_year, nmonths),
        lats.to_vec(),
        lons.to_vec(),
        data,
    )
    .expect("generated field has consistent shape")
}

/// Monthly field on a grid spec.
pub fn monthly_field_on(
    name: &str,
    grid: &GridSpec,
    start_year: i32,
    nmonths: usize,
    f: impl Fn(usize, usize, usize) -> f32,
) -> Field {
    monthly_field(name, start_year, nmonths, &grid.lats(), &grid.lons(), f)
}

/// Time-invariant field with values `f(j, i)`.
pub fn fixed_field(name: &str, lats: &[f64], lons: &[f64], f: impl Fn(usize, usize) -> f32) -> Field {
    let mut data = Vec::with_capacity(lats.len() * lons.len());
    for j in 0..lats.len() {
        for i in 0..lons.len() {
            data.push(f(j, i));
        }
    }
    Field::fixed(name, lats.to_vec(), lons.to_vec(), data).expect("generated field has consistent shape")
}

/// Land fraction (percent) that is land west of `coast_lon` and ocean east
/// of it.
pub fn coastline_sftlf(lats: &[f64], lons: &[f64], coast_lon: f64) -> Field {
    let lons_owned = lons.to_vec();
    fixed_field("sftlf", lats, lons, move |_, i| {
        if lons_owned[i] < coast_lon {
            100.0
        } else {
            0.0
        }
    })
}

/// A single standing oscillation: `amplitude(j, i) * sin(2π t / period)`
/// plus a seasonal cycle that annual-cycle removal takes out.
pub fn standing_mode(
    name: &str,
    lats: &[f64],
    lons: &[f64],
    start_year: i32,
    nmonths: usize,
    amplitude: impl Fn(usize, usize) -> f32,
) -> Field {
    monthly_field(name, start_year, nmonths, lats, lons, |t, j, i| {
        let phase = 2.0 * std::f32::consts::PI * t as f32 / 29.0;
        let seasonal = 5.0 * (2.0 * std::f32::consts::PI * (t % 12) as f32 / 12.0).cos();
        amplitude(j, i) * phase.sin() + seasonal + 290.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_times_roll_over() {
        let times = monthly_times(1999, 14);
        assert_eq!(times[11], NaiveDate::from_ymd_opt(1999, 12, 15).unwrap());
        assert_eq!(times[12], NaiveDate::from_ymd_opt(2000, 1, 15).unwrap());
    }

    #[test]
    fn test_monthly_field_layout() {
        let field = monthly_field("ts", 2000, 2, &[0.0, 1.0], &[0.0, 1.0, 2.0], |t, j, i| {
            (t * 100 + j * 10 + i) as f32
        });
        assert_eq!(field.get(1, 1, 2), Some(112.0));
    }

    #[test]
    fn test_coastline() {
        let sftlf = coastline_sftlf(&[0.0], &[0.0, 10.0, 20.0], 15.0);
        assert_eq!(sftlf.data, vec![100.0, 100.0, 0.0]);
    }
}
