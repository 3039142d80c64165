//! Interpolation-based regridding between rectilinear lat/lon grids.

use pmp_common::{Field, GridSpec, PmpError, PmpResult, RegridMethod, RegridTool, Regridder};
use tracing::debug;

use crate::interpolation::{
    bilinear_interpolate, cubic_interpolate, fractional_index, fractional_lon_index, is_periodic,
    nearest_interpolate, GridView,
};

/// Regrid engine backed by the interpolation kernels.
///
/// Both tools share this engine. `Conservative` averages the source cells
/// that fall inside each destination cell, weighted by cos(latitude), and
/// falls back to bilinear where a destination cell contains no source
/// centre (destination finer than source).
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpolationRegridder;

impl InterpolationRegridder {
    pub fn new() -> Self {
        Self
    }
}

impl Regridder for InterpolationRegridder {
    fn regrid(
        &self,
        field: &Field,
        target: &GridSpec,
        tool: RegridTool,
        method: RegridMethod,
    ) -> PmpResult<Field> {
        target.validate()?;
        if field.nlat() == 0 || field.nlon() == 0 {
            return Err(PmpError::invalid_grid(format!("'{}' has an empty grid", field.name)));
        }

        // Work on ascending latitudes.
        let (src_lats, src) = ascending(field);
        let dst_lats = target.lats();
        let dst_lons = target.lons();
        let periodic = is_periodic(&field.lons);

        let width = field.nlon();
        let height = src_lats.len();

        let mut data = Vec::with_capacity(field.nt() * target.len());
        for t in 0..field.nt() {
            let slice = &src[t * width * height..(t + 1) * width * height];
            let view = GridView::new(slice, width, height, periodic);

            match method {
                RegridMethod::Conservative => {
                    conservative_slice(
                        &view, &src_lats, &field.lons, target, &dst_lats, &dst_lons, &mut data,
                    );
                }
                _ => {
                    for &lat in &dst_lats {
                        let y = fractional_index(&src_lats, lat);
                        for &lon in &dst_lons {
                            let x = fractional_lon_index(&field.lons, lon, periodic);
                            let value = match (x, y) {
                                (Some(x), Some(y)) => sample(&view, method, x, y),
                                _ => f32::NAN,
                            };
                            data.push(value);
                        }
                    }
                }
            }
        }

        debug!(
            variable = %field.name,
            tool = %tool,
            method = %method,
            from = ?(field.nlat(), field.nlon()),
            to = ?(target.ny, target.nx),
            "Regridded field"
        );

        let mut out = Field::new(field.name.clone(), field.times.clone(), dst_lats, dst_lons, data)?;
        out.units = field.units.clone();
        out.level = field.level;
        out.time_bounds = field.time_bounds.clone();
        Ok(out)
    }
}

fn sample(view: &GridView<'_>, method: RegridMethod, x: f64, y: f64) -> f32 {
    match method {
        RegridMethod::Nearest => nearest_interpolate(view, x, y),
        RegridMethod::Cubic => cubic_interpolate(view, x, y),
        RegridMethod::Linear | RegridMethod::Conservative => bilinear_interpolate(view, x, y),
    }
}

/// Source data with rows reordered so latitudes ascend.
fn ascending(field: &Field) -> (Vec<f64>, std::borrow::Cow<'_, [f32]>) {
    let n = field.nlat();
    if n < 2 || field.lats[0] <= field.lats[n - 1] {
        return (field.lats.clone(), std::borrow::Cow::Borrowed(&field.data));
    }

    let nlon = field.nlon();
    let mut data = Vec::with_capacity(field.data.len());
    for t in 0..field.nt() {
        let slice = field.slice(t);
        for j in (0..n).rev() {
            data.extend_from_slice(&slice[j * nlon..(j + 1) * nlon]);
        }
    }
    (
        field.lats.iter().rev().copied().collect(),
        std::borrow::Cow::Owned(data),
    )
}

fn conservative_slice(
    view: &GridView<'_>,
    src_lats: &[f64],
    src_lons: &[f64],
    target: &GridSpec,
    dst_lats: &[f64],
    dst_lons: &[f64],
    out: &mut Vec<f32>,
) {
    let half_y = target.dy.abs() / 2.0;
    let half_x = target.dx.abs() / 2.0;

    for &lat in dst_lats {
        let rows: Vec<usize> = (0..src_lats.len())
            .filter(|&j| src_lats[j] >= lat - half_y && src_lats[j] < lat + half_y)
            .collect();
        for &lon in dst_lons {
            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for &j in &rows {
                let w = src_lats[j].to_radians().cos().max(0.0);
                for (i, &src_lon) in src_lons.iter().enumerate() {
                    let d = (src_lon - lon + 180.0).rem_euclid(360.0) - 180.0;
                    if d >= -half_x && d < half_x {
                        let v = view.data[j * view.width + i];
                        if !v.is_nan() {
                            sum += f64::from(v) * w;
                            weight += w;
                        }
                    }
                }
            }

            let value = if weight > 0.0 {
                (sum / weight) as f32
            } else {
                let y = fractional_index(src_lats, lat);
                let x = fractional_lon_index(src_lons, lon, view.periodic_x);
                match (x, y) {
                    (Some(x), Some(y)) => bilinear_interpolate(view, x, y),
                    _ => f32::NAN,
                }
            };
            out.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(lats: Vec<f64>, lons: Vec<f64>) -> Field {
        let data = lats
            .iter()
            .flat_map(|&lat| lons.iter().map(move |&lon| (lat + lon) as f32))
            .collect();
        Field::fixed("ts", lats, lons, data).unwrap()
    }

    #[test]
    fn test_identity_grid() {
        let grid = GridSpec::uniform(-10.0, 5, 5.0, 0.0, 4, 5.0);
        let field = ramp(grid.lats(), grid.lons());
        let out = InterpolationRegridder
            .regrid(&field, &grid, RegridTool::Regrid2, RegridMethod::Linear)
            .unwrap();
        assert_eq!(out.data, field.data);
    }

    #[test]
    fn test_bilinear_midpoints() {
        let field = ramp(vec![0.0, 10.0], vec![0.0, 10.0]);
        let target = GridSpec::uniform(5.0, 1, 1.0, 5.0, 1, 1.0);
        let out = InterpolationRegridder
            .regrid(&field, &target, RegridTool::Regrid2, RegridMethod::Linear)
            .unwrap();
        assert!((out.data[0] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_outside_source_is_missing() {
        let field = ramp(vec![0.0, 10.0], vec![0.0, 10.0]);
        let target = GridSpec::uniform(20.0, 1, 1.0, 5.0, 1, 1.0);
        let out = InterpolationRegridder
            .regrid(&field, &target, RegridTool::Esmf, RegridMethod::Nearest)
            .unwrap();
        assert!(out.data[0].is_nan());
    }

    #[test]
    fn test_descending_source_lats() {
        let field = Field::fixed("ts", vec![10.0, 0.0], vec![0.0, 10.0], vec![1.0, 1.0, 3.0, 3.0])
            .unwrap();
        let target = GridSpec::uniform(5.0, 1, 1.0, 0.0, 1, 1.0);
        let out = InterpolationRegridder
            .regrid(&field, &target, RegridTool::Regrid2, RegridMethod::Linear)
            .unwrap();
        assert!((out.data[0] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_conservative_averages_block() {
        // 4x4 source at 1 degree, 2x2 target at 2 degrees.
        let src = GridSpec::uniform(0.5, 4, 1.0, 0.5, 4, 1.0);
        let data: Vec<f32> = (0..16).map(|i| if i % 4 < 2 { 1.0 } else { 3.0 }).collect();
        let field = Field::fixed("sftlf", src.lats(), src.lons(), data).unwrap();
        let target = GridSpec::uniform(1.0, 2, 2.0, 1.0, 2, 2.0);
        let out = InterpolationRegridder
            .regrid(&field, &target, RegridTool::Regrid2, RegridMethod::Conservative)
            .unwrap();
        assert!((out.data[0] - 1.0).abs() < 1e-5);
        assert!((out.data[1] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_time_axis_preserved() {
        let field = test_utils::generators::monthly_field("ts", 1950, 3, &[0.0, 10.0], &[0.0, 10.0], |t, _, _| t as f32);
        let target = GridSpec::uniform(5.0, 1, 1.0, 5.0, 1, 1.0);
        let out = InterpolationRegridder
            .regrid(&field, &target, RegridTool::Regrid2, RegridMethod::Linear)
            .unwrap();
        assert_eq!(out.times, field.times);
        assert_eq!(out.data, vec![0.0, 1.0, 2.0]);
    }
}
