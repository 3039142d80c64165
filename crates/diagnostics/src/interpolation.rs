//! Interpolation kernels on fractional grid indices.
//!
//! Positions are given in index space: `x` along longitude (columns), `y`
//! along latitude (rows). When the grid is periodic in longitude, columns
//! wrap around instead of clamping at the edges.

/// A read-only view of one 2D slice.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    pub data: &'a [f32],
    pub width: usize,
    pub height: usize,
    pub periodic_x: bool,
}

impl<'a> GridView<'a> {
    pub fn new(data: &'a [f32], width: usize, height: usize, periodic_x: bool) -> Self {
        Self {
            data,
            width,
            height,
            periodic_x,
        }
    }

    /// Value at an integer position, wrapping or clamping columns and
    /// clamping rows.
    fn at(&self, col: i64, row: i64) -> f32 {
        let w = self.width as i64;
        let col = if self.periodic_x {
            col.rem_euclid(w)
        } else {
            col.clamp(0, w - 1)
        };
        let row = row.clamp(0, self.height as i64 - 1);
        self.data[row as usize * self.width + col as usize]
    }

    fn in_bounds(&self, x: f64, y: f64) -> bool {
        let max_x = if self.periodic_x {
            self.width as f64
        } else {
            (self.width - 1) as f64
        };
        self.width > 0
            && self.height > 0
            && x >= 0.0
            && y >= 0.0
            && x <= max_x
            && y <= (self.height - 1) as f64
    }
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point.
pub fn nearest_interpolate(view: &GridView<'_>, x: f64, y: f64) -> f32 {
    if !view.in_bounds(x, y) {
        return f32::NAN;
    }
    view.at(x.round() as i64, y.round() as i64)
}

/// Bilinear interpolation between the four surrounding points.
///
/// Returns NaN when any of them is missing.
pub fn bilinear_interpolate(view: &GridView<'_>, x: f64, y: f64) -> f32 {
    if !view.in_bounds(x, y) {
        return f32::NAN;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = view.at(x0, y0);
    let v10 = view.at(x0 + 1, y0);
    let v01 = view.at(x0, y0 + 1);
    let v11 = view.at(x0 + 1, y0 + 1);

    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let bottom = v00 * (1.0 - xf) + v10 * xf;
    let top = v01 * (1.0 - xf) + v11 * xf;
    bottom * (1.0 - yf) + top * yf
}

/// Bicubic interpolation over the 4x4 neighbourhood.
///
/// Falls back to bilinear when any neighbour is missing.
pub fn cubic_interpolate(view: &GridView<'_>, x: f64, y: f64) -> f32 {
    if !view.in_bounds(x, y) {
        return f32::NAN;
    }

    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let xf = (x - xi as f64) as f32;
    let yf = (y - yi as f64) as f32;

    let mut rows = [0.0f32; 4];
    for (j, row) in rows.iter_mut().enumerate() {
        let py = yi + j as i64 - 1;
        let mut p = [0.0f32; 4];
        for (i, v) in p.iter_mut().enumerate() {
            *v = view.at(xi + i as i64 - 1, py);
            if v.is_nan() {
                return bilinear_interpolate(view, x, y);
            }
        }
        *row = cubic_1d(p[0], p[1], p[2], p[3], xf);
    }

    cubic_1d(rows[0], rows[1], rows[2], rows[3], yf)
}

/// 1D Catmull-Rom spline.
fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

/// Fractional index of `value` on an ascending axis, or `None` outside it.
pub fn fractional_index(axis: &[f64], value: f64) -> Option<f64> {
    let n = axis.len();
    if n == 0 || value < axis[0] || value > axis[n - 1] {
        return None;
    }
    if n == 1 {
        return Some(0.0);
    }

    // First index whose coordinate exceeds value.
    let upper = axis.partition_point(|&a| a <= value).min(n - 1);
    let lower = upper - 1;
    let span = axis[upper] - axis[lower];
    if span <= 0.0 {
        return Some(lower as f64);
    }
    Some(lower as f64 + (value - axis[lower]) / span)
}

/// Fractional longitude index on an ascending axis.
///
/// On a periodic axis the value is first shifted into
/// `[axis[0], axis[0] + 360)`; positions past the last column fall between
/// the last and the first column.
pub fn fractional_lon_index(axis: &[f64], value: f64, periodic: bool) -> Option<f64> {
    let n = axis.len();
    if n == 0 {
        return None;
    }
    if !periodic {
        return fractional_index(axis, value)
            .or_else(|| fractional_index(axis, value + 360.0))
            .or_else(|| fractional_index(axis, value - 360.0));
    }

    let lon = axis[0] + (value - axis[0]).rem_euclid(360.0);
    if lon <= axis[n - 1] {
        return fractional_index(axis, lon);
    }
    let gap = axis[0] + 360.0 - axis[n - 1];
    Some((n - 1) as f64 + (lon - axis[n - 1]) / gap)
}

/// Whether an ascending longitude axis covers the whole globe.
pub fn is_periodic(lons: &[f64]) -> bool {
    let n = lons.len();
    if n < 2 {
        return false;
    }
    let step = (lons[n - 1] - lons[0]) / (n - 1) as f64;
    ((lons[n - 1] - lons[0]) + step - 360.0).abs() < step * 0.5
}
