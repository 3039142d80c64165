//! In-memory gridded fields.

use chrono::NaiveDate;

use crate::time::{monthly_bounds, TimeBounds};
use crate::{BoundingBox, PmpError, PmpResult, TimeWindow};

/// Tolerance used when comparing coordinate axes.
const AXIS_TOLERANCE: f64 = 1e-6;

/// A gridded field on a rectilinear lat/lon grid.
///
/// Values are stored time-major then row-major: index
/// `(t * nlat + j) * nlon + i`. Missing values are `NaN`. A field with an
/// empty time axis is time-invariant and holds a single slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub units: Option<String>,
    /// Vertical level in Pa, if the field was read at one.
    pub level: Option<f64>,
    pub times: Vec<NaiveDate>,
    pub time_bounds: Option<Vec<TimeBounds>>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub data: Vec<f32>,
}

impl Field {
    /// Create a time-varying field, checking the data length against the axes.
    pub fn new(
        name: impl Into<String>,
        times: Vec<NaiveDate>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        data: Vec<f32>,
    ) -> PmpResult<Self> {
        let name = name.into();
        let expected = times.len().max(1) * lats.len() * lons.len();
        if data.len() != expected {
            return Err(PmpError::shape_mismatch(name, expected, data.len()));
        }
        Ok(Self {
            name,
            units: None,
            level: None,
            times,
            time_bounds: None,
            lats,
            lons,
            data,
        })
    }

    /// Create a time-invariant field (e.g. a land fraction).
    pub fn fixed(
        name: impl Into<String>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        data: Vec<f32>,
    ) -> PmpResult<Self> {
        Self::new(name, Vec::new(), lats, lons, data)
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    /// Number of time slices (1 for time-invariant fields).
    pub fn nt(&self) -> usize {
        self.times.len().max(1)
    }

    pub fn nlat(&self) -> usize {
        self.lats.len()
    }

    pub fn nlon(&self) -> usize {
        self.lons.len()
    }

    /// Number of values in one time slice.
    pub fn slice_len(&self) -> usize {
        self.nlat() * self.nlon()
    }

    pub fn is_time_varying(&self) -> bool {
        !self.times.is_empty()
    }

    /// Values of time slice `t`.
    pub fn slice(&self, t: usize) -> &[f32] {
        let n = self.slice_len();
        &self.data[t * n..(t + 1) * n]
    }

    pub fn slice_mut(&mut self, t: usize) -> &mut [f32] {
        let n = self.slice_len();
        &mut self.data[t * n..(t + 1) * n]
    }

    pub fn get(&self, t: usize, j: usize, i: usize) -> Option<f32> {
        if t >= self.nt() || j >= self.nlat() || i >= self.nlon() {
            return None;
        }
        self.data
            .get((t * self.nlat() + j) * self.nlon() + i)
            .copied()
    }

    /// Whether two fields share the same horizontal grid.
    pub fn same_grid(&self, other: &Field) -> bool {
        axes_match(&self.lats, &other.lats) && axes_match(&self.lons, &other.lons)
    }

    /// Restrict the field to a lat/lon box.
    ///
    /// Longitudes are shifted into the box's convention and returned in
    /// ascending order, so a 270..400 domain on a 0..360 grid yields a
    /// contiguous axis running past 360.
    pub fn subset(&self, domain: &BoundingBox) -> PmpResult<Field> {
        let lat_idx: Vec<usize> = (0..self.nlat())
            .filter(|&j| domain.contains_lat(self.lats[j]))
            .collect();

        let mut lon_idx: Vec<(f64, usize)> = (0..self.nlon())
            .filter_map(|i| domain.wrap_lon(self.lons[i]).map(|lon| (lon, i)))
            .collect();
        lon_idx.sort_by(|a, b| a.0.total_cmp(&b.0));

        if lat_idx.is_empty() || lon_idx.is_empty() {
            return Err(PmpError::EmptySelection(format!(
                "'{}' has no points inside {:?}",
                self.name, domain
            )));
        }

        let mut data = Vec::with_capacity(self.nt() * lat_idx.len() * lon_idx.len());
        for t in 0..self.nt() {
            let slice = self.slice(t);
            for &j in &lat_idx {
                for &(_, i) in &lon_idx {
                    data.push(slice[j * self.nlon() + i]);
                }
            }
        }

        Ok(Field {
            name: self.name.clone(),
            units: self.units.clone(),
            level: self.level,
            times: self.times.clone(),
            time_bounds: self.time_bounds.clone(),
            lats: lat_idx.iter().map(|&j| self.lats[j]).collect(),
            lons: lon_idx.iter().map(|&(lon, _)| lon).collect(),
            data,
        })
    }

    /// Keep only the time steps inside `window`.
    pub fn select_times(&self, window: &TimeWindow) -> PmpResult<Field> {
        if !self.is_time_varying() {
            return Ok(self.clone());
        }

        let keep: Vec<usize> = (0..self.times.len())
            .filter(|&t| window.contains(&self.times[t]))
            .collect();
        if keep.is_empty() {
            return Err(PmpError::EmptySelection(format!(
                "'{}' has no time steps between {} and {}",
                self.name, window.start, window.end
            )));
        }

        let mut data = Vec::with_capacity(keep.len() * self.slice_len());
        for &t in &keep {
            data.extend_from_slice(self.slice(t));
        }

        Ok(Field {
            name: self.name.clone(),
            units: self.units.clone(),
            level: self.level,
            times: keep.iter().map(|&t| self.times[t]).collect(),
            time_bounds: self
                .time_bounds
                .as_ref()
                .map(|b| keep.iter().map(|&t| b[t]).collect()),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            data,
        })
    }

    /// Attach monthly bounds derived from the time axis.
    pub fn set_time_bounds_monthly(&mut self) -> PmpResult<()> {
        self.time_bounds = Some(monthly_bounds(&self.times)?);
        Ok(())
    }

    /// Mask (set to NaN) every cell where `mask` is true, in every time slice.
    pub fn mask_where(&mut self, mask: &[bool]) -> PmpResult<()> {
        if mask.len() != self.slice_len() {
            return Err(PmpError::shape_mismatch(
                format!("{} mask", self.name),
                self.slice_len(),
                mask.len(),
            ));
        }
        for t in 0..self.nt() {
            for (value, &masked) in self.slice_mut(t).iter_mut().zip(mask) {
                if masked {
                    *value = f32::NAN;
                }
            }
        }
        Ok(())
    }

    /// Multiply every value by a constant.
    pub fn scale(&mut self, factor: f32) {
        for value in &mut self.data {
            *value *= factor;
        }
    }

    /// Multiply each time slice element-wise by `factors`.
    pub fn scale_by(&mut self, factors: &[f32]) -> PmpResult<()> {
        if factors.len() != self.slice_len() {
            return Err(PmpError::shape_mismatch(
                format!("{} weights", self.name),
                self.slice_len(),
                factors.len(),
            ));
        }
        for t in 0..self.nt() {
            for (value, factor) in self.slice_mut(t).iter_mut().zip(factors) {
                *value *= factor;
            }
        }
        Ok(())
    }

    /// Cosine-of-latitude weight for every cell of one slice.
    pub fn area_weights(&self) -> Vec<f64> {
        let mut weights = Vec::with_capacity(self.slice_len());
        for &lat in &self.lats {
            let w = lat.to_radians().cos().max(0.0);
            weights.extend(std::iter::repeat(w).take(self.nlon()));
        }
        weights
    }

    /// Number of non-missing values.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

fn axes_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() < AXIS_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 15).unwrap()
    }

    fn sample() -> Field {
        // 2 times, 2 lats, 3 lons
        Field::new(
            "ts",
            vec![date(2000, 1), date(2000, 2)],
            vec![-10.0, 10.0],
            vec![0.0, 120.0, 240.0],
            (0..12).map(|v| v as f32).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_shape_checked() {
        let result = Field::fixed("sftlf", vec![0.0], vec![0.0, 1.0], vec![1.0]);
        assert!(matches!(result, Err(PmpError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_get_indexing() {
        let field = sample();
        assert_eq!(field.get(0, 0, 0), Some(0.0));
        assert_eq!(field.get(0, 1, 2), Some(5.0));
        assert_eq!(field.get(1, 0, 1), Some(7.0));
        assert_eq!(field.get(2, 0, 0), None);
    }

    #[test]
    fn test_subset_wraps_longitude() {
        let field = sample();
        let domain = BoundingBox::from_lat_lon((0.0, 20.0), (200.0, 400.0));
        let sub = field.subset(&domain).unwrap();
        assert_eq!(sub.lats, vec![10.0]);
        assert_eq!(sub.lons, vec![240.0, 360.0]);
        assert_eq!(sub.slice(0), &[5.0, 3.0]);
        assert_eq!(sub.slice(1), &[11.0, 9.0]);
    }

    #[test]
    fn test_subset_empty_is_error() {
        let field = sample();
        let domain = BoundingBox::from_lat_lon((50.0, 60.0), (0.0, 360.0));
        assert!(matches!(
            field.subset(&domain),
            Err(PmpError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_mask_where_all_slices() {
        let mut field = sample();
        field
            .mask_where(&[true, false, false, false, false, true])
            .unwrap();
        assert!(field.get(0, 0, 0).unwrap().is_nan());
        assert!(field.get(1, 0, 0).unwrap().is_nan());
        assert!(field.get(1, 1, 2).unwrap().is_nan());
        assert_eq!(field.valid_count(), 8);
    }

    #[test]
    fn test_select_times() {
        let field = sample();
        let window = TimeWindow::new(
            NaiveDate::from_ymd_opt(2000, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2000, 12, 31).unwrap(),
        );
        let selected = field.select_times(&window).unwrap();
        assert_eq!(selected.times.len(), 1);
        assert_eq!(selected.slice(0)[0], 6.0);
    }

    #[test]
    fn test_area_weights_follow_latitude() {
        let field = Field::fixed("w", vec![0.0, 60.0], vec![0.0], vec![1.0, 1.0]).unwrap();
        let weights = field.area_weights();
        assert!((weights[0] - 1.0).abs() < 1e-12);
        assert!((weights[1] - 0.5).abs() < 1e-9);
    }
}
