//! Grid specifications for regridding targets.

use crate::{BoundingBox, PmpError, PmpResult};
use serde::{Deserialize, Serialize};

/// Specification of a regular lat/lon grid.
///
/// Latitudes run south to north starting at `first_y`, longitudes run
/// eastward starting at `first_x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of points in X (longitude) direction
    pub nx: usize,
    /// Number of points in Y (latitude) direction
    pub ny: usize,
    /// Longitude spacing in degrees
    pub dx: f64,
    /// Latitude spacing in degrees
    pub dy: f64,
    /// First grid point longitude
    pub first_x: f64,
    /// First grid point latitude
    pub first_y: f64,
}

impl GridSpec {
    /// Create a new grid specification.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64, first_x: f64, first_y: f64) -> Self {
        Self {
            nx,
            ny,
            dx,
            dy,
            first_x,
            first_y,
        }
    }

    /// Uniform grid in the argument order used by most climate toolkits:
    /// start latitude, latitude count, latitude step, start longitude,
    /// longitude count, longitude step.
    pub fn uniform(
        start_lat: f64,
        nlat: usize,
        dlat: f64,
        start_lon: f64,
        nlon: usize,
        dlon: f64,
    ) -> Self {
        Self::new(nlon, nlat, dlon, dlat, start_lon, start_lat)
    }

    /// Grid spanned by two evenly spaced ascending axes.
    pub fn from_axes(lats: &[f64], lons: &[f64]) -> PmpResult<Self> {
        let (first_y, dy) = axis_step(lats, "latitude")?;
        let (first_x, dx) = axis_step(lons, "longitude")?;
        let grid = Self::new(lons.len(), lats.len(), dx, dy, first_x, first_y);
        grid.validate()?;
        Ok(grid)
    }

    /// Look up a named grid preset.
    pub fn from_preset(name: &str) -> PmpResult<Self> {
        match name {
            "2.5x2.5" => Ok(grids::uniform_2p5()),
            "1x1" => Ok(grids::uniform_1p0()),
            other => Err(PmpError::UnknownGridPreset(other.to_string())),
        }
    }

    /// Latitude axis values.
    pub fn lats(&self) -> Vec<f64> {
        (0..self.ny)
            .map(|j| self.first_y + j as f64 * self.dy)
            .collect()
    }

    /// Longitude axis values.
    pub fn lons(&self) -> Vec<f64> {
        (0..self.nx)
            .map(|i| self.first_x + i as f64 * self.dx)
            .collect()
    }

    /// Calculate the bounding box of this grid.
    pub fn bbox(&self) -> BoundingBox {
        let last_x = self.first_x + (self.nx.saturating_sub(1)) as f64 * self.dx;
        let last_y = self.first_y + (self.ny.saturating_sub(1)) as f64 * self.dy;

        BoundingBox {
            min_x: self.first_x.min(last_x),
            min_y: self.first_y.min(last_y),
            max_x: self.first_x.max(last_x),
            max_y: self.first_y.max(last_y),
        }
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    /// Validate spacing and size.
    pub fn validate(&self) -> PmpResult<()> {
        if self.is_empty() {
            return Err(PmpError::invalid_grid("grid has no points"));
        }
        if self.dx <= 0.0 || self.dy <= 0.0 {
            return Err(PmpError::invalid_grid(format!(
                "grid spacing must be positive, got dx={} dy={}",
                self.dx, self.dy
            )));
        }
        Ok(())
    }
}

/// First value and spacing of an evenly spaced axis.
///
/// A single-point axis gets a spacing of 1.
fn axis_step(axis: &[f64], name: &str) -> PmpResult<(f64, f64)> {
    match axis {
        [] => Err(PmpError::invalid_grid(format!("{} axis is empty", name))),
        [only] => Ok((*only, 1.0)),
        [first, second, ..] => {
            let step = second - first;
            let uneven = axis
                .windows(2)
                .any(|w| ((w[1] - w[0]) - step).abs() > step.abs() * 1e-6);
            if uneven {
                return Err(PmpError::invalid_grid(format!(
                    "{} axis is not evenly spaced",
                    name
                )));
            }
            Ok((*first, step))
        }
    }
}

/// A configured regrid target: either a named preset or an explicit grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetGrid {
    Preset(String),
    Spec(GridSpec),
}

impl TargetGrid {
    /// Resolve to a concrete grid.
    pub fn resolve(&self) -> PmpResult<GridSpec> {
        match self {
            TargetGrid::Preset(name) => GridSpec::from_preset(name),
            TargetGrid::Spec(spec) => {
                spec.validate()?;
                Ok(spec.clone())
            }
        }
    }
}

impl Default for TargetGrid {
    fn default() -> Self {
        TargetGrid::Preset("2.5x2.5".to_string())
    }
}

/// Common target grids.
pub mod grids {
    use super::*;

    /// 2.5° global grid: 72 latitudes from -88.875, 144 longitudes from 0.
    pub fn uniform_2p5() -> GridSpec {
        GridSpec::uniform(-88.875, 72, 2.5, 0.0, 144, 2.5)
    }

    /// 1° global grid centred on half degrees.
    pub fn uniform_1p0() -> GridSpec {
        GridSpec::uniform(-89.5, 180, 1.0, 0.5, 360, 1.0)
    }
}
