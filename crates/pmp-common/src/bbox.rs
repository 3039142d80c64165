//! Latitude/longitude bounding boxes.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// Longitudes may use either the -180..180 or the 0..360 convention, and
/// `max_x` may exceed 360 for domains that wrap past the prime meridian
/// (e.g. 270..400 for the North Atlantic).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a bounding box from latitude and longitude ranges.
    pub fn from_lat_lon(lat: (f64, f64), lon: (f64, f64)) -> Self {
        Self::new(lon.0, lat.0, lon.1, lat.1)
    }

    /// Check whether a latitude falls inside the box (inclusive).
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.min_y && lat <= self.max_y
    }

    /// Map a longitude into the box, shifting it by multiples of 360.
    ///
    /// Returns the shifted longitude when some shift lands inside
    /// `[min_x, max_x]`, `None` otherwise.
    pub fn wrap_lon(&self, lon: f64) -> Option<f64> {
        let mut shifted = lon;
        while shifted > self.min_x {
            shifted -= 360.0;
        }
        while shifted < self.min_x {
            shifted += 360.0;
        }
        (shifted <= self.max_x).then_some(shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lat_lon() {
        let bbox = BoundingBox::from_lat_lon((20.0, 70.0), (110.0, 260.0));
        assert_eq!(bbox, BoundingBox::new(110.0, 20.0, 260.0, 70.0));
        assert!(bbox.contains_lat(20.0));
        assert!(!bbox.contains_lat(75.0));
    }

    #[test]
    fn test_wrap_lon() {
        let pacific = BoundingBox::from_lat_lon((20.0, 70.0), (110.0, 260.0));
        assert_eq!(pacific.wrap_lon(-150.0), Some(210.0));
        assert_eq!(pacific.wrap_lon(120.0), Some(120.0));
        assert_eq!(pacific.wrap_lon(0.0), None);

        let atlantic = BoundingBox::from_lat_lon((20.0, 80.0), (270.0, 400.0));
        assert_eq!(atlantic.wrap_lon(10.0), Some(370.0));
        assert_eq!(atlantic.wrap_lon(300.0), Some(300.0));
        assert_eq!(atlantic.wrap_lon(100.0), None);
    }
}
