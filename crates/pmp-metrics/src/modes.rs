//! Variability mode definitions.

use pmp_common::{BoundingBox, Region};
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// A named mode of variability: the variable it is defined on and the
/// domain its leading EOF is computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityMode {
    pub name: String,
    pub variable: String,
    pub domain: BoundingBox,
    /// Sea-surface mode; model fields are weighted by ocean fraction.
    #[serde(default)]
    pub ocean_only: bool,
}

impl VariabilityMode {
    fn new(name: &str, variable: &str, lat: (f64, f64), lon: (f64, f64)) -> Self {
        Self {
            name: name.to_string(),
            variable: variable.to_string(),
            domain: BoundingBox::from_lat_lon(lat, lon),
            ocean_only: false,
        }
    }

    /// Pacific Decadal Oscillation.
    pub fn pdo() -> Self {
        Self {
            ocean_only: true,
            ..Self::new("pdo", "ts", (20.0, 70.0), (110.0, 260.0))
        }
    }

    /// North Atlantic Oscillation.
    pub fn nao() -> Self {
        Self::new("nao", "psl", (20.0, 80.0), (270.0, 400.0))
    }

    /// Southern Annular Mode.
    pub fn sam() -> Self {
        Self::new("sam", "psl", (-90.0, -20.0), (0.0, 360.0))
    }

    pub fn all() -> Vec<Self> {
        vec![Self::pdo(), Self::nao(), Self::sam()]
    }

    /// Look up a mode by name (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| MetricsError::UnknownMode(name.to_string()))
    }

    /// Factor applied to raw values; sea level pressure is analysed in hPa.
    pub fn unit_adjustment(&self) -> f32 {
        if self.variable == "psl" {
            0.01
        } else {
            1.0
        }
    }

    /// Region covering the mode's domain.
    pub fn region(&self) -> Region {
        Region::new(self.name.as_str()).with_domain(self.domain)
    }
}
