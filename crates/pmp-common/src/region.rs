//! Region filters applied when reading datasets.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// A region filter.
///
/// `value` is a land-fraction class (0 = ocean, 100 = land); when present,
/// cells whose land fraction differs from it are masked out. `domain`
/// restricts the read to a lat/lon box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub domain: Option<BoundingBox>,
}

impl Region {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: None,
            domain: None,
        }
    }

    /// Ocean-only region (land fraction 0).
    pub fn ocean() -> Self {
        Self::new("ocean").with_value(0.0)
    }

    /// Land-only region (land fraction 100).
    pub fn land() -> Self {
        Self::new("land").with_value(100.0)
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_domain(mut self, domain: BoundingBox) -> Self {
        self.domain = Some(domain);
        self
    }
}
