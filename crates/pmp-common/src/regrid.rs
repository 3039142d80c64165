//! Regridding contract shared by dataset readers and the regrid engine.

use serde::{Deserialize, Serialize};

use crate::{Field, GridSpec, PmpResult};

/// Regridding toolkit requested by configuration.
///
/// Recorded on datasets so results can be traced back to the tool that
/// produced them; the engine may treat several tools alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegridTool {
    #[default]
    Regrid2,
    Esmf,
}

impl std::fmt::Display for RegridTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regrid2 => write!(f, "regrid2"),
            Self::Esmf => write!(f, "esmf"),
        }
    }
}

/// Interpolation method used when regridding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegridMethod {
    /// Bilinear interpolation.
    #[default]
    #[serde(alias = "bilinear")]
    Linear,
    /// Nearest neighbor (preserves exact values).
    Nearest,
    /// Bicubic interpolation.
    #[serde(alias = "bicubic")]
    Cubic,
    /// Area average of source cells inside each destination cell.
    Conservative,
}

impl RegridMethod {
    /// Parse from string (case-insensitive), defaulting to linear.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "nearest" => Self::Nearest,
            "cubic" | "bicubic" => Self::Cubic,
            "conservative" => Self::Conservative,
            _ => Self::Linear,
        }
    }
}

impl std::fmt::Display for RegridMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Nearest => write!(f, "nearest"),
            Self::Cubic => write!(f, "cubic"),
            Self::Conservative => write!(f, "conservative"),
        }
    }
}

/// A regrid engine: conforms a field to a destination grid.
pub trait Regridder {
    fn regrid(
        &self,
        field: &Field,
        target: &GridSpec,
        tool: RegridTool,
        method: RegridMethod,
    ) -> PmpResult<Field>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!(RegridMethod::from_str("NEAREST"), RegridMethod::Nearest);
        assert_eq!(RegridMethod::from_str("bicubic"), RegridMethod::Cubic);
        assert_eq!(RegridMethod::from_str("whatever"), RegridMethod::Linear);
    }

    #[test]
    fn test_serde_names() {
        let tool: RegridTool = serde_json::from_str("\"esmf\"").unwrap();
        assert_eq!(tool, RegridTool::Esmf);
        let method: RegridMethod = serde_json::from_str("\"bilinear\"").unwrap();
        assert_eq!(method, RegridMethod::Linear);
        assert_eq!(RegridMethod::Conservative.to_string(), "conservative");
    }
}
