//! Run parameters.
//!
//! Loaded from YAML. Paths go through shell expansion (`~`, `$VAR`), and a
//! few values can be overridden from the environment:
//!
//! - `PMP_OBS_DATA_PATH`
//! - `PMP_MOD_DATA_PATH`
//! - `PMP_TARGET_GRID` (preset name)

use std::fs;
use std::path::{Path, PathBuf};

use pmp_common::{RegridMethod, RegridTool, TargetGrid, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetricsError, Result};

/// Parameters of one metrics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Root of the observation tree.
    pub obs_data_path: PathBuf,
    /// Root of the model output tree.
    pub mod_data_path: PathBuf,
    /// Model file naming template.
    pub filename_template: String,
    /// Land fraction file naming template; defaults to `filename_template`.
    #[serde(default)]
    pub sftlf_filename_template: Option<String>,

    #[serde(default)]
    pub model_versions: Vec<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default = "default_realization")]
    pub realization: String,

    #[serde(default = "default_mip")]
    pub mip: String,
    #[serde(default = "default_exp")]
    pub exp: String,

    #[serde(default)]
    pub target_grid: TargetGrid,
    #[serde(default)]
    pub regrid_tool: RegridTool,
    #[serde(default)]
    pub regrid_method: RegridMethod,
    #[serde(default = "default_regrid_tool_ocn")]
    pub regrid_tool_ocn: RegridTool,
    #[serde(default)]
    pub regrid_method_ocn: RegridMethod,

    /// Reference land fraction used to build the target-grid mask.
    #[serde(default)]
    pub land_sea_mask_path: Option<PathBuf>,

    /// Variability mode to analyse.
    #[serde(default = "default_mode")]
    pub variability_mode: String,
    /// Observation selections; `all` expands to every alias in the catalog.
    #[serde(default = "default_reference")]
    pub reference_data_set: Vec<String>,
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    /// Weight model anomalies by ocean fraction before the EOF.
    #[serde(default = "default_true")]
    pub land_fraction_weighting: bool,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_realization() -> String {
    "r1i1p1".to_string()
}

fn default_mip() -> String {
    "cmip5".to_string()
}

fn default_exp() -> String {
    "historical".to_string()
}

fn default_regrid_tool_ocn() -> RegridTool {
    RegridTool::Esmf
}

fn default_mode() -> String {
    "pdo".to_string()
}

fn default_reference() -> Vec<String> {
    vec![pmp_io::DEFAULT_SELECTION.to_string()]
}

fn default_start_year() -> i32 {
    1900
}

fn default_end_year() -> i32 {
    2005
}

fn default_true() -> bool {
    true
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Parameter {
    /// Minimal parameters; everything else takes its default.
    pub fn new(
        obs_data_path: impl Into<PathBuf>,
        mod_data_path: impl Into<PathBuf>,
        filename_template: impl Into<String>,
    ) -> Self {
        Self {
            obs_data_path: obs_data_path.into(),
            mod_data_path: mod_data_path.into(),
            filename_template: filename_template.into(),
            sftlf_filename_template: None,
            model_versions: Vec::new(),
            period: None,
            case_id: None,
            realization: default_realization(),
            mip: default_mip(),
            exp: default_exp(),
            target_grid: TargetGrid::default(),
            regrid_tool: RegridTool::default(),
            regrid_method: RegridMethod::default(),
            regrid_tool_ocn: default_regrid_tool_ocn(),
            regrid_method_ocn: RegridMethod::default(),
            land_sea_mask_path: None,
            variability_mode: default_mode(),
            reference_data_set: default_reference(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            land_fraction_weighting: true,
            results_dir: default_results_dir(),
        }
    }

    /// Load, expand, override from the environment and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut parameter = Self::from_yaml(&content)?;
        parameter.apply_env_overrides();
        parameter.expand_paths()?;
        parameter.validate()?;
        debug!(path = ?path, models = parameter.model_versions.len(), "Loaded parameters");
        Ok(parameter)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("PMP_OBS_DATA_PATH") {
            self.obs_data_path = PathBuf::from(val);
        }

        if let Some(val) = lookup("PMP_MOD_DATA_PATH") {
            self.mod_data_path = PathBuf::from(val);
        }

        if let Some(val) = lookup("PMP_TARGET_GRID") {
            self.target_grid = TargetGrid::Preset(val);
        }
    }

    /// Expand `~` and environment variables in every path.
    pub fn expand_paths(&mut self) -> Result<()> {
        self.obs_data_path = expand(&self.obs_data_path)?;
        self.mod_data_path = expand(&self.mod_data_path)?;
        self.results_dir = expand(&self.results_dir)?;
        if let Some(path) = &self.land_sea_mask_path {
            self.land_sea_mask_path = Some(expand(path)?);
        }
        Ok(())
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.filename_template.trim().is_empty() {
            return Err(MetricsError::config("filename_template must not be empty"));
        }
        if self.end_year < self.start_year {
            return Err(MetricsError::config(format!(
                "end_year {} precedes start_year {}",
                self.end_year, self.start_year
            )));
        }
        if self.reference_data_set.is_empty() {
            return Err(MetricsError::config("reference_data_set must not be empty"));
        }
        self.target_grid.resolve()?;
        Ok(())
    }

    /// Naming template of land fraction files.
    pub fn sftlf_template(&self) -> &str {
        self.sftlf_filename_template
            .as_deref()
            .unwrap_or(&self.filename_template)
    }

    /// Analysis window covering the configured years.
    pub fn time_window(&self) -> Result<TimeWindow> {
        Ok(TimeWindow::from_years(self.start_year, self.end_year)?)
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| MetricsError::config(format!("Cannot expand '{}': {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const YAML: &str = r#"
obs_data_path: /clim_obs/obs
mod_data_path: /work/cmip5
filename_template: "cmip5.%(model_version).historical.%(realization).mo.%(table).%(variable).%(ext)"
model_versions: [ACCESS1-0, CanESM2]
period: "185001-200512"
regrid_method: bilinear
regrid_method_ocn: conservative
target_grid: "2.5x2.5"
"#;

    #[test]
    fn test_from_yaml_defaults() {
        let p = Parameter::from_yaml(YAML).unwrap();
        assert_eq!(p.model_versions, vec!["ACCESS1-0", "CanESM2"]);
        assert_eq!(p.regrid_method, RegridMethod::Linear);
        assert_eq!(p.regrid_method_ocn, RegridMethod::Conservative);
        assert_eq!(p.regrid_tool, RegridTool::Regrid2);
        assert_eq!(p.regrid_tool_ocn, RegridTool::Esmf);
        assert_eq!(p.realization, "r1i1p1");
        assert_eq!(p.reference_data_set, vec!["default"]);
        assert_eq!((p.start_year, p.end_year), (1900, 2005));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_sftlf_template_fallback() {
        let mut p = Parameter::from_yaml(YAML).unwrap();
        assert_eq!(p.sftlf_template(), p.filename_template);
        p.sftlf_filename_template = Some("sftlf_%(model_version).nc".to_string());
        assert_eq!(p.sftlf_template(), "sftlf_%(model_version).nc");
    }

    #[test]
    fn test_overrides() {
        let mut p = Parameter::from_yaml(YAML).unwrap();
        let env: HashMap<&str, &str> = [
            ("PMP_OBS_DATA_PATH", "/scratch/obs"),
            ("PMP_TARGET_GRID", "1x1"),
        ]
        .into_iter()
        .collect();
        p.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(p.obs_data_path, PathBuf::from("/scratch/obs"));
        assert_eq!(p.mod_data_path, PathBuf::from("/work/cmip5"));
        assert_eq!(p.target_grid, TargetGrid::Preset("1x1".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_years() {
        let mut p = Parameter::from_yaml(YAML).unwrap();
        p.start_year = 2000;
        p.end_year = 1990;
        assert!(matches!(p.validate(), Err(MetricsError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_grid() {
        let mut p = Parameter::from_yaml(YAML).unwrap();
        p.target_grid = TargetGrid::Preset("7x7".to_string());
        assert!(matches!(p.validate(), Err(MetricsError::Field(_))));
    }

    #[test]
    fn test_sample_config_parses() {
        let mut p = Parameter::from_yaml(include_str!("../../../config/variability_modes.yaml")).unwrap();
        p.apply_overrides(|_| None);
        assert_eq!(p.model_versions.len(), 3);
        assert!(p.land_sea_mask_path.is_some());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, YAML).unwrap();
        let p = Parameter::load(&path).unwrap();
        assert_eq!(p.period.as_deref(), Some("185001-200512"));
    }
}
