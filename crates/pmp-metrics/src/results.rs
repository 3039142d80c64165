//! Results summary written at the end of a run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::error::Result;
use crate::parameter::Parameter;

/// Key used for the default observation in the results tree.
pub const DEFAULT_REFERENCE_KEY: &str = "defaultReference";

/// Statistics of one model's mode against the observed mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeStatistics {
    /// Spatial correlation of the patterns.
    pub cor: f64,
    /// Variance fraction explained by the model's leading EOF.
    pub frac: f64,
    /// RMS difference of the patterns.
    pub rms: f64,
}

type ModeMap = BTreeMap<String, ModeStatistics>;

/// `RESULTS -> model -> reference -> mode -> statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    #[serde(rename = "RESULTS")]
    pub results: BTreeMap<String, BTreeMap<String, ModeMap>>,
}

impl ResultsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record statistics, replacing any earlier entry for the same key.
    pub fn record(&mut self, model: &str, selection: &str, mode: &str, stats: ModeStatistics) {
        self.results
            .entry(model.to_string())
            .or_default()
            .entry(reference_key(selection).to_string())
            .or_default()
            .insert(mode.to_string(), stats);
    }

    pub fn get(&self, model: &str, selection: &str, mode: &str) -> Option<&ModeStatistics> {
        self.results
            .get(model)?
            .get(reference_key(selection))?
            .get(mode)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Serialize with sorted keys and 4-space indentation.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        info!(path = ?path, models = self.results.len(), "Wrote results");
        Ok(())
    }
}

fn reference_key(selection: &str) -> &str {
    if selection == pmp_io::DEFAULT_SELECTION {
        DEFAULT_REFERENCE_KEY
    } else {
        selection
    }
}

/// Results file name for a run.
pub fn file_name(parameter: &Parameter, frequency: &str, realm: &str) -> String {
    format!(
        "var_mode_{}_eof1_stat_{}_{}_{}_{}_{}_{}-{}.json",
        parameter.variability_mode,
        parameter.mip,
        parameter.exp,
        parameter.realization,
        frequency,
        realm,
        parameter.start_year,
        parameter.end_year
    )
}

/// Results file path under the configured results directory.
pub fn output_path(parameter: &Parameter, frequency: &str, realm: &str) -> PathBuf {
    parameter.results_dir.join(file_name(parameter, frequency, realm))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(cor: f64) -> ModeStatistics {
        ModeStatistics {
            cor,
            frac: 0.4,
            rms: 0.25,
        }
    }

    #[test]
    fn test_default_selection_key() {
        let mut summary = ResultsSummary::new();
        summary.record("CanESM2", "default", "pdo", stats(0.9));
        summary.record("CanESM2", "alternate1", "pdo", stats(0.8));

        assert_eq!(summary.get("CanESM2", "default", "pdo"), Some(&stats(0.9)));
        assert!(summary.results["CanESM2"].contains_key("defaultReference"));
        assert!(summary.results["CanESM2"].contains_key("alternate1"));
    }

    #[test]
    fn test_json_sorted_and_indented() {
        let mut summary = ResultsSummary::new();
        summary.record("GFDL-CM3", "default", "pdo", stats(0.5));
        summary.record("ACCESS1-0", "default", "pdo", stats(0.7));

        let json = summary.to_json().unwrap();
        assert!(json.starts_with("{\n    \"RESULTS\": {\n        \"ACCESS1-0\""));
        assert!(json.find("ACCESS1-0").unwrap() < json.find("GFDL-CM3").unwrap());
        assert!(json.find("\"cor\"").unwrap() < json.find("\"frac\"").unwrap());
        assert!(json.find("\"frac\"").unwrap() < json.find("\"rms\"").unwrap());
    }

    #[test]
    fn test_file_name() {
        let mut p = Parameter::new("/obs", "/mod", "%(variable).nc");
        p.start_year = 1900;
        p.end_year = 2005;
        assert_eq!(
            file_name(&p, "mo", "atm"),
            "var_mode_pdo_eof1_stat_cmip5_historical_r1i1p1_mo_atm_1900-2005.json"
        );
    }

    #[test]
    fn test_write_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");
        let mut summary = ResultsSummary::new();
        summary.record("CanESM2", "default", "nao", stats(0.6));
        summary.write(&path).unwrap();

        let back: ResultsSummary = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, summary);
    }
}
