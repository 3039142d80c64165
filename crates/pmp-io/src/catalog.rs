//! Observation catalog: variable → observation key → alias or record.
//!
//! The catalog JSON looks like:
//!
//! ```json
//! {
//!   "ts": {
//!     "default": "HadISST",
//!     "HadISST": {"CMIP_CMOR_TABLE": "Omon", "filename": "sst.nc", "RefName": "HadISST"}
//!   }
//! }
//! ```
//!
//! String values are aliases pointing at another key of the same variable;
//! object values are dataset records. Values are classified once, when the
//! catalog is parsed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DatasetError, Result};

/// The key selecting the canonical observation of a variable.
pub const DEFAULT_SELECTION: &str = "default";

/// A dataset record in the catalog.
///
/// Fields are optional at parse time so that one malformed record does not
/// make the whole catalog unreadable; lookups that need a missing field fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsRecord {
    #[serde(rename = "CMIP_CMOR_TABLE", default)]
    pub table: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "RefName", default)]
    pub ref_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ObsRecord {
    pub fn new(table: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            filename: Some(filename.into()),
            ref_name: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_ref_name(mut self, ref_name: impl Into<String>) -> Self {
        self.ref_name = Some(ref_name.into());
        self
    }
}

/// A catalog value, classified at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogValue {
    Alias(String),
    Record(ObsRecord),
    /// Anything else (numbers, lists, ...); never resolvable.
    Invalid(serde_json::Value),
}

/// A record found through the catalog, with the name it is filed under.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedObs<'a> {
    pub reference: &'a str,
    pub record: &'a ObsRecord,
}

impl<'a> ResolvedObs<'a> {
    /// The record's source table.
    pub fn table(&self, variable: &str) -> Result<&'a str> {
        self.record.table.as_deref().ok_or_else(|| {
            DatasetError::malformed_entry(variable, self.reference, "missing CMIP_CMOR_TABLE")
        })
    }

    /// The record's file name.
    pub fn filename(&self, variable: &str) -> Result<&'a str> {
        self.record
            .filename
            .as_deref()
            .ok_or_else(|| DatasetError::malformed_entry(variable, self.reference, "missing filename"))
    }
}

/// The observation catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObsCatalog {
    variables: BTreeMap<String, BTreeMap<String, CatalogValue>>,
}

impl ObsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_json(&contents)?;
        debug!(path = ?path, variables = catalog.variables.len(), "Loaded observation catalog");
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, variable: &str, key: &str, value: CatalogValue) {
        self.variables
            .entry(variable.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn with_alias(mut self, variable: &str, key: &str, target: &str) -> Self {
        self.insert(variable, key, CatalogValue::Alias(target.to_string()));
        self
    }

    pub fn with_record(mut self, variable: &str, key: &str, record: ObsRecord) -> Self {
        self.insert(variable, key, CatalogValue::Record(record));
        self
    }

    /// All entries of a variable.
    pub fn entries(&self, variable: &str) -> Option<&BTreeMap<String, CatalogValue>> {
        self.variables.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Resolve `selection` for `variable` to a record.
    ///
    /// A record filed directly under the selection is returned with the
    /// selection as its reference name. An alias is followed exactly one hop;
    /// its target must be a record.
    pub fn resolve(&self, variable: &str, selection: &str) -> Result<ResolvedObs<'_>> {
        let entries = self
            .variables
            .get(variable)
            .ok_or_else(|| DatasetError::unknown_observation(variable, selection))?;

        let (key, value) = entries
            .get_key_value(selection)
            .ok_or_else(|| DatasetError::unknown_observation(variable, selection))?;

        match value {
            CatalogValue::Record(record) => Ok(ResolvedObs {
                reference: key,
                record,
            }),
            CatalogValue::Alias(target) => {
                let (target_key, target_value) = entries
                    .get_key_value(target.as_str())
                    .ok_or_else(|| DatasetError::unknown_observation(variable, target.as_str()))?;
                match target_value {
                    CatalogValue::Record(record) => Ok(ResolvedObs {
                        reference: target_key,
                        record,
                    }),
                    CatalogValue::Alias(next) => Err(DatasetError::AliasChain {
                        variable: variable.to_string(),
                        alias: selection.to_string(),
                        target: next.clone(),
                    }),
                    CatalogValue::Invalid(v) => Err(DatasetError::malformed_entry(
                        variable,
                        target.as_str(),
                        format!("unexpected value {}", v),
                    )),
                }
            }
            CatalogValue::Invalid(v) => Err(DatasetError::malformed_entry(
                variable,
                selection,
                format!("unexpected value {}", v),
            )),
        }
    }

    /// Source table of the variable's default observation.
    pub fn default_table(&self, variable: &str) -> Result<&str> {
        self.resolve(variable, DEFAULT_SELECTION)?.table(variable)
    }

    /// Expand a requested observation list.
    ///
    /// If any entry is `all` (case-insensitive), every alias key of the
    /// variable is returned instead, sorted by key. Otherwise the request
    /// is returned unchanged.
    pub fn observation_list(&self, requested: &[String], variable: &str) -> Vec<String> {
        if !requested.iter().any(|o| o.eq_ignore_ascii_case("all")) {
            return requested.to_vec();
        }

        self.variables
            .get(variable)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, v)| matches!(v, CatalogValue::Alias(_)))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
