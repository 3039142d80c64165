//! Common test fixtures for climate diagnostics tests.

/// Observation catalog with one ocean variable and no land-fraction entry.
pub const HADISST_CATALOG: &str = r#"{
    "ts": {
        "default": "HadISST",
        "HadISST": {"CMIP_CMOR_TABLE": "Omon", "filename": "sst.nc"}
    }
}"#;

/// Observation catalog covering surface temperature, sea level pressure,
/// an upper-air variable and land fraction.
pub const FULL_CATALOG: &str = r#"{
    "ts": {
        "default": "HadISST",
        "alternate1": "ERSST",
        "HadISST": {"CMIP_CMOR_TABLE": "Omon", "filename": "sst.nc", "RefName": "HadISST"},
        "ERSST": {"CMIP_CMOR_TABLE": "Amon", "filename": "ersst.nc", "RefName": "ERSST"}
    },
    "psl": {
        "default": "ERA",
        "ERA": {"CMIP_CMOR_TABLE": "Amon", "filename": "psl_era.nc", "RefName": "ERA"}
    },
    "ta": {
        "default": "ERA",
        "ERA": {"CMIP_CMOR_TABLE": "Amon", "filename": "ta_era.nc", "RefName": "ERA"}
    },
    "sftlf": {
        "HadISST": {"CMIP_CMOR_TABLE": "fx", "filename": "sftlf_hadisst.nc"},
        "ERA": {"CMIP_CMOR_TABLE": "fx", "filename": "sftlf_era.nc"}
    }
}"#;

/// Model file naming used by the fixtures.
pub const MODEL_TEMPLATE: &str =
    "%(variable)_%(table)_%(model_version)_historical_%(realization)_%(period).%(ext)";

/// Land fraction file naming used by the fixtures.
pub const SFTLF_TEMPLATE: &str = "sftlf_%(table)_%(model_version)_%(realization).%(ext)";

/// Model versions used by the fixtures.
pub const MODEL_VERSIONS: [&str; 3] = ["ACCESS1-0", "CanESM2", "GFDL-CM3"];

/// Common lat/lon boxes as `((lat0, lat1), (lon0, lon1))`.
pub mod domains {
    /// North Pacific, 0..360 longitudes.
    pub const NORTH_PACIFIC: ((f64, f64), (f64, f64)) = ((20.0, 70.0), (110.0, 260.0));

    /// North Atlantic, longitudes running past 360.
    pub const NORTH_ATLANTIC: ((f64, f64), (f64, f64)) = ((20.0, 80.0), (270.0, 400.0));
}
