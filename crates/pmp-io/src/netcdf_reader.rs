//! NetCDF field reader.
//!
//! Reads CF-style files with `(time, [level], lat, lon)` or `(lat, lon)`
//! variables. Fill values become `NaN`, latitudes are returned ascending and
//! time values are decoded from their `<unit> since <date>` attribute in the
//! axis' CF `calendar`.
//!
//! System requirements: libhdf5-dev libnetcdf-dev

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use pmp_common::Field;
use tracing::debug;

use crate::error::{DatasetError, Result};
use crate::reader::{apply_request, FieldReader, ReadRequest};

const LAT_NAMES: &[&str] = &["lat", "latitude", "y"];
const LON_NAMES: &[&str] = &["lon", "longitude", "x"];
const TIME_NAMES: &[&str] = &["time", "t"];
const LEVEL_NAMES: &[&str] = &["plev", "lev", "level"];

/// Tolerance when matching a requested level (Pa).
const LEVEL_TOLERANCE: f64 = 1e-3;

/// Reads fields from NetCDF files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetCdfReader;

impl NetCdfReader {
    pub fn new() -> Self {
        Self
    }
}

impl FieldReader for NetCdfReader {
    fn read(&self, path: &Path, request: &ReadRequest<'_>) -> Result<Field> {
        if !path.exists() {
            return Err(DatasetError::DatasetNotFound(path.to_path_buf()));
        }

        let file = netcdf::open(path)
            .map_err(|e| DatasetError::read(format!("Failed to open {}: {}", path.display(), e)))?;

        let var = file
            .variable(request.variable)
            .ok_or_else(|| DatasetError::VariableNotFound {
                path: path.to_path_buf(),
                variable: request.variable.to_string(),
            })?;

        let dims: Vec<(String, usize)> = var
            .dimensions()
            .iter()
            .map(|d| (d.name(), d.len()))
            .collect();

        let lat_pos = find_dim(&dims, LAT_NAMES)
            .ok_or_else(|| DatasetError::read(format!("'{}' has no latitude dimension", request.variable)))?;
        let lon_pos = find_dim(&dims, LON_NAMES)
            .ok_or_else(|| DatasetError::read(format!("'{}' has no longitude dimension", request.variable)))?;
        let time_pos = find_dim(&dims, TIME_NAMES);
        let level_pos = find_dim(&dims, LEVEL_NAMES);

        let lats = read_axis(&file, &dims[lat_pos].0)?;
        let lons = read_axis(&file, &dims[lon_pos].0)?;
        let times = match time_pos {
            Some(pos) => read_times(&file, &dims[pos].0)?,
            None => Vec::new(),
        };

        let raw: Vec<f32> = var
            .get_values(..)
            .map_err(|e| DatasetError::read(format!("Failed to read '{}': {}", request.variable, e)))?;

        let fill = get_f32_attr(&var, "_FillValue");
        let missing = get_f32_attr(&var, "missing_value");
        let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);

        let nlat = lats.len();
        let nlon = lons.len();
        let nt = times.len().max(1);
        let slice_len = nlat * nlon;

        // Pick the level plane, if any.
        let (level, level_index, nlev) = match level_pos {
            Some(pos) => {
                let levels = read_axis(&file, &dims[pos].0)?;
                let index = match request.level {
                    Some(wanted) => levels
                        .iter()
                        .position(|&l| (l - wanted).abs() < LEVEL_TOLERANCE)
                        .ok_or_else(|| DatasetError::LevelNotFound {
                            variable: request.variable.to_string(),
                            level: wanted,
                        })?,
                    None => 0,
                };
                (levels.get(index).copied(), index, levels.len())
            }
            None => {
                if let Some(wanted) = request.level {
                    return Err(DatasetError::LevelNotFound {
                        variable: request.variable.to_string(),
                        level: wanted,
                    });
                }
                (None, 0, 1)
            }
        };

        let expected = nt * nlev * slice_len;
        if raw.len() != expected {
            return Err(DatasetError::read(format!(
                "'{}' has {} values, expected {}",
                request.variable,
                raw.len(),
                expected
            )));
        }

        let mut data = Vec::with_capacity(nt * slice_len);
        for t in 0..nt {
            let start = (t * nlev + level_index) * slice_len;
            data.extend(raw[start..start + slice_len].iter().map(|&v| {
                if Some(v) == fill || Some(v) == missing || v.is_nan() {
                    f32::NAN
                } else {
                    v * scale_factor + add_offset
                }
            }));
        }

        let (lats, data) = ascending_lats(lats, data, nlon);

        let mut field = Field::new(request.variable, times, lats, lons, data)?;
        if let Some(units) = get_string_attr(&var, "units") {
            field = field.with_units(units);
        }
        if let Some(level) = level {
            field = field.with_level(level);
        }

        debug!(
            path = ?path,
            variable = %request.variable,
            nt = nt,
            nlat = nlat,
            nlon = nlon,
            "Read NetCDF field"
        );
        apply_request(field, request)
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn find_dim(dims: &[(String, usize)], names: &[&str]) -> Option<usize> {
    dims.iter()
        .position(|(name, _)| names.iter().any(|n| name.eq_ignore_ascii_case(n)))
}

fn read_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| DatasetError::read(format!("Missing coordinate variable '{}'", name)))?;
    var.get_values(..)
        .map_err(|e| DatasetError::read(format!("Failed to read '{}': {}", name, e)))
}

fn read_times(file: &netcdf::File, name: &str) -> Result<Vec<NaiveDate>> {
    let values = read_axis(file, name)?;
    let var = file
        .variable(name)
        .ok_or_else(|| DatasetError::read(format!("Missing coordinate variable '{}'", name)))?;
    let units = get_string_attr(&var, "units")
        .ok_or_else(|| DatasetError::read(format!("Time axis '{}' has no units", name)))?;
    let calendar = get_string_attr(&var, "calendar").unwrap_or_else(|| "standard".to_string());
    decode_times(&values, &units, &calendar)
}

/// CF calendars with a fixed year length, plus the real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Calendar {
    Standard,
    NoLeap,
    AllLeap,
    Day360,
}

const NOLEAP_MONTH_DAYS: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const ALLLEAP_MONTH_DAYS: [i64; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

impl Calendar {
    pub(crate) fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" | "julian" | "" => Ok(Self::Standard),
            "noleap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            other => Err(DatasetError::read(format!("Unsupported calendar '{}'", other))),
        }
    }

    fn month_days(self, month: usize) -> i64 {
        match self {
            Self::AllLeap => ALLLEAP_MONTH_DAYS[month],
            Self::Day360 => 30,
            _ => NOLEAP_MONTH_DAYS[month],
        }
    }

    fn year_days(self) -> i64 {
        (0..12).map(|m| self.month_days(m)).sum()
    }

    /// Shift a date by whole days in a fixed-length-year calendar.
    ///
    /// Days that do not exist in the real calendar (30 February) are
    /// clamped to the month's last day.
    fn shift_days(self, origin: NaiveDate, days: i64) -> Option<NaiveDate> {
        let year_days = self.year_days();
        let month0 = origin.month0() as usize;
        let day_of_year = (0..month0).map(|m| self.month_days(m)).sum::<i64>() + i64::from(origin.day0());
        let total = i64::from(origin.year())
            .checked_mul(year_days)?
            .checked_add(day_of_year)?
            .checked_add(days)?;

        let year = i32::try_from(total.div_euclid(year_days)).ok()?;
        let mut rest = total.rem_euclid(year_days);
        let mut month = 0;
        while rest >= self.month_days(month) {
            rest -= self.month_days(month);
            month += 1;
        }
        let first = NaiveDate::from_ymd_opt(year, month as u32 + 1, 1)?;
        let last_day = (28..=31)
            .rev()
            .find(|&d| NaiveDate::from_ymd_opt(year, month as u32 + 1, d).is_some())?;
        first.with_day((rest as u32 + 1).min(last_day))
    }
}

/// Decode `<unit> since <date>` offsets in `calendar` into dates.
pub(crate) fn decode_times(values: &[f64], units: &str, calendar: &str) -> Result<Vec<NaiveDate>> {
    let calendar = Calendar::parse(calendar)?;
    let (unit, origin) = units
        .split_once(" since ")
        .ok_or_else(|| DatasetError::read(format!("Unsupported time units '{}'", units)))?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 86_400.0,
        "hours" | "hour" | "h" => 3_600.0,
        "minutes" | "minute" => 60.0,
        "seconds" | "second" | "s" => 1.0,
        other => {
            return Err(DatasetError::read(format!("Unsupported time unit '{}'", other)));
        }
    };

    let origin = parse_origin(origin.trim())
        .ok_or_else(|| DatasetError::read(format!("Unparseable time origin in '{}'", units)))?;

    values
        .iter()
        .map(|&v| {
            let seconds = v * seconds_per_unit;
            let date = if seconds.is_finite() && seconds.abs() < i64::MAX as f64 {
                match calendar {
                    Calendar::Standard => Duration::try_seconds(seconds.round() as i64)
                        .and_then(|offset| origin.checked_add_signed(offset))
                        .map(|t| t.date()),
                    other => other.shift_days(origin.date(), (seconds / 86_400.0).floor() as i64),
                }
            } else {
                None
            };
            date.ok_or_else(|| DatasetError::read(format!("Time value {} out of range for '{}'", v, units)))
        })
        .collect()
}

fn parse_origin(s: &str) -> Option<NaiveDateTime> {
    let date_part = s.split_whitespace().next()?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y-%-m-%-d"))
        .ok()?;
    date.and_hms_opt(0, 0, 0)
}

/// Flip rows so latitudes increase.
fn ascending_lats(lats: Vec<f64>, data: Vec<f32>, nlon: usize) -> (Vec<f64>, Vec<f32>) {
    if lats.len() < 2 || lats[0] < lats[lats.len() - 1] {
        return (lats, data);
    }

    let nlat = lats.len();
    let slice_len = nlat * nlon;
    let mut flipped = Vec::with_capacity(data.len());
    for slice in data.chunks(slice_len.max(1)) {
        for j in (0..nlat).rev() {
            flipped.extend_from_slice(&slice[j * nlon..(j + 1) * nlon]);
        }
    }
    (lats.into_iter().rev().collect(), flipped)
}

fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_days_since() {
        let dates = decode_times(&[0.0, 31.0, 59.0], "days since 1900-01-01 00:00:00", "standard").unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(1900, 2, 1).unwrap());
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(1900, 3, 1).unwrap());
    }

    #[test]
    fn test_decode_hours_since() {
        let dates = decode_times(&[48.0], "hours since 2000-1-1", "gregorian").unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2000, 1, 3).unwrap());
    }

    #[test]
    fn test_decode_rejects_months() {
        assert!(decode_times(&[1.0], "months since 1900-01-01", "standard").is_err());
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_decode_noleap() {
        let units = "days since 1850-01-01";
        let dates = decode_times(&[56924.5, 59.0, 365.0], units, "noleap").unwrap();
        assert_eq!(dates[0], ymd(2005, 12, 16));
        assert_eq!(dates[1], ymd(1850, 3, 1));
        assert_eq!(dates[2], ymd(1851, 1, 1));
        assert_eq!(decode_times(&[56924.5], units, "365_day").unwrap(), vec![ymd(2005, 12, 16)]);
        // The real calendar drifts by the skipped leap days.
        assert_eq!(decode_times(&[56924.5], units, "standard").unwrap(), vec![ymd(2005, 11, 8)]);
    }

    #[test]
    fn test_decode_all_leap() {
        let dates = decode_times(&[59.0, 366.0], "days since 1901-01-01", "366_day").unwrap();
        // 29 February does not exist in 1901 and is clamped.
        assert_eq!(dates[0], ymd(1901, 2, 28));
        assert_eq!(dates[1], ymd(1902, 1, 1));
    }

    #[test]
    fn test_decode_360_day() {
        let dates = decode_times(&[15.0, 45.0, 59.0, 360.0 * 55.0 + 345.0], "days since 1950-01-01", "360_day").unwrap();
        assert_eq!(dates[0], ymd(1950, 1, 16));
        assert_eq!(dates[1], ymd(1950, 2, 16));
        assert_eq!(dates[2], ymd(1950, 2, 28));
        assert_eq!(dates[3], ymd(2005, 12, 16));
    }

    #[test]
    fn test_decode_rejects_unknown_calendar() {
        assert!(decode_times(&[0.0], "days since 1850-01-01", "lunar").is_err());
    }

    #[test]
    fn test_decode_fill_value_is_an_error() {
        for calendar in ["standard", "noleap", "360_day"] {
            let err = decode_times(&[15.0, 9.96921e36], "days since 1850-01-01", calendar).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{calendar}: {err}");
        }
        assert!(decode_times(&[f64::NAN], "days since 1850-01-01", "standard").is_err());
    }

    #[test]
    fn test_ascending_lats_flips_rows() {
        let (lats, data) = ascending_lats(vec![10.0, 0.0], vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(lats, vec![0.0, 10.0]);
        assert_eq!(data, vec![3.0, 4.0, 1.0, 2.0]);
    }
}
