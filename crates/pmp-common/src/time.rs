//! Time axis handling for monthly climate data.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{PmpError, PmpResult};

/// Bounds of a single time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeBounds {
    /// Monthly bounds enclosing `date`: first day of its month to first day
    /// of the next month.
    pub fn monthly(date: NaiveDate) -> PmpResult<Self> {
        let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .ok_or_else(|| PmpError::InvalidTime(date.to_string()))?;
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        let end = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PmpError::InvalidTime(date.to_string()))?;
        Ok(Self { start, end })
    }

    /// Calendar month (0 = January) this step belongs to.
    pub fn month_index(&self) -> usize {
        self.start.month0() as usize
    }
}

/// Compute monthly bounds for every time step of an axis.
pub fn monthly_bounds(times: &[NaiveDate]) -> PmpResult<Vec<TimeBounds>> {
    times.iter().map(|t| TimeBounds::monthly(*t)).collect()
}

/// An inclusive date window used to restrict reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window from January 1st of `start_year` to December 31st of `end_year`.
    pub fn from_years(start_year: i32, end_year: i32) -> PmpResult<Self> {
        if end_year < start_year {
            return Err(PmpError::InvalidTime(format!(
                "end year {} precedes start year {}",
                end_year, start_year
            )));
        }
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
            .ok_or_else(|| PmpError::InvalidTime(start_year.to_string()))?;
        let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
            .ok_or_else(|| PmpError::InvalidTime(end_year.to_string()))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        *date >= self.start && *date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_bounds_mid_month() {
        let bounds = TimeBounds::monthly(date(1990, 2, 15)).unwrap();
        assert_eq!(bounds.start, date(1990, 2, 1));
        assert_eq!(bounds.end, date(1990, 3, 1));
        assert_eq!(bounds.month_index(), 1);
    }

    #[test]
    fn test_monthly_bounds_december_rolls_year() {
        let bounds = TimeBounds::monthly(date(2005, 12, 16)).unwrap();
        assert_eq!(bounds.end, date(2006, 1, 1));
        assert_eq!(bounds.month_index(), 11);
    }

    #[test]
    fn test_window_from_years() {
        let window = TimeWindow::from_years(1900, 2005).unwrap();
        assert!(window.contains(&date(1900, 1, 1)));
        assert!(window.contains(&date(2005, 12, 31)));
        assert!(!window.contains(&date(2006, 1, 1)));
        assert!(TimeWindow::from_years(2005, 1900).is_err());
    }
}
