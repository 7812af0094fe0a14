#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Living-population record types.
//!
//! Rows of the short-term foreign visitor dataset keep the API's field
//! names on the wire and the raw numeric-string values; numbers are parsed
//! where they are used.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hourly time periods in a day.
pub const HOURS_PER_DAY: u8 = 24;

/// One `(tract, date, hour)` observation from the open-data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRecord {
    /// Reference date (`YYYYMMDD`).
    #[serde(rename = "STDR_DE_ID", default)]
    pub date_id: String,
    /// Time period (`00`-`23`).
    #[serde(rename = "TMZON_PD_SE", default)]
    pub time_period: String,
    /// Administrative dong code.
    #[serde(rename = "ADSTRD_CODE_SE", default)]
    pub admin_code: String,
    /// Census tract code.
    #[serde(rename = "OA_CD")]
    pub tract_id: String,
    /// Total living population.
    #[serde(rename = "TOT_LVPOP_CO", default)]
    pub total_population: String,
    /// Short-stay visitors from China.
    #[serde(rename = "CHINA_STAYPOP_CO", default)]
    pub china_stay_population: String,
    /// Short-stay visitors from all other countries.
    #[serde(rename = "OTHER_STAYPOP_CO", default)]
    pub other_stay_population: String,
}

impl PopulationRecord {
    /// Total living population truncated to a whole count.
    ///
    /// The API reports estimates with a fractional part; `None` if the
    /// value is not a finite number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn total_population_count(&self) -> Option<i64> {
        let value: f64 = self.total_population.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(value.trunc() as i64)
    }
}

/// Error returned for an hour outside `0..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid hour {hour}: expected 0-23")]
pub struct InvalidHourError {
    /// The rejected hour.
    pub hour: u8,
}

/// Identifies one hourly snapshot: a date and an hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourKey {
    date: NaiveDate,
    hour: u8,
}

impl HourKey {
    /// Creates a key for `hour` (0-23) on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHourError`] if `hour` is 24 or more.
    pub const fn new(date: NaiveDate, hour: u8) -> Result<Self, InvalidHourError> {
        if hour >= HOURS_PER_DAY {
            return Err(InvalidHourError { hour });
        }
        Ok(Self { date, hour })
    }

    /// Returns all 24 keys of `date`, in hour order.
    #[must_use]
    pub fn day(date: NaiveDate) -> Vec<Self> {
        (0..HOURS_PER_DAY).map(|hour| Self { date, hour }).collect()
    }

    /// The date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// The hour of day.
    #[must_use]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Date as used in the request path (`YYYYMMDD`).
    #[must_use]
    pub fn date_path(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Hour as used in the request path and layer index (`HH`).
    #[must_use]
    pub fn hour_path(&self) -> String {
        format!("{:02}", self.hour)
    }
}

impl fmt::Display for HourKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}h", self.date_path(), self.hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 5).unwrap()
    }

    #[test]
    fn deserializes_api_row() {
        let row = serde_json::json!({
            "STDR_DE_ID": "20250905",
            "TMZON_PD_SE": "14",
            "ADSTRD_CODE_SE": "11200690",
            "OA_CD": "1104065010001",
            "TOT_LVPOP_CO": "120.5531",
            "CHINA_STAYPOP_CO": "12.1",
            "OTHER_STAYPOP_CO": "*"
        });
        let record: PopulationRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.tract_id, "1104065010001");
        assert_eq!(record.total_population_count(), Some(120));
    }

    #[test]
    fn unparsable_population_is_none() {
        let record = PopulationRecord {
            date_id: String::new(),
            time_period: String::new(),
            admin_code: String::new(),
            tract_id: "1104065010001".to_string(),
            total_population: "*".to_string(),
            china_stay_population: String::new(),
            other_stay_population: String::new(),
        };
        assert_eq!(record.total_population_count(), None);
    }

    #[test]
    fn hour_key_paths() {
        let key = HourKey::new(date(), 9).unwrap();
        assert_eq!(key.date_path(), "20250905");
        assert_eq!(key.hour_path(), "09");
        assert_eq!(key.to_string(), "20250905 09h");
    }

    #[test]
    fn rejects_hour_24() {
        assert_eq!(HourKey::new(date(), 24), Err(InvalidHourError { hour: 24 }));
    }

    #[test]
    fn day_is_ordered() {
        let hours: Vec<u8> = HourKey::day(date()).iter().map(HourKey::hour).collect();
        assert_eq!(hours, (0..24).collect::<Vec<_>>());
    }
}
