use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::constants::MISSING_VALUE_SENTINEL;

/// One parsed line of a station file, before a station is attached.
///
/// Measurements are kept in tenths of their unit (°C for temperatures,
/// mm for precipitation). `None` means the source recorded the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub max_temp_tenths: Option<i32>,
    pub min_temp_tenths: Option<i32>,
    pub precip_tenths: Option<i32>,
}

impl Observation {
    pub fn new(
        date: NaiveDate,
        max_temp_tenths: Option<i32>,
        min_temp_tenths: Option<i32>,
        precip_tenths: Option<i32>,
    ) -> Self {
        Self {
            date,
            max_temp_tenths,
            min_temp_tenths,
            precip_tenths,
        }
    }

    /// Map a raw source value to a measurement, treating the sentinel as absent.
    pub fn measurement(raw: i32) -> Option<i32> {
        if raw == MISSING_VALUE_SENTINEL {
            None
        } else {
            Some(raw)
        }
    }

    pub fn has_missing_data(&self) -> bool {
        self.max_temp_tenths.is_none()
            || self.min_temp_tenths.is_none()
            || self.precip_tenths.is_none()
    }
}

/// Borrowed view of everything the merge primitive needs for one row.
#[derive(Debug, Clone, Copy)]
pub struct MergeRow<'a> {
    pub station_id: &'a str,
    pub observation: &'a Observation,
    pub source_file: &'a str,
}

/// A stored row of the daily table, as returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub station_id: String,
    pub date: NaiveDate,
    #[serde(rename = "max_temp_tenths_c")]
    pub max_temp_tenths: Option<i32>,
    #[serde(rename = "min_temp_tenths_c")]
    pub min_temp_tenths: Option<i32>,
    #[serde(rename = "precip_tenths_mm")]
    pub precip_tenths: Option<i32>,
    #[serde(skip_serializing, default)]
    pub source_file: String,
}

impl DailyObservation {
    pub fn max_temp_celsius(&self) -> Option<f64> {
        self.max_temp_tenths.map(|t| f64::from(t) / 10.0)
    }

    pub fn min_temp_celsius(&self) -> Option<f64> {
        self.min_temp_tenths.map(|t| f64::from(t) / 10.0)
    }

    pub fn precip_mm(&self) -> Option<f64> {
        self.precip_tenths.map(|p| f64::from(p) / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_maps_to_absent() {
        assert_eq!(Observation::measurement(-9999), None);
        assert_eq!(Observation::measurement(-9998), Some(-9998));
        assert_eq!(Observation::measurement(0), Some(0));
        assert_eq!(Observation::measurement(-50), Some(-50));
    }

    #[test]
    fn test_daily_observation_json_shape() {
        let row = DailyObservation {
            station_id: "ST001".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            max_temp_tenths: None,
            min_temp_tenths: Some(-60),
            precip_tenths: Some(10),
            source_file: "/data/ST001.txt".to_string(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["station_id"], "ST001");
        assert_eq!(json["date"], "2023-01-02");
        assert!(json["max_temp_tenths_c"].is_null());
        assert_eq!(json["min_temp_tenths_c"], -60);
        assert_eq!(json["precip_tenths_mm"], 10);
        assert!(json.get("source_file").is_none());

        assert_eq!(row.min_temp_celsius(), Some(-6.0));
        assert_eq!(row.precip_mm(), Some(1.0));
        assert_eq!(row.max_temp_celsius(), None);
    }
}
