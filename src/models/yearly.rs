use serde::{Deserialize, Serialize};

/// Yearly aggregate for one station, read from the materialized stats table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyStat {
    pub station_id: String,
    pub year: i32,
    pub avg_max_temp_c: Option<f64>,
    pub avg_min_temp_c: Option<f64>,
    pub total_precip_cm: Option<f64>,
}
