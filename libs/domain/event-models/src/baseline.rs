use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Per-user rolling aggregate maintained by the baseline maintainer (C8).
/// Gated on `data_points >= 10` before it is used to raise deviation alerts.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean_heart_rate: f64,
    pub mean_hrv: f64,
    pub mean_spo2: f64,
    pub mean_temp: f64,
    pub mean_activity: f64,
    pub mean_respiratory_rate: f64,
    pub std_heart_rate: f64,
    pub std_hrv: f64,
    pub std_spo2: f64,
    pub std_temp: f64,
    pub data_points: u64,
    pub updated_at: DateTime<Utc>,
}

impl Baseline {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            mean_heart_rate: 0.0,
            mean_hrv: 0.0,
            mean_spo2: 0.0,
            mean_temp: 0.0,
            mean_activity: 0.0,
            mean_respiratory_rate: 0.0,
            std_heart_rate: 0.0,
            std_hrv: 0.0,
            std_spo2: 0.0,
            std_temp: 0.0,
            data_points: 0,
            updated_at: now,
        }
    }

    pub fn is_mature(&self) -> bool {
        self.data_points >= 10
    }
}
