use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::vitals::VitalField;

/// Alert kinds. The three pattern-matched kinds come from the anomaly
/// detector; `Deviation` comes from the baseline maintainer and carries the
/// metric it fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "metric")]
pub enum AlertType {
    #[serde(rename = "TACHYCARDIA_AT_REST")]
    TachycardiaAtRest,
    #[serde(rename = "LOW_SPO2_HYPOXIA")]
    LowSpo2Hypoxia,
    #[serde(rename = "ELEVATED_TEMPERATURE")]
    ElevatedTemperature,
    #[serde(rename = "DEVIATION")]
    Deviation(VitalField),
}

impl AlertType {
    /// Legacy-shaped string identifier, e.g. `"TACHYCARDIA_AT_REST"` or
    /// `"HEART_RATE_DEVIATION"`, for storage and wire compatibility with
    /// clients expecting a flat `alert_type` string.
    pub fn wire_name(self) -> String {
        match self {
            AlertType::TachycardiaAtRest => "TACHYCARDIA_AT_REST".to_string(),
            AlertType::LowSpo2Hypoxia => "LOW_SPO2_HYPOXIA".to_string(),
            AlertType::ElevatedTemperature => "ELEVATED_TEMPERATURE".to_string(),
            AlertType::Deviation(field) => format!("{}_DEVIATION", field.as_str().to_uppercase()),
        }
    }
}

#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn penalty(self) -> f64 {
        match self {
            AlertSeverity::Critical => 25.0,
            AlertSeverity::High => 15.0,
            AlertSeverity::Medium => 8.0,
            AlertSeverity::Low => 3.0,
        }
    }
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    #[serde(rename = "alert_type")]
    pub alert_type_name: String,
    pub user_id: String,
    pub severity: AlertSeverity,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub avg_heart_rate: f64,
    pub event_count: usize,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub enriched_insight: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}
