use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::source::SourceId;

/// One biometric quantity tracked by the ground-truth engine and projected
/// onto sources. Used both as a type-safe key into the sparse field maps and
/// as the unit the anomaly detector and baseline maintainer key off of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    HeartRate,
    Hrv,
    Spo2,
    SkinTempC,
    RespiratoryRate,
    ActivityLevel,
    StepsPerMinute,
    CaloriesPerMinute,
    SleepQuality,
}

impl VitalField {
    pub const ALL: [VitalField; 9] = [
        VitalField::HeartRate,
        VitalField::Hrv,
        VitalField::Spo2,
        VitalField::SkinTempC,
        VitalField::RespiratoryRate,
        VitalField::ActivityLevel,
        VitalField::StepsPerMinute,
        VitalField::CaloriesPerMinute,
        VitalField::SleepQuality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VitalField::HeartRate => "heart_rate",
            VitalField::Hrv => "hrv_ms",
            VitalField::Spo2 => "spo2_percent",
            VitalField::SkinTempC => "skin_temp_c",
            VitalField::RespiratoryRate => "respiratory_rate",
            VitalField::ActivityLevel => "activity_level",
            VitalField::StepsPerMinute => "steps_per_minute",
            VitalField::CaloriesPerMinute => "calories_per_minute",
            VitalField::SleepQuality => "sleep_quality",
        }
    }
}

/// A single-instant, single-user physiological snapshot. Every field is
/// clamped to a physiological range by the engine that produces it.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysiologicalState {
    pub heart_rate: f64,
    pub hrv_ms: f64,
    pub spo2_percent: f64,
    pub skin_temp_c: f64,
    pub respiratory_rate: f64,
    pub activity_level: f64,
    pub steps_per_minute: f64,
    pub calories_per_minute: f64,
    pub sleep_quality: f64,
}

impl PhysiologicalState {
    pub fn get(&self, field: VitalField) -> f64 {
        match field {
            VitalField::HeartRate => self.heart_rate,
            VitalField::Hrv => self.hrv_ms,
            VitalField::Spo2 => self.spo2_percent,
            VitalField::SkinTempC => self.skin_temp_c,
            VitalField::RespiratoryRate => self.respiratory_rate,
            VitalField::ActivityLevel => self.activity_level,
            VitalField::StepsPerMinute => self.steps_per_minute,
            VitalField::CaloriesPerMinute => self.calories_per_minute,
            VitalField::SleepQuality => self.sleep_quality,
        }
    }
}

/// Canonical event as it travels the bus and the hot ring. Fields absent from
/// a source's profile are `None`, never zero — callers must treat a missing
/// reading as "not observed".
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub source: SourceId,
    pub source_name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hrv_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spo2_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skin_temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub respiratory_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub activity_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub steps_per_minute: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub calories_per_minute: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sleep_quality: Option<f64>,
}

impl RawEvent {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn get(&self, field: VitalField) -> Option<f64> {
        match field {
            VitalField::HeartRate => self.heart_rate,
            VitalField::Hrv => self.hrv_ms,
            VitalField::Spo2 => self.spo2_percent,
            VitalField::SkinTempC => self.skin_temp_c,
            VitalField::RespiratoryRate => self.respiratory_rate,
            VitalField::ActivityLevel => self.activity_level,
            VitalField::StepsPerMinute => self.steps_per_minute,
            VitalField::CaloriesPerMinute => self.calories_per_minute,
            VitalField::SleepQuality => self.sleep_quality,
        }
    }

    /// Ensures `source_name` is populated from `source` when a producer omitted it.
    pub fn normalise(mut self) -> Self {
        if self.source_name.trim().is_empty() {
            self.source_name = self.source.display_name().to_string();
        }
        self
    }
}

/// One contributing observation behind a fused metric, newest first.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributingSource {
    pub source: SourceId,
    pub value: f64,
    pub age_ms: i64,
}

/// The speed layer's fusion output for a single metric: the freshest reading
/// across all sources, with attribution for the UI.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedMetric {
    pub metric: VitalField,
    pub value: f64,
    pub contributing_sources: Vec<ContributingSource>,
    pub best_source: SourceId,
    pub best_age_ms: i64,
    pub count: usize,
}
