//! Static registry of wearable data sources and their per-field noise profile.

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::vitals::VitalField;

#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Apple,
    Google,
    Oura,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::Apple, SourceId::Google, SourceId::Oura];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Apple => "apple",
            SourceId::Google => "google",
            SourceId::Oura => "oura",
        }
    }

    pub fn topic(self) -> &'static str {
        match self {
            SourceId::Apple => "biometrics-apple",
            SourceId::Google => "biometrics-google",
            SourceId::Oura => "biometrics-oura",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SourceId::Apple => "Apple HealthKit",
            SourceId::Google => "Google Fit",
            SourceId::Oura => "Oura Ring",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<SourceId> {
        match s.to_ascii_lowercase().as_str() {
            "apple" => Some(SourceId::Apple),
            "google" => Some(SourceId::Google),
            "oura" => Some(SourceId::Oura),
            _ => None,
        }
    }
}

/// Immutable per-source description: which fields it reports, how often, and
/// with how much observation noise relative to ground truth.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub source_id: SourceId,
    pub sampling_interval_ms: u64,
    pub supported_fields: &'static [VitalField],
    pub icon: &'static str,
    pub color: &'static str,
}

impl SourceProfile {
    /// Gaussian observation noise (std-dev) added on top of ground truth for
    /// a given field, or `None` if this source does not report it.
    pub fn noise_sigma(&self, field: VitalField) -> Option<f64> {
        if !self.supported_fields.contains(&field) {
            return None;
        }
        Some(match (self.source_id, field) {
            (SourceId::Apple, VitalField::HeartRate) => 1.5,
            (SourceId::Apple, VitalField::Hrv) => 3.0,
            (SourceId::Apple, VitalField::RespiratoryRate) => 0.8,
            (SourceId::Apple, VitalField::ActivityLevel) => 2.0,
            (SourceId::Apple, VitalField::StepsPerMinute) => 1.0,
            (SourceId::Apple, VitalField::CaloriesPerMinute) => 0.15,
            (SourceId::Apple, VitalField::Spo2) => 0.5,

            (SourceId::Google, VitalField::HeartRate) => 2.0,
            (SourceId::Google, VitalField::Hrv) => 4.0,
            (SourceId::Google, VitalField::RespiratoryRate) => 1.0,
            (SourceId::Google, VitalField::ActivityLevel) => 2.5,
            (SourceId::Google, VitalField::StepsPerMinute) => 1.5,
            (SourceId::Google, VitalField::CaloriesPerMinute) => 0.2,

            (SourceId::Oura, VitalField::HeartRate) => 1.0,
            (SourceId::Oura, VitalField::Hrv) => 2.0,
            (SourceId::Oura, VitalField::Spo2) => 0.3,
            (SourceId::Oura, VitalField::SkinTempC) => 0.1,
            (SourceId::Oura, VitalField::SleepQuality) => 1.0,

            _ => 0.0,
        })
    }
}

const APPLE_FIELDS: [VitalField; 7] = [
    VitalField::HeartRate,
    VitalField::Hrv,
    VitalField::RespiratoryRate,
    VitalField::ActivityLevel,
    VitalField::StepsPerMinute,
    VitalField::CaloriesPerMinute,
    VitalField::Spo2,
];

const GOOGLE_FIELDS: [VitalField; 5] = [
    VitalField::HeartRate,
    VitalField::Hrv,
    VitalField::RespiratoryRate,
    VitalField::ActivityLevel,
    VitalField::StepsPerMinute,
];

const OURA_FIELDS: [VitalField; 5] = [
    VitalField::HeartRate,
    VitalField::Hrv,
    VitalField::Spo2,
    VitalField::SkinTempC,
    VitalField::SleepQuality,
];

pub fn profile_for(source_id: SourceId) -> SourceProfile {
    match source_id {
        SourceId::Apple => SourceProfile {
            source_id,
            sampling_interval_ms: 500,
            supported_fields: &APPLE_FIELDS,
            icon: "apple",
            color: "#a2aaad",
        },
        SourceId::Google => SourceProfile {
            source_id,
            sampling_interval_ms: 1000,
            supported_fields: &GOOGLE_FIELDS,
            icon: "google-fit",
            color: "#4285f4",
        },
        SourceId::Oura => SourceProfile {
            source_id,
            sampling_interval_ms: 1000,
            supported_fields: &OURA_FIELDS,
            icon: "oura",
            color: "#8e44ad",
        },
    }
}

/// Running per-source counters maintained by the ingestion registry.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStats {
    pub source_id: SourceId,
    pub enabled: bool,
    pub events_received: u64,
    #[typeshare(serialized_as = "string")]
    pub last_event_time: Option<chrono::DateTime<chrono::Utc>>,
}
