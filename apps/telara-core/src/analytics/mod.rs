// [apps/telara-core/src/analytics/mod.rs]
//! C9 — analytics bundle computed on demand over a window of persisted or
//! hot-ring vitals: cross-metric correlations, a composite wellness score,
//! rule-based recommendations, short-horizon predictions, and
//! period-over-period historical comparison. Every submodule is a pure
//! function over a slice of `RawEvent`/`Alert` plus a `Baseline` — no
//! submodule touches storage or the bus directly, so they are exercised
//! here with plain in-memory fixtures.

pub mod comparison;
pub mod correlation;
pub mod predictions;
pub mod recommendations;
pub mod wellness;

pub use comparison::{compare_windows, HistoricalComparison};
pub use correlation::{correlate, CorrelationOutcome};
pub use predictions::{predict, Prediction};
pub use recommendations::{recommend, Recommendation};
pub use wellness::{score_wellness, WellnessScore};

use chrono::{DateTime, Utc};
use telara_event_models::{RawEvent, VitalField};

/// One `(timestamp, value)` sample of a single metric, extracted from a
/// window of events. Shared by every analytics submodule so none of them
/// need to re-walk `RawEvent` field access.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Projects a window of events onto one metric's samples, in arrival
/// order, skipping events that don't report it.
pub fn samples_for(events: &[RawEvent], field: VitalField) -> Vec<Sample> {
    events
        .iter()
        .filter_map(|e| e.get(field).map(|value| Sample { timestamp: e.timestamp, value }))
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub(crate) fn std_dev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Which hour-of-day bucket a timestamp falls into, used by recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBucket {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl DayBucket {
    pub fn for_timestamp(t: DateTime<Utc>) -> Self {
        use chrono::Timelike;
        match t.hour() {
            0..=5 => DayBucket::Night,
            6..=11 => DayBucket::Morning,
            12..=17 => DayBucket::Afternoon,
            _ => DayBucket::Evening,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;

    fn event(hr: Option<f64>, ts: DateTime<Utc>) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: ts,
            user_id: "user_001".into(),
            source: SourceId::Apple,
            source_name: "Apple HealthKit".into(),
            heart_rate: hr,
            hrv_ms: None,
            spo2_percent: None,
            skin_temp_c: None,
            respiratory_rate: None,
            activity_level: None,
            steps_per_minute: None,
            calories_per_minute: None,
            sleep_quality: None,
        }
    }

    #[test]
    fn samples_for_skips_events_missing_the_field() {
        let now = Utc::now();
        let events = vec![event(Some(70.0), now), event(None, now), event(Some(72.0), now)];
        let samples = samples_for(&events, VitalField::HeartRate);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn day_bucket_boundaries() {
        use chrono::TimeZone;
        assert_eq!(DayBucket::for_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()), DayBucket::Night);
        assert_eq!(DayBucket::for_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()), DayBucket::Morning);
        assert_eq!(
            DayBucket::for_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap()),
            DayBucket::Afternoon
        );
        assert_eq!(DayBucket::for_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap()), DayBucket::Evening);
    }
}
