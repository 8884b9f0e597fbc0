// [apps/telara-core/src/ground_truth/profile.rs]
//! Static evolution parameters for the ground-truth engine: base set-points,
//! per-field noise and clamp ranges, circadian offset tables, and the
//! field-indexed plumbing shared between `PhysiologicalState` and
//! `RawEvent`.

use telara_event_models::{PhysiologicalState, RawEvent, VitalField};

use super::AnomalyKind;

pub(super) fn base_state() -> PhysiologicalState {
    PhysiologicalState {
        heart_rate: 68.0,
        hrv_ms: 45.0,
        spo2_percent: 97.5,
        skin_temp_c: 36.5,
        respiratory_rate: 14.0,
        activity_level: 15.0,
        steps_per_minute: 5.0,
        calories_per_minute: 1.2,
        sleep_quality: 75.0,
    }
}

/// Random-walk noise coefficient (σ in the evolution equation, per √s).
pub(super) fn evolution_sigma(field: VitalField) -> f64 {
    match field {
        VitalField::HeartRate => 1.2,
        VitalField::Hrv => 2.5,
        VitalField::Spo2 => 0.3,
        VitalField::SkinTempC => 0.05,
        VitalField::RespiratoryRate => 0.5,
        VitalField::ActivityLevel => 2.0,
        VitalField::StepsPerMinute => 1.0,
        VitalField::CaloriesPerMinute => 0.1,
        VitalField::SleepQuality => 1.0,
    }
}

/// Half-width of the per-user baseline offset randomised at first
/// materialisation (keeps every simulated user distinct without needing a
/// configured profile per user).
pub(super) fn baseline_spread(field: VitalField) -> f64 {
    match field {
        VitalField::HeartRate => 6.0,
        VitalField::Hrv => 8.0,
        VitalField::Spo2 => 1.0,
        VitalField::SkinTempC => 0.2,
        VitalField::RespiratoryRate => 1.5,
        VitalField::ActivityLevel => 5.0,
        VitalField::StepsPerMinute => 2.0,
        VitalField::CaloriesPerMinute => 0.3,
        VitalField::SleepQuality => 8.0,
    }
}

pub(super) fn clamp_field(field: VitalField, value: f64) -> f64 {
    let (lo, hi) = match field {
        VitalField::HeartRate => (40.0, 180.0),
        VitalField::Hrv => (10.0, 120.0),
        VitalField::Spo2 => (80.0, 100.0),
        VitalField::SkinTempC => (34.0, 40.0),
        VitalField::RespiratoryRate => (8.0, 30.0),
        VitalField::ActivityLevel => (0.0, 100.0),
        VitalField::StepsPerMinute => (0.0, 200.0),
        VitalField::CaloriesPerMinute => (0.0, 20.0),
        VitalField::SleepQuality => (0.0, 100.0),
    };
    value.clamp(lo, hi)
}

/// Integer fields round to whole units; the rest keep two decimals.
pub(super) fn round_for_field(field: VitalField, value: f64) -> f64 {
    let clamped = clamp_field(field, value);
    match field {
        VitalField::HeartRate
        | VitalField::Hrv
        | VitalField::RespiratoryRate
        | VitalField::ActivityLevel
        | VitalField::StepsPerMinute
        | VitalField::Spo2 => clamped.round(),
        _ => (clamped * 100.0).round() / 100.0,
    }
}

/// Hour-of-day circadian offset applied additively to the base set-point.
fn circadian_offset(hour: u32, field: VitalField) -> f64 {
    let bucket = match hour {
        0..=5 => Bucket::Night,
        6..=11 => Bucket::Morning,
        12..=17 => Bucket::Afternoon,
        _ => Bucket::Evening,
    };
    match (bucket, field) {
        (Bucket::Night, VitalField::HeartRate) => -6.0,
        (Bucket::Night, VitalField::ActivityLevel) => -10.0,
        (Bucket::Night, VitalField::StepsPerMinute) => -4.0,
        (Bucket::Night, VitalField::SleepQuality) => 10.0,
        (Bucket::Night, VitalField::Hrv) => 5.0,

        (Bucket::Morning, VitalField::HeartRate) => 2.0,
        (Bucket::Morning, VitalField::ActivityLevel) => 8.0,
        (Bucket::Morning, VitalField::CaloriesPerMinute) => 0.3,

        (Bucket::Afternoon, VitalField::HeartRate) => 4.0,
        (Bucket::Afternoon, VitalField::ActivityLevel) => 12.0,
        (Bucket::Afternoon, VitalField::StepsPerMinute) => 3.0,
        (Bucket::Afternoon, VitalField::CaloriesPerMinute) => 0.5,

        (Bucket::Evening, VitalField::HeartRate) => 0.0,
        (Bucket::Evening, VitalField::ActivityLevel) => 2.0,
        (Bucket::Evening, VitalField::SleepQuality) => -5.0,

        _ => 0.0,
    }
}

#[derive(Clone, Copy)]
enum Bucket {
    Night,
    Morning,
    Afternoon,
    Evening,
}

/// Combined target for the evolution equation: base set-point + circadian
/// offset + per-user baseline offset + active anomaly overlay (if any).
pub(super) fn target_state(
    hour: u32,
    baseline_offsets: &[f64; 9],
    overlay: Option<AnomalyKind>,
) -> PhysiologicalState {
    let base = base_state();
    let mut target = base;

    for (index, field) in VitalField::ALL.iter().enumerate() {
        let value = base.get(*field) + circadian_offset(hour, *field) + baseline_offsets[index];
        set_field_state(&mut target, *field, value);
    }

    if let Some(kind) = overlay {
        let mut rng = rand::thread_rng();
        use rand::Rng;
        for (field, lo, hi) in kind.overrides() {
            let overridden = rng.gen_range(*lo..=*hi);
            set_field_state(&mut target, *field, overridden);
        }
    }

    target
}

pub(super) fn set_field_state(state: &mut PhysiologicalState, field: VitalField, value: f64) {
    match field {
        VitalField::HeartRate => state.heart_rate = value,
        VitalField::Hrv => state.hrv_ms = value,
        VitalField::Spo2 => state.spo2_percent = value,
        VitalField::SkinTempC => state.skin_temp_c = value,
        VitalField::RespiratoryRate => state.respiratory_rate = value,
        VitalField::ActivityLevel => state.activity_level = value,
        VitalField::StepsPerMinute => state.steps_per_minute = value,
        VitalField::CaloriesPerMinute => state.calories_per_minute = value,
        VitalField::SleepQuality => state.sleep_quality = value,
    }
}

pub(super) fn set_field(event: &mut RawEvent, field: VitalField, value: f64) {
    match field {
        VitalField::HeartRate => event.heart_rate = Some(value),
        VitalField::Hrv => event.hrv_ms = Some(value),
        VitalField::Spo2 => event.spo2_percent = Some(value),
        VitalField::SkinTempC => event.skin_temp_c = Some(value),
        VitalField::RespiratoryRate => event.respiratory_rate = Some(value),
        VitalField::ActivityLevel => event.activity_level = Some(value),
        VitalField::StepsPerMinute => event.steps_per_minute = Some(value),
        VitalField::CaloriesPerMinute => event.calories_per_minute = Some(value),
        VitalField::SleepQuality => event.sleep_quality = Some(value),
    }
}
