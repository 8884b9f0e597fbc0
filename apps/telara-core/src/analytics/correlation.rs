// [apps/telara-core/src/analytics/correlation.rs]
//! Pearson correlation between two metrics, either time-aligned
//! ("immediate") or with a fixed lag applied to one side.

use telara_event_models::{RawEvent, VitalField};

use super::{mean, samples_for, std_dev, Sample};

const IMMEDIATE_MIN_PAIRS: usize = 10;
const LAGGED_MIN_PAIRS: usize = 5;

/// Tolerance for pairing two metrics "at the same instant". Readings from
/// different sources rarely land on the identical millisecond, so pairing
/// is nearest-neighbour within this window rather than exact-match.
const IMMEDIATE_PAIR_TOLERANCE_SECS: i64 = 30;
const LAGGED_PAIR_TOLERANCE_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    Negligible,
}

impl Strength {
    fn bucket(r: f64) -> Self {
        let abs = r.abs();
        if abs >= 0.7 {
            Strength::Strong
        } else if abs >= 0.4 {
            Strength::Moderate
        } else if abs >= 0.2 {
            Strength::Weak
        } else {
            Strength::Negligible
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationResult {
    pub metric_a: VitalField,
    pub metric_b: VitalField,
    pub lag_hours: f64,
    pub r: f64,
    pub strength: Strength,
    pub pair_count: usize,
}

#[derive(Debug, Clone)]
pub enum CorrelationOutcome {
    Computed(CorrelationResult),
    InsufficientData { reason: String },
}

/// Correlates `metric_a` against `metric_b`, with `metric_b` samples
/// shifted by `lag_hours` (0.0 for immediate correlation). Pairing is
/// nearest-neighbour within a tolerance that scales with whether a lag is
/// requested.
pub fn correlate(events: &[RawEvent], metric_a: VitalField, metric_b: VitalField, lag_hours: f64) -> CorrelationOutcome {
    let samples_a = samples_for(events, metric_a);
    let samples_b = samples_for(events, metric_b);

    let (pairs, min_pairs) = if lag_hours == 0.0 {
        (pair_nearest(&samples_a, &samples_b, 0.0, IMMEDIATE_PAIR_TOLERANCE_SECS as f64 / 3600.0), IMMEDIATE_MIN_PAIRS)
    } else {
        (pair_nearest(&samples_a, &samples_b, lag_hours, LAGGED_PAIR_TOLERANCE_HOURS as f64), LAGGED_MIN_PAIRS)
    };

    if pairs.len() < min_pairs {
        return CorrelationOutcome::InsufficientData {
            reason: format!("only {} paired samples, need at least {min_pairs}", pairs.len()),
        };
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let r = pearson(&xs, &ys);

    CorrelationOutcome::Computed(CorrelationResult {
        metric_a,
        metric_b,
        lag_hours,
        r,
        strength: Strength::bucket(r),
        pair_count: pairs.len(),
    })
}

/// For each sample in `a`, finds the nearest sample in `b` to
/// `a.timestamp + lag_hours`, keeping the pair only if it falls within
/// `tolerance_hours`.
fn pair_nearest(a: &[Sample], b: &[Sample], lag_hours: f64, tolerance_hours: f64) -> Vec<(f64, f64)> {
    let lag = chrono::Duration::milliseconds((lag_hours * 3_600_000.0) as i64);
    let tolerance = chrono::Duration::milliseconds((tolerance_hours * 3_600_000.0) as i64);
    let mut pairs = Vec::new();

    for sa in a {
        let target = sa.timestamp + lag;
        let nearest = b.iter().min_by_key(|sb| (sb.timestamp - target).num_milliseconds().abs());
        if let Some(sb) = nearest {
            if (sb.timestamp - target).abs() <= tolerance {
                pairs.push((sa.value, sb.value));
            }
        }
    }
    pairs
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let mx = mean(xs);
    let my = mean(ys);
    let sx = std_dev(xs, mx);
    let sy = std_dev(ys, my);
    if sx < f64::EPSILON || sy < f64::EPSILON {
        return 0.0;
    }
    let covariance = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum::<f64>() / xs.len() as f64;
    (covariance / (sx * sy)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use telara_event_models::SourceId;

    fn event_at(ts: chrono::DateTime<Utc>, hr: Option<f64>, hrv: Option<f64>) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: ts,
            user_id: "user_001".into(),
            source: SourceId::Apple,
            source_name: "Apple HealthKit".into(),
            heart_rate: hr,
            hrv_ms: hrv,
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
    fn fewer_than_minimum_pairs_is_insufficient_data() {
        let now = Utc::now();
        let events: Vec<_> = (0..5).map(|i| event_at(now + Duration::seconds(i), Some(70.0 + i as f64), Some(50.0))).collect();
        let outcome = correlate(&events, VitalField::HeartRate, VitalField::Hrv, 0.0);
        assert!(matches!(outcome, CorrelationOutcome::InsufficientData { .. }));
    }

    #[test]
    fn perfectly_inverse_series_yields_strong_negative_correlation() {
        let now = Utc::now();
        let events: Vec<_> = (0..20)
            .map(|i| event_at(now + Duration::seconds(i), Some(60.0 + i as f64), Some(100.0 - i as f64)))
            .collect();
        let outcome = correlate(&events, VitalField::HeartRate, VitalField::Hrv, 0.0);
        match outcome {
            CorrelationOutcome::Computed(result) => {
                assert!(result.r < -0.95, "r={}", result.r);
                assert_eq!(result.strength, Strength::Strong);
            }
            other => panic!("expected a computed result, got {other:?}"),
        }
    }

    #[test]
    fn lagged_pairing_shifts_the_target_window() {
        let base = Utc::now();
        let mut events = Vec::new();
        for i in 0..10 {
            events.push(event_at(base + Duration::hours(i), Some(70.0), None));
        }
        for i in 0..10 {
            let mut e = event_at(base + Duration::hours(i) + Duration::hours(1), None, Some(45.0));
            e.hrv_ms = Some(45.0);
            events.push(e);
        }
        let outcome = correlate(&events, VitalField::HeartRate, VitalField::Hrv, 1.0);
        assert!(matches!(outcome, CorrelationOutcome::Computed(_)));
    }
}
