// [apps/telara-core/src/analytics/predictions.rs]
//! Short-horizon linear-regression predictions per metric, plus two
//! composite signals (fatigue, stress) built on top of the same
//! regression primitive.

use chrono::{DateTime, Duration, Utc};
use telara_event_models::{Baseline, RawEvent, VitalField};

use super::{mean, samples_for, Sample};

const REGRESSION_WINDOW_HOURS: i64 = 2;
const ACCEPT_GATE: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, Copy)]
struct Regression {
    slope: f64,
    intercept: f64,
    r_squared: f64,
    span_hours: f64,
}

/// One accepted forecast for a metric: projected value at the end of the
/// regression window, plus the time at which it would cross `threshold`
/// if the current trend holds (`None` if the trend never reaches it).
#[derive(Debug, Clone)]
pub struct Prediction {
    pub metric: VitalField,
    pub projected_value: f64,
    pub threshold: f64,
    pub time_to_threshold_hours: Option<f64>,
    pub confidence: f64,
}

/// A composite signal built from more than one metric's trend.
#[derive(Debug, Clone)]
pub struct CompositeSignal {
    pub name: &'static str,
    pub active: bool,
    pub confidence: f64,
    pub time_to_critical_hours: Option<f64>,
    pub description: String,
}

/// Fits a regression on the last two hours of `metric` samples and
/// returns a prediction only if the fit clears `R² · recency_factor >=
/// 0.3`; `threshold` is the value whose crossing time is reported.
pub fn predict(events: &[RawEvent], metric: VitalField, threshold: f64, now: DateTime<Utc>) -> Option<Prediction> {
    let samples = recent_samples(events, metric, now);
    let regression = fit(&samples)?;

    let recency_factor = (regression.span_hours / REGRESSION_WINDOW_HOURS as f64).clamp(0.0, 1.0);
    if regression.r_squared * recency_factor < ACCEPT_GATE {
        return None;
    }

    let horizon_hours = REGRESSION_WINDOW_HOURS as f64;
    let projected_value = regression.intercept + regression.slope * horizon_hours;
    let time_to_threshold_hours = time_to_cross(&regression, horizon_hours, threshold);
    let confidence = (regression.r_squared * recency_factor).min(MAX_CONFIDENCE);

    Some(Prediction { metric, projected_value, threshold, time_to_threshold_hours, confidence })
}

/// Fatigue: HRV trending down and projected below 85% of the personal
/// baseline mean within the regression horizon.
pub fn fatigue_signal(events: &[RawEvent], baseline: &Baseline, now: DateTime<Utc>) -> CompositeSignal {
    let samples = recent_samples(events, VitalField::Hrv, now);
    let Some(regression) = fit(&samples) else {
        return CompositeSignal {
            name: "fatigue",
            active: false,
            confidence: 0.0,
            time_to_critical_hours: None,
            description: "insufficient recent HRV data".into(),
        };
    };

    let critical = baseline.mean_hrv * 0.85;
    let declining = regression.slope < 0.0;
    let time_to_critical = time_to_cross(&regression, 0.0, critical);
    let active = declining && baseline.is_mature() && time_to_critical.is_some();
    let recency_factor = (regression.span_hours / REGRESSION_WINDOW_HOURS as f64).clamp(0.0, 1.0);

    CompositeSignal {
        name: "fatigue",
        active,
        confidence: (regression.r_squared * recency_factor).min(MAX_CONFIDENCE),
        time_to_critical_hours: if active { time_to_critical } else { None },
        description: if active {
            "HRV is declining toward fatigue territory relative to your baseline".to_string()
        } else {
            "HRV trend does not indicate fatigue".to_string()
        },
    }
}

/// Stress: rising heart rate, compressed HRV, and low activity, all at
/// once over the same window.
pub fn stress_signal(events: &[RawEvent], baseline: &Baseline, now: DateTime<Utc>) -> CompositeSignal {
    let hr_samples = recent_samples(events, VitalField::HeartRate, now);
    let hrv_samples = recent_samples(events, VitalField::Hrv, now);
    let activity_samples = recent_samples(events, VitalField::ActivityLevel, now);

    if hr_samples.is_empty() || hrv_samples.is_empty() {
        return CompositeSignal {
            name: "stress",
            active: false,
            confidence: 0.0,
            time_to_critical_hours: None,
            description: "insufficient recent data".into(),
        };
    }

    let avg_hr = mean(&hr_samples.iter().map(|s| s.value).collect::<Vec<_>>());
    let avg_hrv = mean(&hrv_samples.iter().map(|s| s.value).collect::<Vec<_>>());
    let avg_activity = if activity_samples.is_empty() {
        0.0
    } else {
        mean(&activity_samples.iter().map(|s| s.value).collect::<Vec<_>>())
    };

    let elevated_hr = baseline.is_mature() && avg_hr > baseline.mean_heart_rate * 1.1;
    let compressed_hrv = baseline.is_mature() && avg_hrv < baseline.mean_hrv * 0.85;
    let low_activity = avg_activity < 15.0;
    let active = elevated_hr && compressed_hrv && low_activity;

    CompositeSignal {
        name: "stress",
        active,
        confidence: if active { 0.7 } else { 0.2 },
        time_to_critical_hours: None,
        description: if active {
            "Elevated heart rate with compressed HRV and low activity suggests acute stress".to_string()
        } else {
            "No combined stress signature detected".to_string()
        },
    }
}

fn recent_samples(events: &[RawEvent], metric: VitalField, now: DateTime<Utc>) -> Vec<Sample> {
    let cutoff = now - Duration::hours(REGRESSION_WINDOW_HOURS);
    samples_for(events, metric).into_iter().filter(|s| s.timestamp >= cutoff).collect()
}

/// Ordinary least squares on `(hours_since_first_sample, value)`, plus
/// the R² of the fit and the span of data actually covered.
fn fit(samples: &[Sample]) -> Option<Regression> {
    if samples.len() < 3 {
        return None;
    }
    let t0 = samples[0].timestamp;
    let xs: Vec<f64> = samples.iter().map(|s| (s.timestamp - t0).num_milliseconds() as f64 / 3_600_000.0).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.value).collect();

    let mx = mean(&xs);
    let my = mean(&ys);
    let denom: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if denom < f64::EPSILON {
        return None;
    }
    let slope = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum::<f64>() / denom;
    let intercept = my - slope * mx;

    let ss_tot: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
    let ss_res: f64 = xs.iter().zip(&ys).map(|(x, y)| (y - (intercept + slope * x)).powi(2)).sum();
    let r_squared = if ss_tot < f64::EPSILON { 1.0 } else { (1.0 - ss_res / ss_tot).clamp(0.0, 1.0) };

    let span_hours = xs.last().copied().unwrap_or(0.0) - xs.first().copied().unwrap_or(0.0);
    Some(Regression { slope, intercept, r_squared, span_hours })
}

/// Hours from `from_x` until the fitted line reaches `threshold`, or
/// `None` if the trend is flat or moving away from it.
fn time_to_cross(regression: &Regression, from_x: f64, threshold: f64) -> Option<f64> {
    if regression.slope.abs() < f64::EPSILON {
        return None;
    }
    let current = regression.intercept + regression.slope * from_x;
    let crossing_x = (threshold - regression.intercept) / regression.slope;
    let delta = crossing_x - from_x;
    let moving_toward = (threshold - current) * regression.slope > 0.0;
    if moving_toward && delta > 0.0 {
        Some(delta)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;

    fn event_at(ts: DateTime<Utc>, hr: Option<f64>, hrv: Option<f64>) -> RawEvent {
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

    /// S4: 30 samples over the last 2h, HR rising linearly 70->92,
    /// R²≈0.95 ⇒ prediction accepted, threshold_crossing within <= 2h,
    /// confidence >= 0.6.
    #[test]
    fn s4_rising_heart_rate_yields_accepted_prediction() {
        let now = Utc::now();
        let events: Vec<_> = (0..30)
            .map(|i| {
                let frac = i as f64 / 29.0;
                let ts = now - Duration::hours(2) + Duration::milliseconds((frac * 2.0 * 3_600_000.0) as i64);
                event_at(ts, Some(70.0 + frac * 22.0), None)
            })
            .collect();

        let prediction = predict(&events, VitalField::HeartRate, 100.0, now).expect("prediction should be accepted");
        assert!(prediction.confidence >= 0.6, "confidence={}", prediction.confidence);
        assert!(prediction.confidence <= MAX_CONFIDENCE);
        let hours = prediction.time_to_threshold_hours.expect("rising trend should cross 100");
        assert!(hours <= 2.0 + 0.5, "time_to_threshold={hours}");
    }

    #[test]
    fn flat_series_is_rejected_for_insufficient_signal() {
        let now = Utc::now();
        let events: Vec<_> = (0..10)
            .map(|i| event_at(now - Duration::minutes(i), Some(72.0), None))
            .collect();
        assert!(predict(&events, VitalField::HeartRate, 100.0, now).is_none());
    }

    #[test]
    fn fatigue_signal_fires_on_declining_hrv_below_baseline_threshold() {
        let now = Utc::now();
        let baseline = Baseline { mean_hrv: 60.0, data_points: 50, ..Baseline::fresh(now) };
        let events: Vec<_> = (0..20)
            .map(|i| {
                let ts = now - Duration::hours(2) + Duration::minutes(i * 6);
                event_at(ts, None, Some(60.0 - i as f64 * 1.5))
            })
            .collect();
        let signal = fatigue_signal(&events, &baseline, now);
        assert!(signal.active, "{:?}", signal);
    }

    #[test]
    fn stress_signal_requires_all_three_conditions() {
        let now = Utc::now();
        let baseline = Baseline { mean_heart_rate: 70.0, mean_hrv: 50.0, data_points: 50, ..Baseline::fresh(now) };
        let mut events = Vec::new();
        for i in 0..10 {
            let ts = now - Duration::minutes(i);
            events.push(event_at(ts, Some(90.0), Some(35.0)));
        }
        let signal = stress_signal(&events, &baseline, now);
        assert!(signal.active);
    }
}
