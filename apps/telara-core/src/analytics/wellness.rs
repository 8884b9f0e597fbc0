// [apps/telara-core/src/analytics/wellness.rs]
//! Composite wellness score: four piecewise-threshold subscores (heart
//! health, recovery, activity, stability) plus an alert-penalty subscore,
//! combined with fixed weights.

use telara_event_models::{Alert, AlertSeverity, RawEvent, VitalField};

use super::{mean, samples_for, std_dev};

const WEIGHT_HEART_HEALTH: f64 = 0.25;
const WEIGHT_RECOVERY: f64 = 0.20;
const WEIGHT_ACTIVITY: f64 = 0.20;
const WEIGHT_STABILITY: f64 = 0.20;
const WEIGHT_ALERT_STATUS: f64 = 0.15;

#[derive(Debug, Clone, Copy)]
pub struct WellnessScore {
    pub overall: f64,
    pub heart_health: f64,
    pub recovery: f64,
    pub activity: f64,
    pub stability: f64,
    pub alert_status: f64,
}

/// Scores a window of events plus the alerts raised within it. Subscores
/// are 0-100; `overall` is their weighted sum, also 0-100.
pub fn score_wellness(events: &[RawEvent], alerts: &[Alert]) -> WellnessScore {
    let heart_health = heart_health_subscore(events);
    let recovery = recovery_subscore(events);
    let activity = activity_subscore(events);
    let stability = stability_subscore(events);
    let alert_status = alert_status_subscore(alerts);

    let overall = WEIGHT_HEART_HEALTH * heart_health
        + WEIGHT_RECOVERY * recovery
        + WEIGHT_ACTIVITY * activity
        + WEIGHT_STABILITY * stability
        + WEIGHT_ALERT_STATUS * alert_status;

    WellnessScore { overall, heart_health, recovery, activity, stability, alert_status }
}

fn heart_health_subscore(events: &[RawEvent]) -> f64 {
    let samples = samples_for(events, VitalField::HeartRate);
    if samples.is_empty() {
        return 100.0;
    }
    let avg_hr = mean(&samples.iter().map(|s| s.value).collect::<Vec<_>>());
    match avg_hr {
        hr if (60.0..=80.0).contains(&hr) => 100.0,
        hr if (50.0..60.0).contains(&hr) || (80.0..90.0).contains(&hr) => 80.0,
        hr if (40.0..50.0).contains(&hr) || (90.0..100.0).contains(&hr) => 60.0,
        _ => 40.0,
    }
}

fn recovery_subscore(events: &[RawEvent]) -> f64 {
    let hrv_samples = samples_for(events, VitalField::Hrv);
    let spo2_samples = samples_for(events, VitalField::Spo2);

    let hrv_score = if hrv_samples.is_empty() {
        100.0
    } else {
        let avg = mean(&hrv_samples.iter().map(|s| s.value).collect::<Vec<_>>());
        match avg {
            h if h >= 60.0 => 100.0,
            h if h >= 45.0 => 80.0,
            h if h >= 30.0 => 60.0,
            _ => 40.0,
        }
    };

    let spo2_score = if spo2_samples.is_empty() {
        100.0
    } else {
        let avg = mean(&spo2_samples.iter().map(|s| s.value).collect::<Vec<_>>());
        match avg {
            s if s >= 97.0 => 100.0,
            s if s >= 95.0 => 85.0,
            s if s >= 92.0 => 65.0,
            _ => 40.0,
        }
    };

    (hrv_score + spo2_score) / 2.0
}

fn activity_subscore(events: &[RawEvent]) -> f64 {
    let samples = samples_for(events, VitalField::ActivityLevel);
    if samples.is_empty() {
        return 70.0; // no signal either way; neutral-leaning-positive default
    }
    let avg = mean(&samples.iter().map(|s| s.value).collect::<Vec<_>>());
    match avg {
        a if a >= 50.0 => 100.0,
        a if a >= 30.0 => 80.0,
        a if a >= 15.0 => 60.0,
        _ => 40.0,
    }
}

fn stability_subscore(events: &[RawEvent]) -> f64 {
    let samples = samples_for(events, VitalField::HeartRate);
    if samples.len() < 2 {
        return 100.0;
    }
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let std = std_dev(&values, mean(&values));
    match std {
        s if s < 5.0 => 100.0,
        s if s < 10.0 => 80.0,
        s if s < 20.0 => 60.0,
        _ => 40.0,
    }
}

/// `100 - sum(per-alert penalty)`, floored at 0.
fn alert_status_subscore(alerts: &[Alert]) -> f64 {
    let penalty: f64 = alerts.iter().map(|a| a.severity.penalty()).sum();
    (100.0 - penalty).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telara_event_models::SourceId;

    fn event(hr: f64) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: Utc::now(),
            user_id: "user_001".into(),
            source: SourceId::Apple,
            source_name: "Apple HealthKit".into(),
            heart_rate: Some(hr),
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

    fn alert(severity: AlertSeverity) -> Alert {
        Alert {
            alert_id: uuid::Uuid::new_v4().to_string(),
            alert_type_name: "TACHYCARDIA_AT_REST".into(),
            user_id: "user_001".into(),
            severity,
            start_time: Utc::now(),
            end_time: Utc::now(),
            avg_heart_rate: 120.0,
            event_count: 5,
            description: "test".into(),
            enriched_insight: None,
            resolved: false,
        }
    }

    #[test]
    fn resting_heart_rate_scores_full_marks() {
        let events: Vec<_> = (0..10).map(|_| event(72.0)).collect();
        let score = score_wellness(&events, &[]);
        assert_eq!(score.heart_health, 100.0);
        assert_eq!(score.alert_status, 100.0);
    }

    #[test]
    fn critical_alerts_depress_the_alert_status_subscore() {
        let alerts = vec![alert(AlertSeverity::Critical), alert(AlertSeverity::High)];
        let score = score_wellness(&[], &alerts);
        assert_eq!(score.alert_status, 60.0); // 100 - 25 - 15
    }

    #[test]
    fn alert_penalty_floors_at_zero() {
        let alerts: Vec<_> = (0..10).map(|_| alert(AlertSeverity::Critical)).collect();
        let score = score_wellness(&[], &alerts);
        assert_eq!(score.alert_status, 0.0);
    }
}
