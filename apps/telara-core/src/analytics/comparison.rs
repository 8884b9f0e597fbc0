// [apps/telara-core/src/analytics/comparison.rs]
//! Period-over-period comparison between two adjacent 7-day windows.

use chrono::{DateTime, Duration, Utc};
use telara_event_models::{Alert, AlertSeverity, RawEvent, VitalField};

use super::mean;

const WINDOW_DAYS: i64 = 7;

const COMPARED_METRICS: [VitalField; 5] =
    [VitalField::HeartRate, VitalField::Hrv, VitalField::Spo2, VitalField::ActivityLevel, VitalField::SkinTempC];

/// Whether a higher value is the improvement for a given metric.
/// Temperature has no "better" direction — what matters is staying close
/// to the personal baseline, so it is reported without a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImprovementDirection {
    HigherIsBetter,
    LowerIsBetter,
    StabilityIsBetter,
}

fn direction_for(metric: VitalField) -> ImprovementDirection {
    match metric {
        VitalField::Hrv | VitalField::Spo2 | VitalField::ActivityLevel => ImprovementDirection::HigherIsBetter,
        VitalField::HeartRate => ImprovementDirection::LowerIsBetter,
        VitalField::SkinTempC => ImprovementDirection::StabilityIsBetter,
        _ => ImprovementDirection::HigherIsBetter,
    }
}

#[derive(Debug, Clone)]
pub struct MetricWindowStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct MetricComparison {
    pub metric: VitalField,
    pub current: MetricWindowStats,
    pub previous: MetricWindowStats,
    pub delta: f64,
    pub pct_change: f64,
    pub direction: ImprovementDirection,
    pub improved: bool,
}

#[derive(Debug, Clone)]
pub struct AlertCountComparison {
    pub severity: AlertSeverity,
    pub current: usize,
    pub previous: usize,
}

#[derive(Debug, Clone)]
pub struct HistoricalComparison {
    pub metrics: Vec<MetricComparison>,
    pub alert_counts: Vec<AlertCountComparison>,
}

/// Compares `[now - 14d, now - 7d)` against `[now - 7d, now)`.
pub fn compare_windows(events: &[RawEvent], alerts: &[Alert], now: DateTime<Utc>) -> HistoricalComparison {
    let boundary = now - Duration::days(WINDOW_DAYS);
    let start = now - Duration::days(2 * WINDOW_DAYS);

    let previous_events: Vec<&RawEvent> = events.iter().filter(|e| e.timestamp >= start && e.timestamp < boundary).collect();
    let current_events: Vec<&RawEvent> = events.iter().filter(|e| e.timestamp >= boundary && e.timestamp <= now).collect();

    let metrics = COMPARED_METRICS
        .iter()
        .filter_map(|&metric| compare_metric(metric, &previous_events, &current_events))
        .collect();

    let alert_counts = [AlertSeverity::Critical, AlertSeverity::High, AlertSeverity::Medium, AlertSeverity::Low]
        .into_iter()
        .map(|severity| AlertCountComparison {
            severity,
            current: alerts.iter().filter(|a| a.severity == severity && a.start_time >= boundary).count(),
            previous: alerts
                .iter()
                .filter(|a| a.severity == severity && a.start_time >= start && a.start_time < boundary)
                .count(),
        })
        .collect();

    HistoricalComparison { metrics, alert_counts }
}

fn compare_metric(metric: VitalField, previous: &[&RawEvent], current: &[&RawEvent]) -> Option<MetricComparison> {
    let previous_values: Vec<f64> = previous.iter().filter_map(|e| e.get(metric)).collect();
    let current_values: Vec<f64> = current.iter().filter_map(|e| e.get(metric)).collect();
    if previous_values.is_empty() || current_values.is_empty() {
        return None;
    }

    let previous_stats = window_stats(&previous_values);
    let current_stats = window_stats(&current_values);

    let delta = current_stats.avg - previous_stats.avg;
    let pct_change = if previous_stats.avg.abs() < f64::EPSILON { 0.0 } else { delta / previous_stats.avg * 100.0 };
    let direction = direction_for(metric);
    let improved = match direction {
        ImprovementDirection::HigherIsBetter => delta > 0.0,
        ImprovementDirection::LowerIsBetter => delta < 0.0,
        ImprovementDirection::StabilityIsBetter => delta.abs() < previous_stats.avg.abs() * 0.05,
    };

    Some(MetricComparison {
        metric,
        current: current_stats,
        previous: previous_stats,
        delta,
        pct_change,
        direction,
        improved,
    })
}

fn window_stats(values: &[f64]) -> MetricWindowStats {
    MetricWindowStats {
        avg: mean(values),
        min: values.iter().cloned().fold(f64::INFINITY, f64::min),
        max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;

    fn event_at(ts: DateTime<Utc>, hr: f64) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: ts,
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

    #[test]
    fn lower_resting_heart_rate_this_week_counts_as_improved() {
        let now = Utc::now();
        let mut events = Vec::new();
        for i in 0..10 {
            events.push(event_at(now - Duration::days(10) + Duration::hours(i), 85.0));
        }
        for i in 0..10 {
            events.push(event_at(now - Duration::days(3) + Duration::hours(i), 72.0));
        }
        let comparison = compare_windows(&events, &[], now);
        let hr = comparison.metrics.iter().find(|m| m.metric == VitalField::HeartRate).unwrap();
        assert!(hr.improved);
        assert!(hr.delta < 0.0);
    }

    #[test]
    fn metric_absent_from_either_window_is_skipped() {
        let now = Utc::now();
        let events = vec![event_at(now - Duration::hours(1), 72.0)];
        let comparison = compare_windows(&events, &[], now);
        assert!(comparison.metrics.is_empty());
    }

    #[test]
    fn alert_counts_are_split_by_window_boundary() {
        let now = Utc::now();
        let alerts = vec![
            Alert {
                alert_id: "a1".into(),
                alert_type_name: "TACHYCARDIA_AT_REST".into(),
                user_id: "user_001".into(),
                severity: AlertSeverity::High,
                start_time: now - Duration::days(10),
                end_time: now - Duration::days(10),
                avg_heart_rate: 120.0,
                event_count: 5,
                description: "x".into(),
                enriched_insight: None,
                resolved: false,
            },
            Alert {
                alert_id: "a2".into(),
                alert_type_name: "TACHYCARDIA_AT_REST".into(),
                user_id: "user_001".into(),
                severity: AlertSeverity::High,
                start_time: now - Duration::days(1),
                end_time: now - Duration::days(1),
                avg_heart_rate: 120.0,
                event_count: 5,
                description: "x".into(),
                enriched_insight: None,
                resolved: false,
            },
        ];
        let comparison = compare_windows(&[], &alerts, now);
        let high = comparison.alert_counts.iter().find(|c| c.severity == AlertSeverity::High).unwrap();
        assert_eq!(high.previous, 1);
        assert_eq!(high.current, 1);
    }
}
