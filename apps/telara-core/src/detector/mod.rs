// [apps/telara-core/src/detector/mod.rs]
//! C7 — three concurrent per-user sustained-condition pattern detectors.
//! Each is a small finite-state machine: `Idle -> Run(k) -> Emit` on the
//! first event satisfying the terminator, which for every configured
//! pattern here is the negation of the entry predicate. Runs shorter than
//! `min_run_length` that hit a terminator are discarded with no alert.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use telara_event_models::{Alert, AlertSeverity, RawEvent};
use uuid::Uuid;

/// Out-of-order tolerance: an event earlier than `watermark - SLACK` is
/// dropped for detection purposes (it is still persisted upstream).
const WATERMARK_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    TachycardiaAtRest,
    LowSpo2Hypoxia,
    ElevatedTemperature,
}

impl PatternKind {
    const ALL: [PatternKind; 3] =
        [PatternKind::TachycardiaAtRest, PatternKind::LowSpo2Hypoxia, PatternKind::ElevatedTemperature];

    fn min_run_length(self) -> usize {
        match self {
            PatternKind::TachycardiaAtRest => 5,
            PatternKind::LowSpo2Hypoxia => 3,
            PatternKind::ElevatedTemperature => 3,
        }
    }

    /// Predicate A. `None` means the event carries none of the fields this
    /// pattern cares about, which is treated as "does not satisfy A" (a run
    /// in progress is terminated, mirroring B, rather than ignored) — a
    /// source that doesn't report the field simply can't sustain this
    /// pattern for that user.
    fn satisfies_a(self, event: &RawEvent) -> Option<bool> {
        match self {
            PatternKind::TachycardiaAtRest => {
                let hr = event.heart_rate?;
                let activity = event.activity_level?;
                let steps = event.steps_per_minute?;
                Some(hr > 100.0 && activity < 10.0 && steps < 5.0)
            }
            PatternKind::LowSpo2Hypoxia => Some(event.spo2_percent? < 94.0),
            PatternKind::ElevatedTemperature => Some(event.skin_temp_c? > 37.5),
        }
    }

    /// The aggregate this pattern's severity/description is keyed on.
    fn aggregate_field(self, event: &RawEvent) -> Option<f64> {
        match self {
            PatternKind::TachycardiaAtRest => event.heart_rate,
            PatternKind::LowSpo2Hypoxia => event.spo2_percent,
            PatternKind::ElevatedTemperature => event.skin_temp_c,
        }
    }

    fn severity(self, avg: f64) -> AlertSeverity {
        match self {
            PatternKind::TachycardiaAtRest => {
                if avg > 130.0 {
                    AlertSeverity::Critical
                } else if avg > 115.0 {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                }
            }
            PatternKind::LowSpo2Hypoxia => {
                if avg < 90.0 {
                    AlertSeverity::Critical
                } else if avg < 92.0 {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                }
            }
            PatternKind::ElevatedTemperature => {
                if avg > 38.5 {
                    AlertSeverity::Critical
                } else if avg > 38.0 {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                }
            }
        }
    }

    fn alert_type_name(self) -> &'static str {
        match self {
            PatternKind::TachycardiaAtRest => "TACHYCARDIA_AT_REST",
            PatternKind::LowSpo2Hypoxia => "LOW_SPO2_HYPOXIA",
            PatternKind::ElevatedTemperature => "ELEVATED_TEMPERATURE",
        }
    }

    fn describe(self, avg: f64, event_count: usize) -> String {
        match self {
            PatternKind::TachycardiaAtRest => {
                format!("Sustained elevated HR ({avg:.1} bpm avg) over {event_count} events while at rest")
            }
            PatternKind::LowSpo2Hypoxia => {
                format!("Sustained low SpO2 ({avg:.1}% avg) over {event_count} events")
            }
            PatternKind::ElevatedTemperature => {
                format!("Sustained elevated skin temperature ({avg:.1}\u{b0}C avg) over {event_count} events")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Run {
    start_time: DateTime<Utc>,
    last_time: DateTime<Utc>,
    values: Vec<f64>,
}

impl Run {
    fn start(event: &RawEvent, value: f64) -> Self {
        Self { start_time: event.timestamp, last_time: event.timestamp, values: vec![value] }
    }

    fn extend(&mut self, event: &RawEvent, value: f64) {
        self.last_time = event.timestamp;
        self.values.push(value);
    }

    fn avg(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

struct PerUserPattern {
    run: Option<Run>,
    watermark: Option<DateTime<Utc>>,
}

impl PerUserPattern {
    fn new() -> Self {
        Self { run: None, watermark: None }
    }
}

/// Per-`(user, pattern)` state. Guarded by a single mutex since each
/// ingestion event touches at most one user's three patterns at a time and
/// the critical section is pure in-memory bookkeeping.
pub struct AnomalyDetector {
    state: Mutex<HashMap<(String, usize), PerUserPattern>>,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self { state: Mutex::new(HashMap::new()) }
    }

    /// Feeds one event through every pattern for its user. Returns any
    /// alerts closed as a result (usually zero or one, never more than the
    /// number of configured patterns).
    pub fn on_event(&self, event: &RawEvent) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let mut state = self.state.lock().unwrap();

        for (idx, kind) in PatternKind::ALL.into_iter().enumerate() {
            let key = (event.user_id.clone(), idx);
            let pattern = state.entry(key).or_insert_with(PerUserPattern::new);

            let slack = chrono::Duration::from_std(WATERMARK_SLACK).unwrap();
            if let Some(watermark) = pattern.watermark {
                if event.timestamp < watermark - slack {
                    continue; // too late, dropped for detection
                }
            }
            pattern.watermark = Some(pattern.watermark.map_or(event.timestamp, |w| w.max(event.timestamp)));

            match kind.satisfies_a(event) {
                Some(true) => {
                    let value = kind.aggregate_field(event).unwrap();
                    match &mut pattern.run {
                        Some(run) => run.extend(event, value),
                        None => pattern.run = Some(Run::start(event, value)),
                    }
                }
                _ => {
                    if let Some(run) = pattern.run.take() {
                        if run.values.len() >= kind.min_run_length() {
                            alerts.push(close_run(kind, &event.user_id, &run));
                        }
                    }
                }
            }
        }

        alerts
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn close_run(kind: PatternKind, user_id: &str, run: &Run) -> Alert {
    let avg = run.avg();
    Alert {
        alert_id: Uuid::new_v4().to_string(),
        alert_type_name: kind.alert_type_name().to_string(),
        user_id: user_id.to_string(),
        severity: kind.severity(avg),
        start_time: run.start_time,
        end_time: run.last_time,
        avg_heart_rate: avg,
        event_count: run.values.len(),
        description: kind.describe(avg, run.values.len()),
        enriched_insight: None,
        resolved: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;

    fn event_at(user: &str, secs: i64, hr: f64, activity: f64, steps: f64) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: DateTime::<Utc>::MIN_UTC + chrono::Duration::seconds(secs),
            user_id: user.to_string(),
            source: SourceId::Apple,
            source_name: "Apple HealthKit".into(),
            heart_rate: Some(hr),
            hrv_ms: None,
            spo2_percent: None,
            skin_temp_c: None,
            respiratory_rate: None,
            activity_level: Some(activity),
            steps_per_minute: Some(steps),
            calories_per_minute: None,
            sleep_quality: None,
        }
    }

    /// S1: five consecutive qualifying events then a terminator ⇒ one
    /// HIGH alert, event_count=5.
    #[test]
    fn s1_sustained_tachycardia_emits_one_high_alert() {
        let detector = AnomalyDetector::new();
        let mut alerts = Vec::new();
        for i in 0..5 {
            alerts.extend(detector.on_event(&event_at("user_001", i, 120.0, 5.0, 0.0)));
        }
        assert!(alerts.is_empty(), "no alert should fire mid-run");
        alerts.extend(detector.on_event(&event_at("user_001", 5, 80.0, 5.0, 0.0)));

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.alert_type_name, "TACHYCARDIA_AT_REST");
        assert_eq!(alert.event_count, 5);
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.start_time, DateTime::<Utc>::MIN_UTC);
    }

    /// Invariant 10: min_run-1 inputs then a terminator ⇒ no alert.
    #[test]
    fn short_run_terminated_emits_nothing() {
        let detector = AnomalyDetector::new();
        let mut alerts = Vec::new();
        for i in 0..4 {
            alerts.extend(detector.on_event(&event_at("user_002", i, 120.0, 5.0, 0.0)));
        }
        alerts.extend(detector.on_event(&event_at("user_002", 4, 80.0, 5.0, 0.0)));
        assert!(alerts.is_empty());
    }

    /// Invariant 9: exactly min_run inputs that then terminate ⇒ exactly
    /// one alert (boundary, not min_run - 1 and not min_run + 1 partials).
    #[test]
    fn exactly_min_run_then_terminate_emits_exactly_one_alert() {
        let detector = AnomalyDetector::new();
        let mut alerts = Vec::new();
        for i in 0..5 {
            alerts.extend(detector.on_event(&event_at("user_003", i, 125.0, 2.0, 1.0)));
        }
        alerts.extend(detector.on_event(&event_at("user_003", 5, 70.0, 40.0, 20.0)));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].event_count, 5);
    }

    /// Invariant 11: an out-of-order event within the 5s slack is still
    /// folded into the run; one beyond the slack is dropped for detection.
    #[test]
    fn late_event_within_slack_is_accepted_beyond_slack_is_dropped() {
        let detector = AnomalyDetector::new();
        for i in [0, 1, 2, 3] {
            detector.on_event(&event_at("user_004", i, 120.0, 5.0, 0.0));
        }
        // watermark is now 3; an event at t=1 (delay 2s) is within slack.
        let alerts = detector.on_event(&event_at("user_004", 1, 122.0, 5.0, 0.0));
        assert!(alerts.is_empty());

        // advance watermark far out, then replay a very late event.
        detector.on_event(&event_at("user_004", 100, 120.0, 5.0, 0.0));
        let alerts = detector.on_event(&event_at("user_004", 10, 120.0, 5.0, 0.0));
        assert!(alerts.is_empty(), "event more than 5s behind the watermark must be dropped, not folded in");
    }

    #[test]
    fn hypoxia_pattern_uses_its_own_threshold_and_min_run() {
        let detector = AnomalyDetector::new();
        let mut low_spo2 = |user: &str, secs: i64, spo2: f64| {
            let mut event = event_at(user, secs, 70.0, 40.0, 20.0);
            event.spo2_percent = Some(spo2);
            detector.on_event(&event)
        };
        low_spo2("user_005", 0, 91.0);
        low_spo2("user_005", 1, 89.0);
        let alerts = low_spo2("user_005", 2, 88.0);
        assert!(alerts.is_empty());
        let alerts = low_spo2("user_005", 3, 97.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type_name, "LOW_SPO2_HYPOXIA");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }
}
