// [apps/telara-core/src/analytics/recommendations.rs]
//! Priority-ordered recommendation rules driven by current vitals,
//! wellness subscores, alert counts and the hour-of-day bucket.

use chrono::{DateTime, Utc};
use telara_event_models::{Alert, AlertSeverity, RawEvent};

use super::{DayBucket, WellnessScore};

const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub priority: u8,
    pub category: &'static str,
    pub message: String,
}

/// Evaluates every rule against the current window and returns the
/// top-`DEFAULT_TOP_K` by priority (ties broken by rule declaration order).
pub fn recommend(events: &[RawEvent], alerts: &[Alert], wellness: &WellnessScore, now: DateTime<Utc>) -> Vec<Recommendation> {
    let mut candidates = Vec::new();
    let bucket = DayBucket::for_timestamp(now);
    let critical_count = alerts.iter().filter(|a| a.severity == AlertSeverity::Critical).count();

    if critical_count > 0 {
        candidates.push(Recommendation {
            priority: 100,
            category: "urgent",
            message: format!("{critical_count} critical alert(s) in this window — review immediately"),
        });
    }

    if wellness.heart_health < 60.0 {
        candidates.push(Recommendation {
            priority: 90,
            category: "cardiovascular",
            message: "Resting heart rate has been elevated; consider discussing with a clinician".to_string(),
        });
    }

    if wellness.recovery < 60.0 {
        candidates.push(Recommendation {
            priority: 85,
            category: "recovery",
            message: "HRV and SpO2 suggest incomplete recovery; prioritize a lower-intensity day".to_string(),
        });
    }

    if wellness.stability < 60.0 {
        candidates.push(Recommendation {
            priority: 70,
            category: "stability",
            message: "Heart rate has been unusually variable; a short breathing exercise may help".to_string(),
        });
    }

    if wellness.activity < 50.0 && matches!(bucket, DayBucket::Morning | DayBucket::Afternoon) {
        candidates.push(Recommendation {
            priority: 50,
            category: "activity",
            message: "Activity has been low today; a short walk would help hit your daily target".to_string(),
        });
    }

    match bucket {
        DayBucket::Night => candidates.push(Recommendation {
            priority: 40,
            category: "sleep",
            message: "It's late — winding down now supports better recovery overnight".to_string(),
        }),
        DayBucket::Morning => candidates.push(Recommendation {
            priority: 30,
            category: "hydration",
            message: "Start the day with water; overnight fluid loss affects HRV readings".to_string(),
        }),
        DayBucket::Evening => candidates.push(Recommendation {
            priority: 25,
            category: "wind_down",
            message: "Evening screen time and caffeine both suppress tonight's recovery".to_string(),
        }),
        DayBucket::Afternoon => {}
    }

    let no_recent_vitals = events.is_empty();
    if no_recent_vitals {
        candidates.push(Recommendation {
            priority: 20,
            category: "connectivity",
            message: "No recent readings from any connected source — check device connectivity".to_string(),
        });
    }

    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates.truncate(DEFAULT_TOP_K);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wellness(heart_health: f64, recovery: f64, activity: f64, stability: f64) -> WellnessScore {
        WellnessScore { overall: 0.0, heart_health, recovery, activity, stability, alert_status: 100.0 }
    }

    #[test]
    fn critical_alert_outranks_every_other_rule() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
        let alert = Alert {
            alert_id: "a1".into(),
            alert_type_name: "TACHYCARDIA_AT_REST".into(),
            user_id: "user_001".into(),
            severity: AlertSeverity::Critical,
            start_time: now,
            end_time: now,
            avg_heart_rate: 140.0,
            event_count: 5,
            description: "x".into(),
            enriched_insight: None,
            resolved: false,
        };
        let recs = recommend(&[], &[alert], &wellness(40.0, 40.0, 10.0, 40.0), now);
        assert_eq!(recs[0].category, "urgent");
    }

    #[test]
    fn output_never_exceeds_top_k() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 6, 30, 0).unwrap();
        let recs = recommend(&[], &[], &wellness(30.0, 30.0, 5.0, 30.0), now);
        assert!(recs.len() <= DEFAULT_TOP_K);
    }

    #[test]
    fn afternoon_low_activity_recommends_movement() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
        let recs = recommend(&[], &[], &wellness(100.0, 100.0, 10.0, 100.0), now);
        assert!(recs.iter().any(|r| r.category == "activity"));
    }
}
