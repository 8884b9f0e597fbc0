// [apps/telara-core/src/baseline/mod.rs]
//! C8 — per-user EMA baselines over the five metrics that support
//! deviation detection, plus the deviation check itself.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use telara_event_models::{Alert, AlertSeverity, AlertType, Baseline, RawEvent, VitalField};
use uuid::Uuid;

const ALPHA: f64 = 0.1;
const MATURE_AT: u64 = 10;

/// One deviation finding against a mature baseline, ready to become an
/// `Alert` or to be reported standalone by the analytics bundle.
#[derive(Debug, Clone)]
pub struct Deviation {
    pub metric: VitalField,
    pub current: f64,
    pub baseline_mean: f64,
    pub z_score: f64,
    pub pct_change: f64,
    pub severity: AlertSeverity,
    pub description: String,
}

/// Maintains one EMA `Baseline` per user. Guarded by a single mutex; the
/// critical section is a handful of floating-point updates, never I/O.
pub struct BaselineMaintainer {
    baselines: Mutex<HashMap<String, Baseline>>,
}

impl BaselineMaintainer {
    pub fn new() -> Self {
        Self { baselines: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, user_id: &str) -> Option<Baseline> {
        self.baselines.lock().unwrap().get(user_id).copied()
    }

    pub fn load_all(&self) -> Vec<(String, Baseline)> {
        self.baselines.lock().unwrap().iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Seeds a user's baseline from a previously persisted row (startup
    /// rehydration path); overwrites whatever is in memory.
    pub fn seed(&self, user_id: &str, baseline: Baseline) {
        self.baselines.lock().unwrap().insert(user_id.to_string(), baseline);
    }

    /// Updates the EMA for every field the event reports and returns any
    /// deviation findings computed against the *pre-update* baseline (the
    /// comparison target is "how far is this reading from what came
    /// before", not from the baseline this very event just pulled into).
    pub fn observe(&self, event: &RawEvent) -> Vec<Deviation> {
        let mut baselines = self.baselines.lock().unwrap();
        let entry = baselines.entry(event.user_id.clone()).or_insert_with(|| Baseline::fresh(Utc::now()));
        let pre_update = *entry;

        let deviations = if pre_update.is_mature() { compute_deviations(event, &pre_update) } else { Vec::new() };

        apply_ema(entry, event);
        entry.data_points += 1;
        entry.updated_at = event.timestamp;

        deviations
    }
}

impl Default for BaselineMaintainer {
    fn default() -> Self {
        Self::new()
    }
}

fn ema(mean: f64, std: f64, x: f64) -> (f64, f64) {
    let new_mean = ALPHA * x + (1.0 - ALPHA) * mean;
    let new_std = ((1.0 - ALPHA) * std * std + ALPHA * (x - new_mean).powi(2)).sqrt();
    (new_mean, new_std)
}

fn apply_ema(baseline: &mut Baseline, event: &RawEvent) {
    if let Some(hr) = event.heart_rate {
        let (m, s) = ema(baseline.mean_heart_rate, baseline.std_heart_rate, hr);
        baseline.mean_heart_rate = m;
        baseline.std_heart_rate = s;
    }
    if let Some(hrv) = event.hrv_ms {
        let (m, s) = ema(baseline.mean_hrv, baseline.std_hrv, hrv);
        baseline.mean_hrv = m;
        baseline.std_hrv = s;
    }
    if let Some(spo2) = event.spo2_percent {
        let (m, s) = ema(baseline.mean_spo2, baseline.std_spo2, spo2);
        baseline.mean_spo2 = m;
        baseline.std_spo2 = s;
    }
    if let Some(temp) = event.skin_temp_c {
        let (m, s) = ema(baseline.mean_temp, baseline.std_temp, temp);
        baseline.mean_temp = m;
        baseline.std_temp = s;
    }
    if let Some(activity) = event.activity_level {
        baseline.mean_activity = ALPHA * activity + (1.0 - ALPHA) * baseline.mean_activity;
    }
    if let Some(resp) = event.respiratory_rate {
        baseline.mean_respiratory_rate = ALPHA * resp + (1.0 - ALPHA) * baseline.mean_respiratory_rate;
    }
}

fn pct_change(current: f64, mean: f64) -> f64 {
    if mean.abs() < f64::EPSILON {
        0.0
    } else {
        (current - mean) / mean * 100.0
    }
}

fn z_score(current: f64, mean: f64, std: f64) -> f64 {
    if std.abs() < f64::EPSILON {
        0.0
    } else {
        (current - mean) / std
    }
}

fn severity_for(pct: f64, z: f64) -> AlertSeverity {
    if pct.abs() > 25.0 || z.abs() > 3.0 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

/// Checks every metric that supports a deviation alert against the given
/// (pre-update) baseline. HRV fires only on the down-side; SpO2 fires on
/// either a personal drop or an absolute value below 95; temperature
/// requires an absolute delta over 0.5 C. Every other supported metric
/// uses the generic `|%Δ|>15 or |z|>2` gate.
fn compute_deviations(event: &RawEvent, baseline: &Baseline) -> Vec<Deviation> {
    let mut out = Vec::new();

    if let Some(hr) = event.heart_rate {
        let pct = pct_change(hr, baseline.mean_heart_rate);
        let z = z_score(hr, baseline.mean_heart_rate, baseline.std_heart_rate);
        if pct.abs() > 15.0 || z.abs() > 2.0 {
            out.push(Deviation {
                metric: VitalField::HeartRate,
                current: hr,
                baseline_mean: baseline.mean_heart_rate,
                z_score: z,
                pct_change: pct,
                severity: severity_for(pct, z),
                description: format!(
                    "Heart rate {:.0} bpm is {:.0}% {} your personal average",
                    hr,
                    pct.abs(),
                    if pct > 0.0 { "above" } else { "below" }
                ),
            });
        }
    }

    if let Some(hrv) = event.hrv_ms {
        let pct = pct_change(hrv, baseline.mean_hrv);
        let z = z_score(hrv, baseline.mean_hrv, baseline.std_hrv);
        // HRV only alerts on a decline; an unusually high HRV isn't a concern.
        if pct < -15.0 || z < -2.0 {
            out.push(Deviation {
                metric: VitalField::Hrv,
                current: hrv,
                baseline_mean: baseline.mean_hrv,
                z_score: z,
                pct_change: pct,
                severity: severity_for(pct, z),
                description: format!("HRV {:.0} ms is {:.0}% below your personal average", hrv, pct.abs()),
            });
        }
    }

    if let Some(spo2) = event.spo2_percent {
        let pct = pct_change(spo2, baseline.mean_spo2);
        let z = z_score(spo2, baseline.mean_spo2, baseline.std_spo2);
        let personal_drop = pct < -15.0 || z < -2.0;
        let absolute_low = spo2 < 95.0;
        if personal_drop || absolute_low {
            out.push(Deviation {
                metric: VitalField::Spo2,
                current: spo2,
                baseline_mean: baseline.mean_spo2,
                z_score: z,
                pct_change: pct,
                severity: if spo2 < 92.0 { AlertSeverity::High } else { severity_for(pct, z) },
                description: format!("SpO2 {spo2:.0}% is below your personal average"),
            });
        }
    }

    if let Some(temp) = event.skin_temp_c {
        let delta = temp - baseline.mean_temp;
        if delta.abs() > 0.5 {
            let pct = pct_change(temp, baseline.mean_temp);
            let z = z_score(temp, baseline.mean_temp, baseline.std_temp);
            out.push(Deviation {
                metric: VitalField::SkinTempC,
                current: temp,
                baseline_mean: baseline.mean_temp,
                z_score: z,
                pct_change: pct,
                severity: if delta.abs() > 1.0 { AlertSeverity::High } else { AlertSeverity::Medium },
                description: format!("Skin temperature deviates {delta:+.1}\u{b0}C from your personal average"),
            });
        }
    }

    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}

/// Wraps a deviation finding into the shared `Alert` shape so it can be
/// persisted and broadcast alongside pattern-detector alerts.
pub fn deviation_to_alert(user_id: &str, deviation: &Deviation, now: chrono::DateTime<Utc>) -> Alert {
    Alert {
        alert_id: Uuid::new_v4().to_string(),
        alert_type_name: AlertType::Deviation(deviation.metric).wire_name(),
        user_id: user_id.to_string(),
        severity: deviation.severity,
        start_time: now,
        end_time: now,
        avg_heart_rate: deviation.current,
        event_count: 1,
        description: deviation.description.clone(),
        enriched_insight: None,
        resolved: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;

    fn event(user: &str, hr: f64) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: Utc::now(),
            user_id: user.to_string(),
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

    /// Invariant 3: after >=10 ingestions, data_points >= 10.
    #[test]
    fn baseline_matures_after_ten_observations() {
        let maintainer = BaselineMaintainer::new();
        for _ in 0..10 {
            maintainer.observe(&event("user_001", 72.0));
        }
        let baseline = maintainer.get("user_001").unwrap();
        assert!(baseline.is_mature());
        assert_eq!(baseline.data_points, 10);
    }

    #[test]
    fn immature_baseline_raises_no_deviation() {
        let maintainer = BaselineMaintainer::new();
        for _ in 0..9 {
            maintainer.observe(&event("user_002", 72.0));
        }
        let deviations = maintainer.observe(&event("user_002", 140.0));
        assert!(deviations.is_empty());
    }

    /// S3: baseline mean=78, std=4, data_points=200, current=95 -> ~21.8%
    /// deviation, severity Medium (<=25%), message mentions "95 bpm"/"22%".
    #[test]
    fn s3_deviation_matches_spec_scenario() {
        let maintainer = BaselineMaintainer::new();
        maintainer.seed(
            "user_003",
            Baseline { mean_heart_rate: 78.0, std_heart_rate: 4.0, data_points: 200, ..Baseline::fresh(Utc::now()) },
        );
        let deviations = maintainer.observe(&event("user_003", 95.0));
        assert_eq!(deviations.len(), 1);
        let d = &deviations[0];
        assert_eq!(d.metric, VitalField::HeartRate);
        assert!((d.pct_change - 21.8).abs() < 0.2, "pct_change={}", d.pct_change);
        assert_eq!(d.severity, AlertSeverity::Medium);
        assert!(d.description.contains("95 bpm"), "{}", d.description);
        assert!(d.description.contains("22%"), "{}", d.description);
    }

    #[test]
    fn hrv_deviation_only_fires_on_decline() {
        let maintainer = BaselineMaintainer::new();
        maintainer.seed(
            "user_004",
            Baseline { mean_hrv: 50.0, std_hrv: 5.0, data_points: 50, ..Baseline::fresh(Utc::now()) },
        );
        let mut rising = event("user_004", 72.0);
        rising.hrv_ms = Some(70.0);
        assert!(maintainer.observe(&rising).is_empty());

        let mut falling = event("user_004", 72.0);
        falling.hrv_ms = Some(35.0);
        let deviations = maintainer.observe(&falling);
        assert!(deviations.iter().any(|d| d.metric == VitalField::Hrv));
    }
}
