// [apps/telara-core/src/ground_truth/mod.rs]
//! C1 — evolves one consistent physiological state per user and projects
//! device-specific observations from it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Timelike, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use telara_event_models::{PhysiologicalState, SourceId, VitalField};

mod profile;

/// Injectable anomaly catalog. Each kind biases a subset of fields toward a
/// named pattern; ranges are chosen so a sustained injection reliably trips
/// the corresponding detector pattern (C7) within its `min_run_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    TachycardiaAtRest,
    Hypoxia,
    FeverOnset,
    BurnoutStress,
    Dehydration,
}

impl AnomalyKind {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "tachycardia_at_rest" | "tachycardia" => Some(Self::TachycardiaAtRest),
            "hypoxia" => Some(Self::Hypoxia),
            "fever_onset" | "fever" => Some(Self::FeverOnset),
            "burnout_stress" | "burnout" | "stress" => Some(Self::BurnoutStress),
            "dehydration" => Some(Self::Dehydration),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TachycardiaAtRest => "tachycardia_at_rest",
            Self::Hypoxia => "hypoxia",
            Self::FeverOnset => "fever_onset",
            Self::BurnoutStress => "burnout_stress",
            Self::Dehydration => "dehydration",
        }
    }

    /// `(field, target_low, target_high)` overrides applied on top of the
    /// circadian-adjusted target while the overlay is active.
    fn overrides(self) -> &'static [(VitalField, f64, f64)] {
        match self {
            Self::TachycardiaAtRest => &[
                (VitalField::HeartRate, 118.0, 135.0),
                (VitalField::ActivityLevel, 2.0, 8.0),
                (VitalField::StepsPerMinute, 0.0, 2.0),
            ],
            Self::Hypoxia => &[(VitalField::Spo2, 86.0, 92.0)],
            Self::FeverOnset => &[(VitalField::SkinTempC, 38.2, 39.1)],
            Self::BurnoutStress => &[
                (VitalField::HeartRate, 90.0, 105.0),
                (VitalField::Hrv, 15.0, 25.0),
            ],
            Self::Dehydration => &[
                (VitalField::HeartRate, 85.0, 100.0),
                (VitalField::Hrv, 20.0, 30.0),
                (VitalField::ActivityLevel, 40.0, 60.0),
            ],
        }
    }
}

#[derive(Debug, Clone)]
struct AnomalyOverlay {
    kind: AnomalyKind,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct AnomalyStatus {
    pub active: bool,
    pub kind: Option<AnomalyKind>,
    pub remaining_s: u64,
}

struct UserState {
    current: PhysiologicalState,
    baseline_offsets: [f64; 9],
    last_advanced: Instant,
    overlay: Option<AnomalyOverlay>,
}

impl UserState {
    fn new_at_now() -> Self {
        let mut rng = rand::thread_rng();
        let mut offsets = [0.0f64; 9];
        for (field, offset) in VitalField::ALL.iter().zip(offsets.iter_mut()) {
            let spread = profile::baseline_spread(*field);
            *offset = rng.gen_range(-spread..=spread);
        }
        Self {
            current: profile::base_state(),
            baseline_offsets: offsets,
            last_advanced: Instant::now(),
            overlay: None,
        }
    }

    fn baseline_offset(&self, field: VitalField) -> f64 {
        self.baseline_offsets[field_index(field)]
    }
}

fn field_index(field: VitalField) -> usize {
    VitalField::ALL.iter().position(|f| *f == field).unwrap()
}

/// Per-user singleton registry of evolving physiology. Lazily creates a
/// user's state on first demand; guarded by a single mutex since updates are
/// cheap and hold the lock only for the duration of one evolution step.
pub struct GroundTruthEngine {
    users: Mutex<HashMap<String, UserState>>,
}

impl GroundTruthEngine {
    pub fn new() -> Self {
        Self { users: Mutex::new(HashMap::new()) }
    }

    /// Advances the user's state by the wall-clock delta since the previous
    /// call (clamped to 5 s so a long quiescent gap does not teleport the
    /// signal) and returns the resulting snapshot.
    pub fn current_state(&self, user_id: &str) -> PhysiologicalState {
        let mut users = self.users.lock().unwrap();
        let entry = users.entry(user_id.to_string()).or_insert_with(UserState::new_at_now);

        let now = Instant::now();
        let elapsed = now.duration_since(entry.last_advanced).min(Duration::from_secs(5));
        entry.last_advanced = now;

        if let Some(overlay) = &entry.overlay {
            if now >= overlay.expires_at {
                entry.overlay = None;
            }
        }

        let dt = elapsed.as_secs_f64().max(0.001);
        let overlay_kind = entry.overlay.as_ref().map(|o| o.kind);
        let baseline_offsets = entry.baseline_offsets;
        let hour = Utc::now().hour();

        entry.current = evolve(entry.current, dt, hour, &baseline_offsets, overlay_kind);
        entry.current
    }

    /// Synthesises a plausible snapshot for an arbitrary past/future instant
    /// using circadian adjustments only; no side effects on live state. Used
    /// for bulk historical backfill (S6).
    pub fn state_at(&self, user_id: &str, t: DateTime<Utc>) -> PhysiologicalState {
        let mut users = self.users.lock().unwrap();
        let entry = users.entry(user_id.to_string()).or_insert_with(UserState::new_at_now);
        let baseline_offsets = entry.baseline_offsets;
        profile::target_state(t.hour(), &baseline_offsets, None)
    }

    pub fn inject_anomaly(&self, user_id: &str, kind: AnomalyKind, duration_s: u64) {
        let mut users = self.users.lock().unwrap();
        let entry = users.entry(user_id.to_string()).or_insert_with(UserState::new_at_now);
        entry.overlay = Some(AnomalyOverlay {
            kind,
            expires_at: Instant::now() + Duration::from_secs(duration_s),
        });
    }

    pub fn anomaly_status(&self, user_id: &str) -> AnomalyStatus {
        let users = self.users.lock().unwrap();
        match users.get(user_id).and_then(|u| u.overlay.as_ref()) {
            Some(overlay) => {
                let remaining = overlay
                    .expires_at
                    .saturating_duration_since(Instant::now())
                    .as_secs();
                AnomalyStatus { active: true, kind: Some(overlay.kind), remaining_s: remaining }
            }
            None => AnomalyStatus { active: false, kind: None, remaining_s: 0 },
        }
    }

    /// Projects the user's current ground truth onto a source's profile,
    /// adding per-field observation noise and rounding per field. Fields the
    /// source doesn't report are omitted (sparse map, never zero-filled).
    pub fn observe(&self, user_id: &str, source: SourceId) -> telara_event_models::RawEvent {
        let state = self.current_state(user_id);
        Self::project(state, user_id, source, Utc::now())
    }

    /// Projects an arbitrary physiological snapshot onto a source's profile
    /// at a given timestamp. Shared by `observe` (live ingestion) and the
    /// historical backfill loader, which synthesises events from
    /// `state_at` snapshots rather than the live state.
    pub fn project(
        state: PhysiologicalState,
        user_id: &str,
        source: SourceId,
        timestamp: DateTime<Utc>,
    ) -> telara_event_models::RawEvent {
        let profile = telara_event_models::source::profile_for(source);
        let mut rng = rand::thread_rng();

        let mut event = telara_event_models::RawEvent {
            event_id: telara_event_models::RawEvent::new_id(),
            timestamp,
            user_id: user_id.to_string(),
            source,
            source_name: source.display_name().to_string(),
            heart_rate: None,
            hrv_ms: None,
            spo2_percent: None,
            skin_temp_c: None,
            respiratory_rate: None,
            activity_level: None,
            steps_per_minute: None,
            calories_per_minute: None,
            sleep_quality: None,
        };

        for field in profile.supported_fields {
            let Some(sigma) = profile.noise_sigma(*field) else { continue };
            let truth = state.get(*field);
            let observed = if sigma > 0.0 {
                let normal = Normal::new(0.0, sigma).unwrap();
                truth + normal.sample(&mut rng)
            } else {
                truth
            };
            let rounded = profile::round_for_field(*field, observed);
            profile::set_field(&mut event, *field, rounded);
        }

        event
    }
}

impl Default for GroundTruthEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn evolve(
    current: PhysiologicalState,
    dt: f64,
    hour: u32,
    baseline_offsets: &[f64; 9],
    overlay: Option<AnomalyKind>,
) -> PhysiologicalState {
    const K: f64 = 0.1;
    let target = profile::target_state(hour, baseline_offsets, overlay);
    let mut rng = rand::thread_rng();

    let mut next = current;
    for field in VitalField::ALL {
        let x = current.get(field);
        let sigma = profile::evolution_sigma(field);
        let noise = if sigma > 0.0 {
            let normal = Normal::new(0.0, sigma * dt.sqrt()).unwrap();
            normal.sample(&mut rng)
        } else {
            0.0
        };
        let stepped = x + K * (target.get(field) - x) * dt + noise;
        let clamped = profile::clamp_field(field, stepped);
        profile::set_field_state(&mut next, field, clamped);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_state_stays_within_physiological_range() {
        let engine = GroundTruthEngine::new();
        for _ in 0..20 {
            let s = engine.current_state("user_a");
            assert!(s.heart_rate >= 40.0 && s.heart_rate <= 180.0);
            assert!(s.spo2_percent >= 80.0 && s.spo2_percent <= 100.0);
        }
    }

    #[test]
    fn injected_tachycardia_pulls_heart_rate_up() {
        let engine = GroundTruthEngine::new();
        engine.current_state("user_b");
        engine.inject_anomaly("user_b", AnomalyKind::TachycardiaAtRest, 30);
        let mut last = 0.0;
        for _ in 0..50 {
            last = engine.current_state("user_b").heart_rate;
        }
        assert!(last > 95.0, "expected elevated heart rate, got {last}");
    }

    #[test]
    fn observe_omits_unsupported_fields() {
        let engine = GroundTruthEngine::new();
        let event = engine.observe("user_c", SourceId::Google);
        assert!(event.spo2_percent.is_none());
        assert!(event.skin_temp_c.is_none());
        assert!(event.heart_rate.is_some());
    }

    #[test]
    fn anomaly_status_reports_remaining_time() {
        let engine = GroundTruthEngine::new();
        engine.inject_anomaly("user_d", AnomalyKind::Hypoxia, 10);
        let status = engine.anomaly_status("user_d");
        assert!(status.active);
        assert_eq!(status.kind, Some(AnomalyKind::Hypoxia));
        assert!(status.remaining_s <= 10);
    }

    #[test]
    fn unknown_anomaly_kind_is_ignored_not_fatal() {
        assert!(AnomalyKind::from_str_loose("not_a_real_pattern").is_none());
    }
}
