// [apps/telara-core/src/fusion/mod.rs]
//! C4 — the speed layer: an append-only hot ring over all events, and a
//! per-user, per-metric fusion table that always serves the newest fresh
//! reading across sources.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use telara_event_models::{ContributingSource, FusedMetric, RawEvent, SourceId, VitalField};

/// Append-only ring of the last `capacity` events across all sources and
/// users. Newest at the tail; `newest_first` iterates tail-to-head.
pub struct HotRing {
    capacity: usize,
    buffer: Mutex<VecDeque<RawEvent>>,
}

impl HotRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, buffer: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn push(&self, event: RawEvent) {
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    pub fn newest_first(&self) -> Vec<RawEvent> {
        self.buffer.lock().unwrap().iter().rev().cloned().collect()
    }

    /// Events with `timestamp >= since`, newest first. Used by the query
    /// router for `minutes <= 30` windows.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<RawEvent> {
        self.buffer
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn latest_for_user(&self, user_id: &str) -> Option<RawEvent> {
        self.buffer.lock().unwrap().iter().rev().find(|e| e.user_id == user_id).cloned()
    }

    pub fn clear(&self) {
        self.buffer.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy)]
struct Reading {
    value: f64,
    source: SourceId,
    timestamp: DateTime<Utc>,
}

/// Latest-per-source-per-metric table. A metric is reported only if at
/// least one contributing reading is within `freshness_window`; stale
/// metrics are omitted entirely rather than served last-known.
pub struct FusionTable {
    freshness_window: Duration,
    entries: Mutex<HashMap<(String, VitalField), Vec<Reading>>>,
}

impl FusionTable {
    pub fn new(freshness_window: Duration) -> Self {
        Self { freshness_window, entries: Mutex::new(HashMap::new()) }
    }

    pub fn ingest(&self, event: &RawEvent) {
        let mut entries = self.entries.lock().unwrap();
        for field in VitalField::ALL {
            let Some(value) = event.get(field) else { continue };
            let key = (event.user_id.clone(), field);
            let readings = entries.entry(key).or_default();
            readings.retain(|r| r.source != event.source);
            readings.push(Reading { value, source: event.source, timestamp: event.timestamp });
        }
    }

    /// The fused view for a user: one `FusedMetric` per field with at least
    /// one fresh contributor, newest contributor first.
    pub fn snapshot(&self, user_id: &str) -> Vec<FusedMetric> {
        let now = Utc::now();
        let entries = self.entries.lock().unwrap();
        let mut out = Vec::new();

        for field in VitalField::ALL {
            let Some(readings) = entries.get(&(user_id.to_string(), field)) else { continue };
            let mut fresh: Vec<&Reading> = readings
                .iter()
                .filter(|r| now.signed_duration_since(r.timestamp).num_milliseconds()
                    <= self.freshness_window.as_millis() as i64)
                .collect();
            if fresh.is_empty() {
                continue;
            }
            fresh.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

            let best = fresh[0];
            let contributing_sources = fresh
                .iter()
                .map(|r| ContributingSource {
                    source: r.source,
                    value: r.value,
                    age_ms: now.signed_duration_since(r.timestamp).num_milliseconds(),
                })
                .collect();

            out.push(FusedMetric {
                metric: field,
                value: best.value,
                contributing_sources,
                best_source: best.source,
                best_age_ms: now.signed_duration_since(best.timestamp).num_milliseconds(),
                count: fresh.len(),
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use telara_event_models::SourceId;

    fn event(user: &str, source: SourceId, hr: f64) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: Utc::now(),
            user_id: user.to_string(),
            source,
            source_name: source.display_name().to_string(),
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
    fn hot_ring_evicts_oldest_past_capacity() {
        let ring = HotRing::new(3);
        for i in 0..5 {
            ring.push(event("u1", SourceId::Apple, i as f64));
        }
        assert_eq!(ring.len(), 3);
        let newest = ring.newest_first();
        assert_eq!(newest[0].heart_rate, Some(4.0));
    }

    #[test]
    fn fusion_table_prefers_newest_fresh_reading() {
        let table = FusionTable::new(Duration::from_secs(10));
        table.ingest(&event("u2", SourceId::Apple, 73.0));
        sleep(std::time::Duration::from_millis(5));
        table.ingest(&event("u2", SourceId::Google, 75.0));

        let snapshot = table.snapshot("u2");
        let hr = snapshot.iter().find(|m| m.metric == VitalField::HeartRate).unwrap();
        assert_eq!(hr.value, 75.0);
        assert_eq!(hr.best_source, SourceId::Google);
        assert_eq!(hr.count, 2);
    }

    #[test]
    fn fusion_table_omits_metric_with_no_fresh_reading() {
        let table = FusionTable::new(Duration::from_millis(0));
        table.ingest(&event("u3", SourceId::Apple, 73.0));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let snapshot = table.snapshot("u3");
        assert!(snapshot.is_empty());
    }
}
