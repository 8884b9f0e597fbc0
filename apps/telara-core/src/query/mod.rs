// [apps/telara-core/src/query/mod.rs]
//! C6 — routes reads by window size: small windows stay in the HotRing
//! (bounded RAM latency), larger ones hit the persistent store's indexed
//! range scan. The two tiers are never merged; see the lambda-tier
//! boundary design note.

use std::time::Duration;

use chrono::{DateTime, Utc};
use telara_event_models::RawEvent;
use telara_store::{StoreError, VitalsRepository};

use crate::fusion::HotRing;

/// Windows of `minutes <= HOT_RING_WINDOW_MINUTES` never touch the
/// persistent store.
const HOT_RING_WINDOW_MINUTES: i64 = 30;

/// `get_stats` windows of `hours <= HOT_RING_STATS_HOURS` are served from
/// the HotRing aggregate rather than a persistent-store aggregate.
const HOT_RING_STATS_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy)]
pub struct WindowStats {
    pub count: usize,
    pub avg_heart_rate: Option<f64>,
    pub min_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
}

/// Reads vitals for a user, choosing the hot or batch tier purely by
/// `minutes` — the caller never sees which tier served the request.
pub struct QueryRouter<'a> {
    hot_ring: &'a HotRing,
    vitals: &'a VitalsRepository,
}

impl<'a> QueryRouter<'a> {
    pub fn new(hot_ring: &'a HotRing, vitals: &'a VitalsRepository) -> Self {
        Self { hot_ring, vitals }
    }

    /// Window scan over the last `minutes`, newest first.
    pub async fn window(&self, user_id: &str, minutes: i64, now: DateTime<Utc>) -> Result<Vec<RawEvent>, StoreError> {
        let since = now - chrono::Duration::minutes(minutes);
        if minutes <= HOT_RING_WINDOW_MINUTES {
            Ok(self.hot_ring.since(since).into_iter().filter(|e| e.user_id == user_id).collect())
        } else {
            let mut events = self.vitals.range(user_id, since, now).await?;
            events.reverse(); // store returns ascending; router contract is newest-first
            Ok(events)
        }
    }

    /// Always served from the HotRing regardless of age — it is, by
    /// definition, whatever the speed layer has most recently seen.
    pub fn latest_reading(&self, user_id: &str) -> Option<RawEvent> {
        self.hot_ring.latest_for_user(user_id)
    }

    /// Aggregate heart-rate stats over the last `hours`.
    pub async fn stats(&self, user_id: &str, hours: i64, now: DateTime<Utc>) -> Result<WindowStats, StoreError> {
        let since = now - chrono::Duration::hours(hours);
        let heart_rates: Vec<f64> = if hours <= HOT_RING_STATS_HOURS {
            self.hot_ring
                .since(since)
                .into_iter()
                .filter(|e| e.user_id == user_id)
                .filter_map(|e| e.heart_rate)
                .collect()
        } else {
            self.vitals.range(user_id, since, now).await?.into_iter().filter_map(|e| e.heart_rate).collect()
        };

        Ok(aggregate(&heart_rates))
    }
}

fn aggregate(values: &[f64]) -> WindowStats {
    if values.is_empty() {
        return WindowStats { count: 0, avg_heart_rate: None, min_heart_rate: None, max_heart_rate: None };
    }
    let sum: f64 = values.iter().sum();
    WindowStats {
        count: values.len(),
        avg_heart_rate: Some(sum / values.len() as f64),
        min_heart_rate: values.iter().cloned().fold(f64::INFINITY, f64::min).into(),
        max_heart_rate: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max).into(),
    }
}

/// Query latency budget referenced by S5; not enforced here (that's an
/// end-to-end property of the deployed binary) but kept as the named
/// constant the concrete scenario cites.
pub const HOT_PATH_P99_BUDGET: Duration = Duration::from_millis(5);

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;
    use telara_store::StoreClient;

    fn event(user: &str, hr: f64, ts: DateTime<Utc>) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: ts,
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

    /// Invariant 4: minutes<=30 served only from the HotRing.
    #[tokio::test]
    async fn small_window_never_touches_the_store() {
        let now = Utc::now();
        let hot_ring = HotRing::new(2000);
        hot_ring.push(event("user_001", 72.0, now));

        let store = StoreClient::connect(":memory:", None).await.unwrap();
        let vitals = VitalsRepository::new(store);
        // Deliberately nothing persisted; if the router touched the store
        // this would still return empty, but HotRing has the one event.
        let router = QueryRouter::new(&hot_ring, &vitals);
        let results = router.window("user_001", 5, now).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    /// Invariant 4 (store side): minutes>30 hits only the persistent store.
    #[tokio::test]
    async fn large_window_reads_from_the_store_even_if_hot_ring_has_data() {
        let now = Utc::now();
        let hot_ring = HotRing::new(2000);
        hot_ring.push(event("user_001", 72.0, now));

        let store = StoreClient::connect(":memory:", None).await.unwrap();
        let vitals = VitalsRepository::new(store);
        vitals.batch_insert(&[event("user_001", 65.0, now - chrono::Duration::hours(2))]).await.unwrap();

        let router = QueryRouter::new(&hot_ring, &vitals);
        let results = router.window("user_001", 180, now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].heart_rate, Some(65.0));
    }

    #[test]
    fn aggregate_of_empty_series_reports_zero_count() {
        let stats = aggregate(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.avg_heart_rate.is_none());
    }
}
