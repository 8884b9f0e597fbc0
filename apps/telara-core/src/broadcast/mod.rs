// [apps/telara-core/src/broadcast/mod.rs]
//! C10 — per-connection fan-out. Every active connection gets its own
//! `broadcast::Receiver`; a slow consumer is evicted rather than allowed
//! to backpressure producers. Bounded replay buffers let a newly
//! connected client catch up without replaying the whole history.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use telara_event_models::{Alert, InitialStatePayload, RawEvent, ServerMessage, SourceStats};
use tokio::sync::broadcast;
use tracing::{info, warn};

const CHANNEL_CAPACITY: usize = 4096;
const VITAL_REPLAY_CAPACITY: usize = 50;
const ALERT_REPLAY_CAPACITY: usize = 20;

/// Per-send timeout; a connection that can't keep up within this window is
/// evicted rather than allowed to stall the dispatch loop.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a connection may go without a client message before the
/// server pushes an unsolicited heartbeat.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

struct ReplayBuffer {
    vitals: VecDeque<RawEvent>,
    alerts: VecDeque<Alert>,
}

impl ReplayBuffer {
    fn new() -> Self {
        Self { vitals: VecDeque::with_capacity(VITAL_REPLAY_CAPACITY), alerts: VecDeque::with_capacity(ALERT_REPLAY_CAPACITY) }
    }

    fn record_vital(&mut self, event: RawEvent) {
        if self.vitals.len() >= VITAL_REPLAY_CAPACITY {
            self.vitals.pop_front();
        }
        self.vitals.push_back(event);
    }

    fn record_alert(&mut self, alert: Alert) {
        if self.alerts.len() >= ALERT_REPLAY_CAPACITY {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert);
    }
}

/// Central fan-out hub: one broadcast channel, one bounded replay buffer.
/// Connections hold their own `broadcast::Receiver` and evict themselves
/// (see `handlers::stream`) on a failed/slow send — the hub itself never
/// tracks individual connections.
pub struct BroadcastHub {
    sender: broadcast::Sender<ServerMessage>,
    replay: Mutex<ReplayBuffer>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, replay: Mutex::new(ReplayBuffer::new()) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.sender.subscribe()
    }

    /// The `initial_state` payload a newly connected client should receive
    /// before anything from its subscription.
    pub fn initial_state(&self, source_stats: Vec<SourceStats>) -> InitialStatePayload {
        let replay = self.replay.lock().unwrap();
        InitialStatePayload {
            vitals: replay.vitals.iter().cloned().collect(),
            alerts: replay.alerts.iter().cloned().collect(),
            source_stats,
        }
    }

    pub fn publish_vital(&self, payload: telara_event_models::VitalPayload) {
        self.replay.lock().unwrap().record_vital(payload.event.clone());
        self.dispatch(ServerMessage::Vital(payload));
    }

    /// Sends the original `alert` message. `alert_enriched` is a distinct
    /// message sent later, if at all, by whatever enriches the alert —
    /// nothing in this crate calls `publish_alert_enriched` on the hot
    /// path; it exists so a caller can wire an enrichment step in later.
    pub fn publish_alert(&self, alert: Alert) {
        self.replay.lock().unwrap().record_alert(alert.clone());
        self.dispatch(ServerMessage::Alert(alert));
    }

    pub fn publish_alert_enriched(&self, alert: Alert) {
        self.dispatch(ServerMessage::AlertEnriched(alert));
    }

    fn dispatch(&self, message: ServerMessage) {
        match self.sender.send(message) {
            Ok(_subscriber_count) => {}
            Err(_) => {
                // No subscribers at all; nothing lost since nobody was listening.
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends one message to a connection's outbound sink, enforcing
/// [`SEND_TIMEOUT`]. Returns `false` if the send timed out or the sink is
/// gone, which the caller treats as "evict this connection".
pub async fn send_with_timeout<F, Fut>(send: F) -> bool
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    match tokio::time::timeout(SEND_TIMEOUT, send()).await {
        Ok(ok) => ok,
        Err(_elapsed) => {
            warn!("connection send exceeded {:?}; evicting", SEND_TIMEOUT);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telara_event_models::SourceId;

    fn vital(hr: f64) -> telara_event_models::VitalPayload {
        telara_event_models::VitalPayload {
            event: RawEvent {
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
            },
            aggregated: Vec::new(),
        }
    }

    fn alert() -> Alert {
        Alert {
            alert_id: "a1".into(),
            alert_type_name: "TACHYCARDIA_AT_REST".into(),
            user_id: "user_001".into(),
            severity: telara_event_models::AlertSeverity::High,
            start_time: Utc::now(),
            end_time: Utc::now(),
            avg_heart_rate: 120.0,
            event_count: 5,
            description: "x".into(),
            enriched_insight: None,
            resolved: false,
        }
    }

    #[test]
    fn replay_buffer_caps_at_fifty_vitals() {
        let hub = BroadcastHub::new();
        for i in 0..60 {
            hub.publish_vital(vital(70.0 + i as f64));
        }
        let state = hub.initial_state(Vec::new());
        assert_eq!(state.vitals.len(), VITAL_REPLAY_CAPACITY);
        assert_eq!(state.vitals.last().unwrap().heart_rate, Some(129.0));
    }

    #[test]
    fn replay_buffer_caps_at_twenty_alerts() {
        let hub = BroadcastHub::new();
        for _ in 0..25 {
            hub.publish_alert(alert());
        }
        let state = hub.initial_state(Vec::new());
        assert_eq!(state.alerts.len(), ALERT_REPLAY_CAPACITY);
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_timeout_reports_false_on_timeout() {
        let ok = send_with_timeout(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            true
        })
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn send_with_timeout_passes_through_quick_results() {
        let ok = send_with_timeout(|| async { true }).await;
        assert!(ok);
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let hub = BroadcastHub::new();
        hub.publish_vital(vital(70.0));
        assert_eq!(hub.subscriber_count(), 0);
    }
}
