// [apps/telara-core/src/ingestion/mod.rs]
//! C3 — per-source bus consumers, normalisation, and fan-out to every
//! downstream listener (fusion, storage, detector, baseline, broadcast).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use telara_event_models::{Alert, RawEvent, SourceId, SourceStats};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Everything the ingestion layer can hand downstream. Fusion, storage, the
/// detector and the baseline maintainer only care about `Vital`; the
/// broadcast hub forwards both as-is.
#[derive(Debug, Clone)]
pub enum IngestedEvent {
    Vital(RawEvent),
    Alert(Alert),
}

/// Channel capacity sized at roughly 2x the largest expected single-poll
/// burst across three sources at their fastest cadence (Apple, 500ms),
/// so dispatch latency never couples to the slowest listener.
const BUS_CAPACITY: usize = 4096;

const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const STARTUP_RETRY_ATTEMPTS: u32 = 30;
const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct SourceRegistry {
    bootstrap_servers: String,
    alerts_topic: String,
    enabled: Mutex<HashMap<SourceId, bool>>,
    stats: Mutex<HashMap<SourceId, SourceStats>>,
    bus: broadcast::Sender<IngestedEvent>,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SourceRegistry {
    pub fn new(bootstrap_servers: impl Into<String>, alerts_topic: impl Into<String>) -> Self {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        let mut enabled = HashMap::new();
        let mut stats = HashMap::new();
        for source in SourceId::ALL {
            enabled.insert(source, true);
            stats.insert(
                source,
                SourceStats { source_id: source, enabled: true, events_received: 0, last_event_time: None },
            );
        }
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            alerts_topic: alerts_topic.into(),
            enabled: Mutex::new(enabled),
            stats: Mutex::new(stats),
            bus,
            running: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn register_listener(&self) -> broadcast::Receiver<IngestedEvent> {
        self.bus.subscribe()
    }

    pub fn enable(&self, source: SourceId) {
        self.enabled.lock().unwrap().insert(source, true);
        if let Some(s) = self.stats.lock().unwrap().get_mut(&source) {
            s.enabled = true;
        }
    }

    pub fn disable(&self, source: SourceId) {
        self.enabled.lock().unwrap().insert(source, false);
        if let Some(s) = self.stats.lock().unwrap().get_mut(&source) {
            s.enabled = false;
        }
    }

    pub fn status(&self) -> Vec<SourceStats> {
        self.stats.lock().unwrap().values().cloned().collect()
    }

    /// Retries `metadata` fetch against the bootstrap servers up to 30 times
    /// at 2 s intervals before giving up; a caller treats exhaustion as the
    /// taxonomy's Fatal "bus unreachable" case.
    #[instrument(skip(self))]
    pub async fn wait_for_kafka(&self) -> anyhow::Result<()> {
        let probe: rdkafka::producer::FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_servers)
            .create()?;

        for attempt in 1..=STARTUP_RETRY_ATTEMPTS {
            match probe.client().fetch_metadata(None, Duration::from_secs(3)) {
                Ok(_) => {
                    info!("kafka reachable at {} after {attempt} attempt(s)", self.bootstrap_servers);
                    return Ok(());
                }
                Err(e) => {
                    warn!("kafka not reachable yet (attempt {attempt}/{STARTUP_RETRY_ATTEMPTS}): {e}");
                    tokio::time::sleep(STARTUP_RETRY_DELAY).await;
                }
            }
        }
        anyhow::bail!("kafka unreachable at {} after {STARTUP_RETRY_ATTEMPTS} attempts", self.bootstrap_servers)
    }

    /// Spawns one worker per source topic plus one for the alerts topic.
    #[instrument(skip(self, registry))]
    pub async fn start(registry: Arc<Self>) -> anyhow::Result<()> {
        registry.running.store(true, Ordering::SeqCst);

        let mut handles = Vec::new();
        for source in SourceId::ALL {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.run_source_worker(source).await;
            }));
        }

        let registry_for_alerts = registry.clone();
        handles.push(tokio::spawn(async move {
            registry_for_alerts.run_alerts_worker().await;
        }));

        *registry.workers.lock().unwrap() = handles;
        Ok(())
    }

    /// Signals workers to stop; they exit cooperatively within one poll
    /// timeout (bounded well under the 5 s budget).
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }

    fn consumer_for(&self, group_suffix: &str) -> anyhow::Result<StreamConsumer> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", format!("telara-api-{group_suffix}"))
            .set("auto.offset.reset", "latest")
            .set("enable.auto.commit", "true")
            .create()?;
        Ok(consumer)
    }

    async fn run_source_worker(&self, source: SourceId) {
        let consumer = match self.consumer_for(source.as_str()) {
            Ok(c) => c,
            Err(e) => {
                error!("failed to build consumer for {}: {e}", source.as_str());
                return;
            }
        };
        if let Err(e) = consumer.subscribe(&[source.topic()]) {
            error!("failed to subscribe to {}: {e}", source.topic());
            return;
        }

        info!("ingestion worker online for source={}", source.as_str());
        while self.running.load(Ordering::SeqCst) {
            match tokio::time::timeout(POLL_TIMEOUT, consumer.recv()).await {
                Ok(Ok(message)) => {
                    let Some(payload) = message.payload() else { continue };
                    match serde_json::from_slice::<RawEvent>(payload) {
                        Ok(event) => {
                            let event = event.normalise();
                            self.record_receipt(source);
                            if self.enabled.lock().unwrap().get(&source).copied().unwrap_or(true) {
                                let _ = self.bus.send(IngestedEvent::Vital(event));
                            }
                        }
                        Err(e) => {
                            debug!("dropping undecodable message on {}: {e}", source.topic());
                        }
                    }
                }
                Ok(Err(e)) => warn!("poll error on {}: {e}", source.topic()),
                Err(_timeout) => continue,
            }
        }
        info!("ingestion worker stopped for source={}", source.as_str());
    }

    async fn run_alerts_worker(&self) {
        let consumer = match self.consumer_for("alerts") {
            Ok(c) => c,
            Err(e) => {
                error!("failed to build alerts consumer: {e}");
                return;
            }
        };
        if let Err(e) = consumer.subscribe(&[self.alerts_topic.as_str()]) {
            error!("failed to subscribe to {}: {e}", self.alerts_topic);
            return;
        }

        info!("ingestion worker online for alerts topic={}", self.alerts_topic);
        while self.running.load(Ordering::SeqCst) {
            match tokio::time::timeout(POLL_TIMEOUT, consumer.recv()).await {
                Ok(Ok(message)) => {
                    let Some(payload) = message.payload() else { continue };
                    match serde_json::from_slice::<Alert>(payload) {
                        Ok(alert) => {
                            let _ = self.bus.send(IngestedEvent::Alert(alert));
                        }
                        Err(e) => debug!("dropping undecodable alert: {e}"),
                    }
                }
                Ok(Err(e)) => warn!("poll error on alerts topic: {e}"),
                Err(_timeout) => continue,
            }
        }
        info!("ingestion worker stopped for alerts topic");
    }

    fn record_receipt(&self, source: SourceId) {
        let mut stats = self.stats.lock().unwrap();
        if let Some(entry) = stats.get_mut(&source) {
            entry.events_received += 1;
            entry.last_event_time = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_source_is_reflected_in_status() {
        let registry = SourceRegistry::new("localhost:9092", "biometrics-alerts");
        registry.disable(SourceId::Oura);
        let status = registry.status();
        let oura = status.iter().find(|s| s.source_id == SourceId::Oura).unwrap();
        assert!(!oura.enabled);
    }

    #[test]
    fn all_sources_start_enabled() {
        let registry = SourceRegistry::new("localhost:9092", "biometrics-alerts");
        assert!(registry.status().iter().all(|s| s.enabled));
    }
}
