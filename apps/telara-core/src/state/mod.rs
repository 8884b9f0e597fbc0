// [apps/telara-core/src/state/mod.rs]
//! Composition root: owns every long-lived component and hands out cheap
//! `Arc` clones to whatever needs them (the dispatch loop, HTTP handlers,
//! background daemons). Nothing here does I/O on construction beyond what
//! the caller already did to obtain a connected `StoreClient`.

use std::sync::Arc;

use telara_store::{AlertRepository, BaselineRepository, StoreClient, VitalsRepository};

use crate::baseline::BaselineMaintainer;
use crate::broadcast::BroadcastHub;
use crate::config::Settings;
use crate::detector::AnomalyDetector;
use crate::fusion::{FusionTable, HotRing};
use crate::ground_truth::GroundTruthEngine;
use crate::ingestion::SourceRegistry;
use crate::query::QueryRouter;
use crate::storage::BatchBuffer;

/// Shared application state, cloned into every axum handler and background
/// task. Every field is either an `Arc` or itself cheap to clone, so `Clone`
/// is a handful of refcount bumps.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: StoreClient,
    pub vitals: Arc<VitalsRepository>,
    pub alerts: Arc<AlertRepository>,
    pub baselines_repo: Arc<BaselineRepository>,

    pub hot_ring: Arc<HotRing>,
    pub fusion_table: Arc<FusionTable>,
    pub batch_buffer: Arc<BatchBuffer>,
    pub source_registry: Arc<SourceRegistry>,
    pub detector: Arc<AnomalyDetector>,
    pub baseline: Arc<BaselineMaintainer>,
    pub broadcast_hub: Arc<BroadcastHub>,
    pub ground_truth: Arc<GroundTruthEngine>,
}

impl AppState {
    /// Wires every component from a connected store and the process
    /// settings. Called once, at startup, by `CoreKernel::ignite`.
    pub fn new(settings: Settings, store: StoreClient) -> Self {
        let vitals = Arc::new(VitalsRepository::new(store.clone()));
        let alerts = Arc::new(AlertRepository::new(store.clone()));
        let baselines_repo = Arc::new(BaselineRepository::new(store.clone()));

        let hot_ring = Arc::new(HotRing::new(settings.hot_ring_capacity()));
        let fusion_table = Arc::new(FusionTable::new(settings.freshness_window()));
        let batch_buffer = Arc::new(BatchBuffer::new());
        let source_registry =
            Arc::new(SourceRegistry::new(settings.kafka_bootstrap_servers.clone(), settings.kafka_alerts_topic.clone()));
        let detector = Arc::new(AnomalyDetector::new());
        let baseline = Arc::new(BaselineMaintainer::new());
        let broadcast_hub = Arc::new(BroadcastHub::new());
        let ground_truth = Arc::new(GroundTruthEngine::new());

        Self {
            settings: Arc::new(settings),
            store,
            vitals,
            alerts,
            baselines_repo,
            hot_ring,
            fusion_table,
            batch_buffer,
            source_registry,
            detector,
            baseline,
            broadcast_hub,
            ground_truth,
        }
    }

    /// Builds a query router borrowing this state's hot ring and vitals
    /// repository. Cheap enough to construct per-request rather than cache.
    pub fn query_router(&self) -> QueryRouter<'_> {
        QueryRouter::new(&self.hot_ring, &self.vitals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            kafka_bootstrap_servers: "localhost:9092".into(),
            kafka_alerts_topic: "biometrics-alerts".into(),
            database_path: ":memory:".into(),
            user_id: "user_001".into(),
            event_interval_ms: 1000,
            auto_start: false,
            auto_anomaly: false,
            generator_control_url: String::new(),
            port: 0,
        }
    }

    #[tokio::test]
    async fn new_wires_an_empty_hot_ring_and_enabled_sources() {
        let store = StoreClient::connect(":memory:", None).await.unwrap();
        let state = AppState::new(settings(), store);
        assert!(state.hot_ring.is_empty());
        assert!(state.source_registry.status().iter().all(|s| s.enabled));
    }
}
