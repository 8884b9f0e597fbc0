// [apps/telara-core/src/kernel.rs]
//! C11 — lifecycle orchestrator. Owns the startup order (store, then speed
//! layer, then ingestion, then the vitals and baseline flushers), the live
//! dispatch loop that threads every incoming vital through fusion/storage/
//! detection/baseline/broadcast, and the reverse shutdown order with a
//! final flush of both persistence paths.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use telara_event_models::{Alert, RawEvent, VitalPayload};
use telara_store::StoreClient;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::config::Settings;
use crate::ingestion::{IngestedEvent, SourceRegistry};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{BaselineFlusher, BatchFlusher};

pub struct CoreKernel {
    state: AppState,
    flusher: Arc<BatchFlusher>,
    baseline_flusher: Arc<BaselineFlusher>,
}

impl CoreKernel {
    /// Connects the persistent store (which resets its schema on every
    /// connect — see the store's demo-reset design note) and wires the rest
    /// of the application state on top of it.
    #[instrument(skip(settings))]
    pub async fn ignite(settings: Settings) -> anyhow::Result<Self> {
        let store = StoreClient::connect(&settings.database_path, None)
            .await
            .context("failed to connect to the persistent store")?;

        let state = AppState::new(settings, store);
        let flusher = Arc::new(BatchFlusher::new(
            state.batch_buffer.clone(),
            state.vitals.clone(),
            state.settings.batch_size(),
            state.settings.flush_interval(),
        ));
        let baseline_flusher = Arc::new(BaselineFlusher::new(
            state.baseline.clone(),
            state.baselines_repo.clone(),
            state.settings.flush_interval(),
        ));

        Ok(Self { state, flusher, baseline_flusher })
    }

    /// A cheap clone of the shared state, for callers that want to inspect
    /// it (tests, the historical-backfill CLI path) without tearing into
    /// the kernel itself.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Runs until a shutdown signal arrives, then tears everything down in
    /// reverse order: stop ingestion, stop the dispatch loop, flush the
    /// batch buffer one last time.
    pub async fn run(self, bind_addr: SocketAddr) -> anyhow::Result<()> {
        // Invariant: the speed layer always starts empty, regardless of
        // whatever the previous process instance left behind.
        self.state.hot_ring.clear();

        if self.state.settings.auto_start {
            self.state.source_registry.wait_for_kafka().await?;
            SourceRegistry::start(self.state.source_registry.clone()).await?;
        }

        self.flusher.clone().spawn();
        self.baseline_flusher.clone().spawn();
        let dispatch_handle = self.spawn_dispatch_loop();

        let router = build_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        info!("telara-core listening on {bind_addr}");

        let serve_result = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await;

        info!("shutdown signal received, tearing down in reverse order");
        self.state.source_registry.stop().await;
        dispatch_handle.abort();
        self.baseline_flusher.stop().await;
        self.flusher.stop().await;

        serve_result.context("server error")
    }

    /// Subscribes to the ingestion bus and threads every event through the
    /// speed layer, the batch layer, the detector and the baseline
    /// maintainer, finally publishing whatever resulted to the broadcast
    /// hub.
    fn spawn_dispatch_loop(&self) -> JoinHandle<()> {
        let mut listener = self.state.source_registry.register_listener();
        let state = self.state.clone();
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(IngestedEvent::Vital(event)) => handle_vital(&state, event).await,
                    Ok(IngestedEvent::Alert(alert)) => persist_and_broadcast_alert(&state, alert).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("dispatch loop lagged by {missed} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

async fn handle_vital(state: &AppState, event: RawEvent) {
    state.hot_ring.push(event.clone());
    state.fusion_table.ingest(&event);
    state.batch_buffer.push(event.clone());

    for alert in state.detector.on_event(&event) {
        persist_and_broadcast_alert(state, alert).await;
    }
    for deviation in state.baseline.observe(&event) {
        let alert = crate::baseline::deviation_to_alert(&event.user_id, &deviation, event.timestamp);
        persist_and_broadcast_alert(state, alert).await;
    }

    let aggregated = state.fusion_table.snapshot(&event.user_id);
    state.broadcast_hub.publish_vital(VitalPayload { event, aggregated });
}

async fn persist_and_broadcast_alert(state: &AppState, alert: Alert) {
    if let Err(e) = state.alerts.batch_persist(std::slice::from_ref(&alert)).await {
        error!("failed to persist alert {}: {e}", alert.alert_id);
    }
    state.broadcast_hub.publish_alert(alert);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
