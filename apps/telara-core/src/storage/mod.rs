// [apps/telara-core/src/storage/mod.rs]
//! C5 — the batch layer: a bounded write-behind buffer drained on an
//! interval into the persistent store, a sibling flusher that snapshots
//! baseline aggregates on the same cadence, plus the bulk historical
//! loader that bypasses both.

mod historical;

pub use historical::{bulk_load, HistoricalLoadError};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use telara_event_models::RawEvent;
use telara_store::{BaselineRepository, VitalsRepository};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::baseline::BaselineMaintainer;

/// Write-behind buffer awaiting persistence. `pause`/`resume` gate both
/// enqueue and flush so a bulk historical load (which writes directly to
/// the store) never races with the live ingestion path.
pub struct BatchBuffer {
    paused: AtomicBool,
    queue: Mutex<VecDeque<RawEvent>>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self { paused: AtomicBool::new(false), queue: Mutex::new(VecDeque::new()) }
    }

    /// Enqueues an event unless paused, in which case it is dropped from
    /// this path (the caller — the live ingestion dispatch loop — still has
    /// the event in the hot ring and every other listener).
    pub fn push(&self, event: RawEvent) {
        if self.is_paused() {
            return;
        }
        self.queue.lock().unwrap().push_back(event);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain_up_to(&self, n: usize) -> Vec<RawEvent> {
        let mut queue = self.queue.lock().unwrap();
        let take = n.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Re-prefixes a failed batch at the head of the queue so the next
    /// flush attempt retries it first, ahead of anything enqueued since.
    fn requeue_front(&self, mut batch: Vec<RawEvent>) {
        let mut queue = self.queue.lock().unwrap();
        for event in batch.drain(..).rev() {
            queue.push_front(event);
        }
    }
}

impl Default for BatchBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains the buffer on a fixed interval and bulk-inserts into the
/// persistent store. A failed insert re-prefixes the whole batch rather
/// than dropping it (simple at-least-once; the store's unique constraint
/// on `event_id` absorbs any resulting duplicates).
pub struct BatchFlusher {
    buffer: Arc<BatchBuffer>,
    repository: Arc<VitalsRepository>,
    batch_size: usize,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl BatchFlusher {
    pub fn new(
        buffer: Arc<BatchBuffer>,
        repository: Arc<VitalsRepository>,
        batch_size: usize,
        interval: Duration,
    ) -> Self {
        Self { buffer, repository, batch_size, interval, running: Arc::new(AtomicBool::new(false)) }
    }

    /// Spawns the periodic flush loop. The returned handle resolves once
    /// `stop` has signalled the loop and it has exited.
    #[instrument(skip(self))]
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let flusher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flusher.interval);
            ticker.tick().await; // first tick fires immediately; skip it
            info!("batch flusher online (interval={:?}, batch_size={})", flusher.interval, flusher.batch_size);
            while flusher.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                flusher.flush_once().await;
            }
            info!("batch flusher stopped");
        })
    }

    /// Drains up to `batch_size` events and persists them in one
    /// transaction. A no-op while paused. Returns the number persisted.
    pub async fn flush_once(&self) -> usize {
        if self.buffer.is_paused() {
            return 0;
        }
        let batch = self.buffer.drain_up_to(self.batch_size);
        if batch.is_empty() {
            return 0;
        }
        match self.repository.batch_insert(&batch).await {
            Ok(count) => count,
            Err(e) => {
                warn!("batch flush failed, re-queuing {} events: {e}", batch.len());
                self.buffer.requeue_front(batch);
                0
            }
        }
    }

    /// Signals the loop to exit and performs one last flush, draining
    /// whatever accumulated since the final scheduled tick.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let flushed = self.flush_once().await;
        if flushed > 0 {
            info!("final flush persisted {flushed} events");
        }
    }
}

/// Snapshots every in-memory baseline on a fixed interval and upserts it
/// into `user_baselines`. Unlike `BatchFlusher` there is no queue to drain —
/// each tick persists the maintainer's current aggregates in full, so the
/// store always reflects the baseline as of its last tick rather than an
/// append-only log. Honors the same single-writer-via-flusher discipline
/// as the vitals batch layer.
pub struct BaselineFlusher {
    maintainer: Arc<BaselineMaintainer>,
    repository: Arc<BaselineRepository>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl BaselineFlusher {
    pub fn new(maintainer: Arc<BaselineMaintainer>, repository: Arc<BaselineRepository>, interval: Duration) -> Self {
        Self { maintainer, repository, interval, running: Arc::new(AtomicBool::new(false)) }
    }

    #[instrument(skip(self))]
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let flusher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flusher.interval);
            ticker.tick().await; // first tick fires immediately; skip it
            info!("baseline flusher online (interval={:?})", flusher.interval);
            while flusher.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                flusher.flush_once().await;
            }
            info!("baseline flusher stopped");
        })
    }

    /// Persists every user's current baseline. Per-user upserts are
    /// independent, so one failure doesn't block the rest of the snapshot.
    pub async fn flush_once(&self) -> usize {
        let mut persisted = 0;
        for (user_id, baseline) in self.maintainer.load_all() {
            match self.repository.upsert(&user_id, &baseline).await {
                Ok(()) => persisted += 1,
                Err(e) => error!("failed to persist baseline for user={user_id}: {e}"),
            }
        }
        persisted
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let flushed = self.flush_once().await;
        if flushed > 0 {
            info!("final baseline flush persisted {flushed} row(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telara_event_models::SourceId;

    fn event(n: i64) -> RawEvent {
        RawEvent {
            event_id: RawEvent::new_id(),
            timestamp: chrono::Utc::now(),
            user_id: "user_001".into(),
            source: SourceId::Apple,
            source_name: "Apple HealthKit".into(),
            heart_rate: Some(70.0 + n as f64),
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
    fn paused_buffer_drops_pushes() {
        let buffer = BatchBuffer::new();
        buffer.pause();
        buffer.push(event(1));
        assert!(buffer.is_empty());
        buffer.resume();
        buffer.push(event(2));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn drain_up_to_respects_capacity() {
        let buffer = BatchBuffer::new();
        for i in 0..10 {
            buffer.push(event(i));
        }
        let batch = buffer.drain_up_to(4);
        assert_eq!(batch.len(), 4);
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn requeue_front_preserves_order_ahead_of_newer_entries() {
        let buffer = BatchBuffer::new();
        buffer.push(event(10));
        let failed_batch = buffer.drain_up_to(1);
        buffer.push(event(20));
        buffer.requeue_front(failed_batch);

        let remaining = buffer.drain_up_to(2);
        assert_eq!(remaining[0].heart_rate, Some(80.0));
        assert_eq!(remaining[1].heart_rate, Some(90.0));
    }

    #[tokio::test]
    async fn baseline_flusher_persists_every_seeded_user() {
        use telara_store::{BaselineRepository, StoreClient};

        let store = StoreClient::connect(":memory:", None).await.unwrap();
        let repository = Arc::new(BaselineRepository::new(store));
        let maintainer = Arc::new(BaselineMaintainer::new());
        maintainer.observe(&event(0));
        maintainer.observe(&event(1));

        let flusher = BaselineFlusher::new(maintainer.clone(), repository.clone(), Duration::from_secs(5));
        let persisted = flusher.flush_once().await;

        assert_eq!(persisted, 1);
        let loaded = repository.load("user_001").await.unwrap().expect("baseline row persisted");
        assert_eq!(loaded.data_points, maintainer.get("user_001").unwrap().data_points);
    }
}
