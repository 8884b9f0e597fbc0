// [apps/telara-core/src/storage/historical.rs]
//! Bulk historical backfill. Bypasses `BatchBuffer` entirely — while a load
//! is in flight the buffer is paused so the live ingestion path cannot
//! interleave writes with the bulk transaction, and the buffer itself stays
//! empty for the whole operation (see S6).

use std::time::Duration;

use chrono::{TimeZone, Utc};
use telara_event_models::SourceId;
use telara_store::{StoreError, VitalsRepository};
use thiserror::Error;
use tracing::{info, instrument};

use super::BatchBuffer;
use crate::ground_truth::GroundTruthEngine;

/// Upper bound on a single historical-load call, per the concurrency model.
const MAX_LOAD_DURATION: Duration = Duration::from_secs(600);

/// Rows are written in chunks of this size rather than one gigantic
/// transaction, keeping memory bounded for multi-week backfills.
const WRITE_CHUNK: usize = 500;

#[derive(Debug, Error)]
pub enum HistoricalLoadError {
    #[error("historical load exceeded the {0:?} time budget")]
    TimedOut(Duration),
    #[error("persistence failure during historical load: {0}")]
    Store(#[from] StoreError),
}

/// Synthesises `days` of history at `events_per_hour_per_source` events per
/// source per hour, ending at `now`, and inserts it directly into the
/// persistent store. Returns the number of rows written.
#[instrument(skip(ground_truth, repository, buffer))]
pub async fn bulk_load(
    ground_truth: &GroundTruthEngine,
    repository: &VitalsRepository,
    buffer: &BatchBuffer,
    user_id: &str,
    days: i64,
    events_per_hour_per_source: u32,
) -> Result<usize, HistoricalLoadError> {
    buffer.pause();
    let result = tokio::time::timeout(
        MAX_LOAD_DURATION,
        run_backfill(ground_truth, repository, user_id, days, events_per_hour_per_source),
    )
    .await;
    buffer.resume();

    match result {
        Ok(inner) => inner,
        Err(_elapsed) => Err(HistoricalLoadError::TimedOut(MAX_LOAD_DURATION)),
    }
}

async fn run_backfill(
    ground_truth: &GroundTruthEngine,
    repository: &VitalsRepository,
    user_id: &str,
    days: i64,
    events_per_hour_per_source: u32,
) -> Result<usize, HistoricalLoadError> {
    let now = Utc::now();
    let total_hours = days * 24;
    let mut chunk = Vec::with_capacity(WRITE_CHUNK);
    let mut written = 0usize;

    for hour_offset in (0..total_hours).rev() {
        let hour_start = now - chrono::Duration::hours(hour_offset);
        for source in SourceId::ALL {
            for sample in 0..events_per_hour_per_source {
                let offset_minutes = (sample as i64 * 60) / events_per_hour_per_source.max(1) as i64;
                let timestamp = hour_start + chrono::Duration::minutes(offset_minutes);
                let state = ground_truth.state_at(user_id, timestamp);
                let event = GroundTruthEngine::project(state, user_id, source, clamp_not_future(timestamp, now));
                chunk.push(event);
            }
        }
        if chunk.len() >= WRITE_CHUNK {
            written += repository.batch_insert(&chunk).await?;
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        written += repository.batch_insert(&chunk).await?;
    }

    info!("historical backfill wrote {written} rows for user={user_id} over {days} day(s)");
    Ok(written)
}

fn clamp_not_future(t: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    if t > now {
        now
    } else {
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground_truth::GroundTruthEngine;
    use telara_store::StoreClient;

    #[tokio::test]
    async fn bulk_load_pauses_and_resumes_the_buffer_and_leaves_it_empty() {
        let store = StoreClient::connect(":memory:", None).await.unwrap();
        let repository = VitalsRepository::new(store);
        let ground_truth = GroundTruthEngine::new();
        let buffer = BatchBuffer::new();

        // One day at 2 events/hour/source = 24 * 3 * 2 = 144 rows.
        let written = bulk_load(&ground_truth, &repository, &buffer, "user_001", 1, 2).await.unwrap();

        assert_eq!(written, 144);
        assert!(buffer.is_empty());
        assert!(!buffer.is_paused());

        let since = Utc.timestamp_opt(0, 0).unwrap();
        let count = repository.count_since("user_001", since).await.unwrap();
        assert_eq!(count, 144);
    }
}
