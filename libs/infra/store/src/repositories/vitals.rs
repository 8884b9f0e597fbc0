// [libs/infra/store/src/repositories/vitals.rs]
use crate::client::StoreClient;
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use telara_event_models::RawEvent;
use tracing::warn;

pub struct VitalsRepository {
    client: StoreClient,
}

impl VitalsRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Inserts a batch of events in one transaction. Duplicate `event_id`s
    /// are absorbed by the unique-constraint upsert, making re-delivery of
    /// an already-flushed batch a no-op rather than an error.
    pub async fn batch_insert(&self, events: &[RawEvent]) -> Result<usize, StoreError> {
        if events.is_empty() {
            return Ok(0);
        }

        let conn = self.client.connection()?;
        let tx = conn.transaction().await.map_err(|_| StoreError::TransactionError)?;

        for event in events {
            tx.execute(
                "INSERT INTO vitals (
                    event_id, timestamp, user_id, source,
                    heart_rate, hrv_ms, spo2_percent, skin_temp_c,
                    respiratory_rate, activity_level, steps_per_minute,
                    calories_per_minute, sleep_quality
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(event_id) DO NOTHING",
                libsql::params![
                    event.event_id.clone(),
                    event.timestamp.to_rfc3339(),
                    event.user_id.clone(),
                    event.source.as_str(),
                    event.heart_rate,
                    event.hrv_ms,
                    event.spo2_percent,
                    event.skin_temp_c,
                    event.respiratory_rate,
                    event.activity_level,
                    event.steps_per_minute,
                    event.calories_per_minute,
                    event.sleep_quality,
                ],
            )
            .await?;
        }

        tx.commit().await.map_err(|_| StoreError::TransactionError)?;
        Ok(events.len())
    }

    /// Range scan used by the query router once a window exceeds the
    /// hot-ring threshold. Indexed on `(user_id, timestamp)`.
    pub async fn range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query(
                "SELECT event_id, timestamp, user_id, source, heart_rate, hrv_ms,
                        spo2_percent, skin_temp_c, respiratory_rate, activity_level,
                        steps_per_minute, calories_per_minute, sleep_quality
                 FROM vitals
                 WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
                 ORDER BY timestamp ASC",
                libsql::params![user_id, from.to_rfc3339(), to.to_rfc3339()],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_event(&row)?);
        }
        Ok(out)
    }

    pub async fn count_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM vitals WHERE user_id = ?1 AND timestamp >= ?2",
                libsql::params![user_id, since.to_rfc3339()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }
}

fn row_to_event(row: &libsql::Row) -> Result<RawEvent, StoreError> {
    let source_raw: String = row.get(3)?;
    let source = telara_event_models::SourceId::from_str_loose(&source_raw)
        .ok_or_else(|| StoreError::MappingError(format!("unknown source {source_raw}")))?;
    let timestamp_raw: String = row.get(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            warn!("failed to parse stored timestamp: {e}");
            StoreError::MappingError(format!("bad timestamp {timestamp_raw}"))
        })?;

    Ok(RawEvent {
        event_id: row.get(0)?,
        timestamp,
        user_id: row.get(2)?,
        source,
        source_name: source.display_name().to_string(),
        heart_rate: row.get(4)?,
        hrv_ms: row.get(5)?,
        spo2_percent: row.get(6)?,
        skin_temp_c: row.get(7)?,
        respiratory_rate: row.get(8)?,
        activity_level: row.get(9)?,
        steps_per_minute: row.get(10)?,
        calories_per_minute: row.get(11)?,
        sleep_quality: row.get(12)?,
    })
}
