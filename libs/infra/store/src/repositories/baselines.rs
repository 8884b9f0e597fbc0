// [libs/infra/store/src/repositories/baselines.rs]
use crate::client::StoreClient;
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use telara_event_models::Baseline;

pub struct BaselineRepository {
    client: StoreClient,
}

impl BaselineRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn upsert(&self, user_id: &str, baseline: &Baseline) -> Result<(), StoreError> {
        let conn = self.client.connection()?;
        conn.execute(
            "INSERT INTO user_baselines (
                user_id, avg_heart_rate, avg_hrv, avg_spo2, avg_temp, avg_activity,
                avg_respiratory_rate, std_heart_rate, std_hrv, std_spo2, std_temp,
                data_points, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(user_id) DO UPDATE SET
                avg_heart_rate = excluded.avg_heart_rate,
                avg_hrv = excluded.avg_hrv,
                avg_spo2 = excluded.avg_spo2,
                avg_temp = excluded.avg_temp,
                avg_activity = excluded.avg_activity,
                avg_respiratory_rate = excluded.avg_respiratory_rate,
                std_heart_rate = excluded.std_heart_rate,
                std_hrv = excluded.std_hrv,
                std_spo2 = excluded.std_spo2,
                std_temp = excluded.std_temp,
                data_points = excluded.data_points,
                updated_at = excluded.updated_at",
            libsql::params![
                user_id,
                baseline.mean_heart_rate,
                baseline.mean_hrv,
                baseline.mean_spo2,
                baseline.mean_temp,
                baseline.mean_activity,
                baseline.mean_respiratory_rate,
                baseline.std_heart_rate,
                baseline.std_hrv,
                baseline.std_spo2,
                baseline.std_temp,
                baseline.data_points as i64,
                baseline.updated_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn load(&self, user_id: &str) -> Result<Option<Baseline>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query(
                "SELECT avg_heart_rate, avg_hrv, avg_spo2, avg_temp, avg_activity,
                        avg_respiratory_rate, std_heart_rate, std_hrv, std_spo2, std_temp,
                        data_points, updated_at
                 FROM user_baselines WHERE user_id = ?1",
                libsql::params![user_id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let updated_raw: String = row.get(11)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(Baseline {
            mean_heart_rate: row.get(0)?,
            mean_hrv: row.get(1)?,
            mean_spo2: row.get(2)?,
            mean_temp: row.get(3)?,
            mean_activity: row.get(4)?,
            mean_respiratory_rate: row.get(5)?,
            std_heart_rate: row.get(6)?,
            std_hrv: row.get(7)?,
            std_spo2: row.get(8)?,
            std_temp: row.get(9)?,
            data_points: row.get::<i64>(10)? as u64,
            updated_at,
        }))
    }
}
