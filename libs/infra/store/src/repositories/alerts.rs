// [libs/infra/store/src/repositories/alerts.rs]
use crate::client::StoreClient;
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use telara_event_models::{Alert, AlertSeverity};

pub struct AlertRepository {
    client: StoreClient,
}

impl AlertRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Upserts on `alert_id` so a re-delivered alert (detector restart,
    /// at-least-once redelivery) never produces a duplicate row.
    pub async fn batch_persist(&self, alerts: &[Alert]) -> Result<usize, StoreError> {
        if alerts.is_empty() {
            return Ok(0);
        }

        let conn = self.client.connection()?;
        let tx = conn.transaction().await.map_err(|_| StoreError::TransactionError)?;

        for alert in alerts {
            tx.execute(
                "INSERT INTO alerts (
                    alert_id, timestamp, user_id, alert_type, severity,
                    description, avg_heart_rate, event_count, ai_insight, resolved
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(alert_id) DO UPDATE SET
                    ai_insight = excluded.ai_insight,
                    resolved = excluded.resolved",
                libsql::params![
                    alert.alert_id.clone(),
                    alert.start_time.to_rfc3339(),
                    alert.user_id.clone(),
                    alert.alert_type_name.clone(),
                    severity_str(alert.severity),
                    alert.description.clone(),
                    alert.avg_heart_rate,
                    alert.event_count as i64,
                    alert.enriched_insight.clone(),
                    alert.resolved as i64,
                ],
            )
            .await?;
        }

        tx.commit().await.map_err(|_| StoreError::TransactionError)?;
        Ok(alerts.len())
    }

    pub async fn range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query(
                "SELECT alert_id, timestamp, user_id, alert_type, severity, description,
                        avg_heart_rate, event_count, ai_insight, resolved
                 FROM alerts
                 WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
                 ORDER BY timestamp ASC",
                libsql::params![user_id, from.to_rfc3339(), to.to_rfc3339()],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_alert(&row)?);
        }
        Ok(out)
    }
}

fn severity_str(s: AlertSeverity) -> &'static str {
    match s {
        AlertSeverity::Low => "LOW",
        AlertSeverity::Medium => "MEDIUM",
        AlertSeverity::High => "HIGH",
        AlertSeverity::Critical => "CRITICAL",
    }
}

fn severity_from_str(s: &str) -> AlertSeverity {
    match s {
        "CRITICAL" => AlertSeverity::Critical,
        "HIGH" => AlertSeverity::High,
        "MEDIUM" => AlertSeverity::Medium,
        _ => AlertSeverity::Low,
    }
}

fn row_to_alert(row: &libsql::Row) -> Result<Alert, StoreError> {
    let start_raw: String = row.get(1)?;
    let start_time = DateTime::parse_from_rfc3339(&start_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::MappingError(format!("bad timestamp {start_raw}: {e}")))?;
    let severity_raw: String = row.get(4)?;

    Ok(Alert {
        alert_id: row.get(0)?,
        start_time,
        end_time: start_time,
        user_id: row.get(2)?,
        alert_type_name: row.get(3)?,
        severity: severity_from_str(&severity_raw),
        description: row.get(5)?,
        avg_heart_rate: row.get(6)?,
        event_count: row.get::<i64>(7)? as usize,
        enriched_insight: row.get(8)?,
        resolved: row.get::<i64>(9)? != 0,
    })
}
