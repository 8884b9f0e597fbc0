// [apps/telara-core/src/config.rs]
use std::time::Duration;

/// Process-wide configuration, loaded once at startup from the environment
/// (after `dotenvy::dotenv()`), with a handful of CLI overrides for local
/// runs.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "telara-core", about = "Biometrics fusion and analytics core")]
pub struct Settings {
    /// Kafka bootstrap servers, e.g. "localhost:9092".
    #[arg(long, env = "KAFKA_BOOTSTRAP_SERVERS", default_value = "localhost:9092")]
    pub kafka_bootstrap_servers: String,

    /// Topic the detector publishes closed-run alerts to.
    #[arg(long, env = "KAFKA_ALERTS_TOPIC", default_value = "biometrics-alerts")]
    pub kafka_alerts_topic: String,

    /// libsql/SQLite file path, or "remote" database URL understood by
    /// `telara_store::StoreClient::connect`.
    #[arg(long, env = "DATABASE_PATH", default_value = "telara.db")]
    pub database_path: String,

    /// Demo single-user identifier the generator/ingestion pipeline is
    /// scoped to.
    #[arg(long, env = "USER_ID", default_value = "user_001")]
    pub user_id: String,

    /// Generator cadence in milliseconds (consumed by the out-of-scope
    /// generator; retained here only because ingestion's poll interval is
    /// tuned relative to it).
    #[arg(long, env = "EVENT_INTERVAL_MS", default_value_t = 1000)]
    pub event_interval_ms: u64,

    /// Whether ingestion starts automatically on launch.
    #[arg(long, env = "AUTO_START", default_value_t = true)]
    pub auto_start: bool,

    /// Whether the ground-truth engine auto-injects anomalies for demo
    /// purposes.
    #[arg(long, env = "AUTO_ANOMALY", default_value_t = false)]
    pub auto_anomaly: bool,

    /// Upstream control-plane URL for the data generator (black box; held
    /// here only as passthrough config).
    #[arg(long, env = "GENERATOR_CONTROL_URL", default_value = "")]
    pub generator_control_url: String,

    /// HTTP bind port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl Settings {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        <Self as clap::Parser>::parse()
    }

    pub fn topic_for_source(&self, source: telara_event_models::SourceId) -> String {
        source.topic().to_string()
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(5)
    }

    pub fn batch_size(&self) -> usize {
        100
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(10)
    }

    pub fn hot_ring_capacity(&self) -> usize {
        2000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings {
            kafka_bootstrap_servers: "localhost:9092".into(),
            kafka_alerts_topic: "biometrics-alerts".into(),
            database_path: "telara.db".into(),
            user_id: "user_001".into(),
            event_interval_ms: 1000,
            auto_start: true,
            auto_anomaly: false,
            generator_control_url: String::new(),
            port: 8080,
        };
        assert_eq!(settings.batch_size(), 100);
        assert_eq!(settings.flush_interval(), Duration::from_secs(5));
        assert_eq!(settings.hot_ring_capacity(), 2000);
    }
}
