// [libs/infra/store/src/schema.rs]
use libsql::Connection;

/// Tables dropped and recreated on every process start. The store is a
/// demo-reset design: fresh tables each launch, not a durable system of
/// record across restarts.
const TABLES: &[(&str, &str)] = &[
    (
        "vitals",
        "CREATE TABLE vitals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            heart_rate REAL,
            hrv_ms REAL,
            spo2_percent REAL,
            skin_temp_c REAL,
            respiratory_rate REAL,
            activity_level REAL,
            steps_per_minute REAL,
            calories_per_minute REAL,
            sleep_quality REAL,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "alerts",
        "CREATE TABLE alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alert_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            user_id TEXT NOT NULL,
            alert_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            description TEXT NOT NULL,
            avg_heart_rate REAL,
            event_count INTEGER NOT NULL,
            ai_insight TEXT,
            resolved INTEGER DEFAULT 0,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
    ),
    (
        "user_baselines",
        "CREATE TABLE user_baselines (
            user_id TEXT PRIMARY KEY,
            avg_heart_rate REAL,
            avg_hrv REAL,
            avg_spo2 REAL,
            avg_temp REAL,
            avg_activity REAL,
            avg_respiratory_rate REAL,
            std_heart_rate REAL DEFAULT 0,
            std_hrv REAL DEFAULT 0,
            std_spo2 REAL DEFAULT 0,
            std_temp REAL DEFAULT 0,
            data_points INTEGER DEFAULT 0,
            updated_at TEXT
        )",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_vitals_user_ts ON vitals(user_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_user_ts ON alerts(user_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_severity_ts ON alerts(severity, timestamp)",
];

pub async fn apply_schema(conn: &Connection) -> Result<(), libsql::Error> {
    conn.execute("PRAGMA journal_mode=WAL", ()).await?;
    conn.execute("PRAGMA synchronous=NORMAL", ()).await?;
    conn.execute("PRAGMA busy_timeout=30000", ()).await?;

    for (name, _) in TABLES {
        conn.execute(&format!("DROP TABLE IF EXISTS {name}"), ()).await?;
    }
    for (_, ddl) in TABLES {
        conn.execute(ddl, ()).await?;
    }
    for ddl in INDEXES {
        conn.execute(ddl, ()).await?;
    }
    Ok(())
}
