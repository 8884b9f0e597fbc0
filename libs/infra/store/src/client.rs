// [libs/infra/store/src/client.rs]
use crate::errors::StoreError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Wraps a libSQL database handle. In `:memory:` mode an anchor connection is
/// held open for the lifetime of the client so the schema survives between
/// pooled connections (SQLite drops an in-memory database once its last
/// connection closes).
#[derive(Clone)]
pub struct StoreClient {
    database: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl StoreClient {
    #[instrument(skip(auth_token))]
    pub async fn connect(database_url: &str, auth_token: Option<String>) -> Result<Self, StoreError> {
        if database_url.is_empty() {
            return Err(StoreError::ConnectionError("DATABASE_URL is empty".into()));
        }

        info!("connecting to persistent store at {database_url}");

        let is_remote = database_url.starts_with("libsql://") || database_url.starts_with("https://");
        let is_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let database = if is_remote {
            let token = auth_token
                .ok_or_else(|| StoreError::ConnectionError("remote store requires an auth token".into()))?;
            Builder::new_remote(database_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_url).build().await
        }
        .map_err(|e| StoreError::ConnectionError(format!("driver init failed: {e}")))?;

        let database = Arc::new(database);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = database
                .connect()
                .map_err(|e| StoreError::ConnectionError(format!("anchor connection failed: {e}")))?;
            apply_schema(&anchor_conn)
                .await
                .map_err(|e| StoreError::ConnectionError(format!("schema init failed: {e}")))?;
            anchor = Some(Arc::new(anchor_conn));
            info!("in-memory store anchored");
        } else {
            let bootstrap_conn = database
                .connect()
                .map_err(|e| StoreError::ConnectionError(format!("bootstrap connection failed: {e}")))?;
            apply_schema(&bootstrap_conn)
                .await
                .map_err(|e| StoreError::ConnectionError(format!("schema init failed: {e}")))?;
        }

        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn connection(&self) -> Result<Connection, StoreError> {
        self.database.connect().map_err(|e| {
            error!("connection allocation failed: {e}");
            StoreError::ConnectionError(e.to_string())
        })
    }
}
