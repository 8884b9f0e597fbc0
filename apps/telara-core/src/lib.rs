// [apps/telara-core/src/lib.rs]
/// Real-time ingestion, fusion, detection and analytics engine.
///
/// Module map mirrors the component list: `ground_truth` (simulation),
/// `ingestion` (bus consumers), `fusion` (hot ring + fusion table),
/// `storage` (batch buffer + flusher over the persistent store, plus the
/// baseline snapshot flusher),
/// `query` (window-size routing), `detector` (sustained-condition
/// patterns), `baseline` (EMA + deviation), `analytics` (correlation,
/// wellness, recommendations, predictions, digest), `broadcast`
/// (per-connection fan-out), `state`/`kernel` (composition root and
/// lifecycle), `handlers`/`routes` (thin HTTP/WS surface).
pub mod analytics;
pub mod baseline;
pub mod broadcast;
pub mod config;
pub mod detector;
pub mod fusion;
pub mod ground_truth;
pub mod handlers;
pub mod ingestion;
pub mod kernel;
pub mod query;
pub mod routes;
pub mod state;
pub mod storage;

pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::kernel::CoreKernel;
    pub use crate::state::AppState;
}
