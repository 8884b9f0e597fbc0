// [apps/telara-core/src/routes.rs]
//! The HTTP surface is deliberately thin: a liveness probe and the
//! WebSocket upgrade. Query-router reads and demo controls are not exposed
//! over HTTP in this scope — the real-time feed is the product surface.

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::stream;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(stream::upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
