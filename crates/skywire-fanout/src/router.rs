//! Axum router construction for the fan-out server.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the fan-out router.
///
/// - `GET /ws` -- `WebSocket` delta stream
/// - `GET /api/snapshot` -- latest gzip snapshot
/// - `GET /health` -- status
///
/// CORS allows any origin so browser clients on other hosts can fetch the
/// snapshot.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_deltas))
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
