use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that never pass through the access gate.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Used by the load balancer; answers "ok" without touching the session or the store.
        .route("/health", get(|| async { "ok" }))
}
