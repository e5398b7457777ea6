use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Gated Router Module
///
/// Every route here, and the fallback, sits behind the access gate layer
/// applied in `create_router`. The gate has already redirected anonymous
/// users and users who still owe induction (outside the induction flow) by
/// the time a handler runs.
pub fn gated_routes() -> Router<AppState> {
    Router::new()
        // --- Induction Flow (always reachable once signed in) ---
        // GET /intranet/induction/status
        .route(
            "/intranet/induction/status",
            get(handlers::get_induction_status),
        )
        // POST /intranet/induction/complete
        // One-way transition pending_induction -> active.
        .route(
            "/intranet/induction/complete",
            post(handlers::complete_induction),
        )
        // --- Default-Protected ---
        // GET /dashboard/me
        .route("/dashboard/me", get(handlers::get_me))
        // UI pages are served elsewhere; unknown paths still get classified by the gate first.
        .fallback(handlers::not_found)
}
