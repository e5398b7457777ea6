use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing split by whether the access gate applies.
pub mod routes;
use routes::{gated, public};

// --- Public Re-exports ---

pub use auth::{IdentityState, SupabaseIdentityProvider};
pub use config::AppConfig;
pub use gate::{AccessGate, Decision, GateOutcome, RouteTable};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the JSON endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_induction_status, handlers::complete_induction, handlers::get_me),
    components(schemas(
        models::Profile,
        models::UserType,
        models::ProfileStatus,
        models::InductionStatus,
    )),
    tags((name = "staff-portal", description = "Staff portal access and induction API"))
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for the application's services and configuration.
/// The access gate is built once from the same collaborators the handlers use.
#[derive(Clone)]
pub struct AppState {
    /// Profile store.
    pub repo: RepositoryState,
    pub gate: AccessGate,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, repo: RepositoryState, identity: IdentityState) -> Self {
        let gate = AccessGate::new(config.routes.clone(), identity, repo.clone());
        Self { repo, gate, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

/// access_gate
///
/// Middleware running the access gate before any gated handler.
///
/// *Mechanism*: reads the session credentials from the request, evaluates the
/// gate, then either forwards the request (with the resolved `AuthContext` in
/// its extensions) or answers with a 307 redirect. Refreshed session cookies
/// are attached to the response in both cases.
async fn access_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let credentials = state.config.session_cookies.read(request.headers());
    let path = request.uri().path().to_string();

    let GateOutcome {
        decision,
        refreshed,
        viewer,
    } = state.gate.evaluate(&path, &credentials).await;

    let response = match decision {
        Decision::Allow => {
            if let Some(context) = viewer {
                request.extensions_mut().insert(context);
            }
            next.run(request).await
        }
        Decision::Redirect(target) => Redirect::temporary(&target.location()).into_response(),
    };

    match refreshed {
        Some(refreshed) => (state.config.session_cookies.write(&refreshed), response).into_response(),
        None => response,
    }
}

/// create_router
///
/// Assembles the routing structure, applies the access gate to every gated
/// route and the fallback, then wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let gated_router = gated::gated_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        access_gate,
    ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(gated_router)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: every log line for one request carries the
/// same `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
