//! Axum router configuration with middleware.
//!
//! All API routes are under `/api/v1/`; `/health` sits at the root.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/sessions", post(handlers::session::create_session))
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route(
            "/sessions/{id}/heartbeat",
            post(handlers::session::heartbeat),
        )
        .route("/sessions/{id}/turns", get(handlers::session::list_turns))
        .route("/sessions/{id}/chat", post(handlers::chat::stream_chat))
        .route("/retention/purge", post(handlers::retention::purge))
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::stats::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
