//! Statistics and liveness endpoints.
//!
//! - GET /api/v1/stats - Gateway counters
//! - GET /health       - Process liveness

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GatewayStats {
    pub tracked_sessions: usize,
    pub session_timeout_secs: u64,
    pub model: String,
    pub provider: String,
}

/// GET /api/v1/stats - Number of tracked sessions and the serving model.
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<GatewayStats>>, AppError> {
    let timer = RequestTimer::start();

    let stats = GatewayStats {
        tracked_sessions: state.registry().active_count(),
        session_timeout_secs: state.config.session_timeout_secs,
        model: state.config.model.clone(),
        provider: state.provider.name().to_string(),
    };

    Ok(Json(timer.finish(stats).with_link("self", "/api/v1/stats")))
}

/// GET /health - Always 200 while the process is serving.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
