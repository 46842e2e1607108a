//! Retention endpoint.
//!
//! POST /api/v1/retention/purge - Delete conversations idle beyond N days.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::Deserialize;

use chatgate_types::chat::PurgeReport;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    /// Defaults to the configured `retention_days`.
    #[serde(default)]
    pub days: Option<u32>,
}

/// POST /api/v1/retention/purge
pub async fn purge(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<PurgeReport>>, AppError> {
    let timer = RequestTimer::start();

    // The body is optional; an empty one means "use the configured window".
    let request: PurgeRequest = if body.is_empty() {
        PurgeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?
    };
    let days = request.days.unwrap_or(state.config.retention_days);
    if days == 0 {
        return Err(AppError::Validation("days must be at least 1".to_string()));
    }

    let report = state.retention.purge_older_than_days(days).await;
    Ok(Json(timer.finish(report)))
}
