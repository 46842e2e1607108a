//! Session HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions                - Start a session
//! - POST /api/v1/sessions/{id}/heartbeat - Keep a session alive
//! - GET  /api/v1/sessions/{id}           - Inspect a session
//! - GET  /api/v1/sessions/{id}/turns     - List stored turns

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use chatgate_core::history::HistoryRepository;
use chatgate_types::chat::Turn;
use chatgate_types::session::Heartbeat;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResult {
    pub session_id: String,
    pub status: Heartbeat,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    /// Tracked by the registry and not yet timed out.
    pub active: bool,
    /// Seconds since the last interaction; absent once the session is swept.
    pub idle_secs: Option<u64>,
    pub turn_count: u64,
}

fn session_href(id: &str) -> String {
    format!("/api/v1/sessions/{id}")
}

/// POST /api/v1/sessions - Start a new session.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SessionCreated>>, AppError> {
    let timer = RequestTimer::start();

    let session_id = state.gateway.start_session();
    let href = session_href(&session_id);

    let response = timer
        .finish(SessionCreated {
            session_id,
            timeout_secs: state.config.session_timeout_secs,
        })
        .with_link("self", &href)
        .with_link("chat", &format!("{href}/chat"))
        .with_link("heartbeat", &format!("{href}/heartbeat"));

    Ok(Json(response))
}

/// POST /api/v1/sessions/{id}/heartbeat - Refresh a session's activity timestamp.
///
/// An unknown or swept session reports `expired`; it is never re-registered.
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<HeartbeatResult>>, AppError> {
    let timer = RequestTimer::start();

    let status = state.gateway.keep_alive(&id);
    let response = timer
        .finish(HeartbeatResult {
            session_id: id.clone(),
            status,
        })
        .with_link("session", &session_href(&id));

    Ok(Json(response))
}

/// GET /api/v1/sessions/{id} - Liveness and stored turn count.
///
/// 404 when the session is neither tracked nor has stored turns.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let timer = RequestTimer::start();

    let info = state.registry().session_info(&id);
    let turn_count = state.history.count_turns(&id).await?;

    if info.is_none() && turn_count == 0 {
        return Err(AppError::NotFound(format!("Session {id} not found")));
    }

    let href = session_href(&id);
    let response = timer
        .finish(SessionView {
            session_id: id,
            active: info.is_some_and(|i| i.is_active),
            idle_secs: info.map(|i| i.idle.as_secs()),
            turn_count,
        })
        .with_link("self", &href)
        .with_link("turns", &format!("{href}/turns"));

    Ok(Json(response))
}

/// GET /api/v1/sessions/{id}/turns - Stored turns in order.
pub async fn list_turns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Turn>>>, AppError> {
    let timer = RequestTimer::start();

    let turns = state.history.load(&id).await?;
    let response = timer
        .finish(turns)
        .with_link("session", &session_href(&id));

    Ok(Json(response))
}
