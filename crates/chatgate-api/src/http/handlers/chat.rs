//! Streaming chat over Server-Sent Events.
//!
//! POST /api/v1/sessions/{id}/chat
//!
//! Emits one `snapshot` event per fragment carrying the cumulative reply text,
//! and at most one terminal `notice` event. The stream closes after the
//! notice, or after the last snapshot on success.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use chatgate_core::gateway::{GatewayFrame, Notice};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

fn notice_payload(notice: &Notice) -> serde_json::Value {
    let mut value = serde_json::to_value(notice).unwrap_or_else(|_| json!({}));
    if let Some(fields) = value.as_object_mut() {
        fields.insert("text".to_string(), json!(notice.text()));
    }
    value
}

fn frame_event(frame: GatewayFrame) -> Event {
    match frame {
        GatewayFrame::Snapshot(text) => Event::default()
            .event("snapshot")
            .data(json!({ "text": text }).to_string()),
        GatewayFrame::Notice(notice) => Event::default()
            .event("notice")
            .data(notice_payload(&notice).to_string()),
    }
}

/// POST /api/v1/sessions/{id}/chat - Stream one reply.
///
/// Every outcome, including an expired session or an unreachable backend, is
/// reported in-band as a `notice` event; the HTTP status is always 200.
pub async fn stream_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let frames = state.gateway.handle(body.message, Some(id));
    let events = frames.map(|frame| Ok::<_, Infallible>(frame_event(frame)));

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_payload_carries_kind_and_text() {
        let payload = notice_payload(&Notice::ExpiredDuringResponse {
            partial: "AB".into(),
        });
        assert_eq!(payload["kind"], "expired_during_response");
        assert_eq!(payload["partial"], "AB");
        assert_eq!(
            payload["text"],
            "AB\n\nSession expired during the response."
        );
    }

    #[test]
    fn test_unit_notice_payload() {
        let payload = notice_payload(&Notice::SessionExpired);
        assert_eq!(payload["kind"], "session_expired");
        assert!(payload["text"].as_str().unwrap().contains("expired"));
    }
}
