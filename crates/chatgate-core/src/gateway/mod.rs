//! Gateway: the per-turn entry point used by the presentation layer.
//!
//! `handle` turns one user message into a sequence of display frames:
//! cumulative reply snapshots followed, when something goes wrong, by
//! exactly one terminal notice. Raw errors never escape.

pub mod notice;

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chatgate_types::session::Heartbeat;

use crate::chat::engine::{ConversationEngine, validate_message};
use crate::chat::error::ConversationError;
use crate::history::HistoryRepository;
use crate::session::registry::{SessionRegistry, short_id};

pub use notice::{GatewayFrame, Notice};

/// Progress of one request through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Validating,
    CheckingSession,
    Streaming,
    Completed,
    ExpiredMidStream,
    BackendError,
    OtherError,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Completed
                | RequestState::ExpiredMidStream
                | RequestState::BackendError
                | RequestState::OtherError
        )
    }

    fn for_error(err: &ConversationError) -> Self {
        match err {
            ConversationError::BackendUnavailable(_) | ConversationError::BackendStream { .. } => {
                RequestState::BackendError
            }
            _ => RequestState::OtherError,
        }
    }
}

/// Couples the session registry with the conversation engine.
pub struct Gateway<R: HistoryRepository> {
    registry: Arc<SessionRegistry>,
    engine: Arc<ConversationEngine<R>>,
}

impl<R: HistoryRepository> Clone for Gateway<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<R: HistoryRepository + 'static> Gateway<R> {
    pub fn new(registry: Arc<SessionRegistry>, engine: Arc<ConversationEngine<R>>) -> Self {
        Self { registry, engine }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<ConversationEngine<R>> {
        &self.engine
    }

    /// Mint a fresh session id and register it.
    pub fn start_session(&self) -> String {
        let id = Uuid::now_v7().to_string();
        self.registry.register(&id);
        info!(session = short_id(&id), "new session created");
        id
    }

    pub fn keep_alive(&self, session_id: &str) -> Heartbeat {
        self.registry.heartbeat(session_id)
    }

    /// Process one user message for a session.
    ///
    /// Liveness is re-checked after every fragment; if the session expires
    /// mid-reply the engine stream is cancelled and the partial text is
    /// returned with an expiry notice.
    pub fn handle(
        &self,
        user_message: String,
        session_id: Option<String>,
    ) -> impl Stream<Item = GatewayFrame> + Send + use<R> {
        let registry = self.registry.clone();
        let engine = self.engine.clone();

        async_stream::stream! {
            let mut state = RequestState::Validating;
            let max_length = engine.config().max_message_length;

            if let Err(e) = validate_message(&user_message, max_length) {
                debug!(error = %e, "message rejected");
                if user_message.trim().is_empty() {
                    yield GatewayFrame::Notice(Notice::EmptyMessage);
                } else {
                    yield GatewayFrame::Notice(Notice::from_error(e));
                }
                return;
            }

            state = transition(state, RequestState::CheckingSession);
            let session_id = match session_id.filter(|id| registry.is_active(id)) {
                Some(id) => id,
                None => {
                    yield GatewayFrame::Notice(Notice::SessionExpired);
                    return;
                }
            };
            // Every accepted interaction counts as activity.
            if registry.heartbeat(&session_id) == Heartbeat::Expired {
                yield GatewayFrame::Notice(Notice::SessionExpired);
                return;
            }

            state = transition(state, RequestState::Streaming);
            let mut fragments = match engine.converse(&session_id, &user_message).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    warn!(session = short_id(&session_id), error = %e, "conversation failed to start");
                    transition(state, RequestState::for_error(&e));
                    yield GatewayFrame::Notice(Notice::from_error(e));
                    return;
                }
            };

            let mut buffer = String::new();
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => {
                        buffer.push_str(&fragment);
                        if !registry.is_active(&session_id) {
                            fragments.cancel();
                            info!(session = short_id(&session_id), "session expired during response");
                            transition(state, RequestState::ExpiredMidStream);
                            yield GatewayFrame::Notice(Notice::ExpiredDuringResponse {
                                partial: buffer,
                            });
                            return;
                        }
                        yield GatewayFrame::Snapshot(buffer.clone());
                    }
                    Err(e) => {
                        warn!(session = short_id(&session_id), error = %e, "conversation failed");
                        transition(state, RequestState::for_error(&e));
                        yield GatewayFrame::Notice(Notice::from_error(e));
                        return;
                    }
                }
            }

            // A reply with no text still gets one frame so callers see completion.
            if buffer.is_empty() {
                yield GatewayFrame::Snapshot(buffer);
            }
            transition(state, RequestState::Completed);
        }
    }
}

fn transition(from: RequestState, to: RequestState) -> RequestState {
    debug!(?from, ?to, "request state");
    to
}
