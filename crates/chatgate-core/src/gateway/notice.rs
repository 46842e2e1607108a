//! Display frames produced by the gateway.

use std::fmt;

use serde::Serialize;

use crate::chat::error::ConversationError;

/// A terminal, human-readable message shown instead of (or after) a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    EmptyMessage,
    InvalidInput { reason: String },
    SessionExpired,
    ExpiredDuringResponse { partial: String },
    BackendUnavailable,
    /// The backend failed mid-reply; `partial` is what was already shown.
    Interrupted { partial: String, reason: String },
    Error { description: String },
}

impl Notice {
    /// Map an engine error to the notice shown to the user.
    pub fn from_error(err: ConversationError) -> Self {
        match err {
            ConversationError::InvalidInput(reason) => Notice::InvalidInput { reason },
            ConversationError::BackendUnavailable(_) => Notice::BackendUnavailable,
            ConversationError::BackendStream { message, partial } => Notice::Interrupted {
                partial,
                reason: message,
            },
            other @ ConversationError::Persistence(_) => Notice::Error {
                description: other.to_string(),
            },
        }
    }

    /// Text shown to the user.
    pub fn text(&self) -> String {
        match self {
            Notice::EmptyMessage => "Please enter a message.".to_string(),
            Notice::InvalidInput { reason } => format!("Your message was not accepted: {reason}."),
            Notice::SessionExpired => {
                "Your session has expired. Please reload the page to start a new one.".to_string()
            }
            Notice::ExpiredDuringResponse { partial } => {
                format!("{partial}\n\nSession expired during the response.")
            }
            Notice::BackendUnavailable => {
                "Cannot connect to the language model backend. Check that the service is running."
                    .to_string()
            }
            Notice::Interrupted { partial, reason } if partial.is_empty() => {
                format!("Unexpected error: {reason}")
            }
            Notice::Interrupted { partial, reason } => {
                format!("{partial}\n\nThe response was interrupted: {reason}")
            }
            Notice::Error { description } => format!("Unexpected error: {description}"),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// One item of the gateway's output sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayFrame {
    /// The full reply text accumulated so far.
    Snapshot(String),
    /// A terminal notice; always the last frame.
    Notice(Notice),
}

impl GatewayFrame {
    pub fn text(&self) -> String {
        match self {
            GatewayFrame::Snapshot(text) => text.clone(),
            GatewayFrame::Notice(notice) => notice.text(),
        }
    }
}
