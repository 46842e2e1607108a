//! Conversation engine error taxonomy.

use chatgate_types::error::RepositoryError;
use chatgate_types::llm::LlmError;

/// Errors produced while running one conversational exchange.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversationError {
    /// The request was rejected before touching the store or the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend could not be reached before any fragment arrived.
    #[error("generation backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend failed after the stream started. `partial` holds the
    /// fragments already delivered.
    #[error("backend stream failed: {message}")]
    BackendStream { message: String, partial: String },

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ConversationError {
    /// Translate a backend error given whether any fragment was delivered yet.
    pub fn from_backend(err: &LlmError, partial: &str) -> Self {
        if partial.is_empty() && err.is_unavailable() {
            ConversationError::BackendUnavailable(err.to_string())
        } else {
            ConversationError::BackendStream {
                message: err.to_string(),
                partial: partial.to_string(),
            }
        }
    }
}

impl From<RepositoryError> for ConversationError {
    fn from(err: RepositoryError) -> Self {
        ConversationError::Persistence(err.to_string())
    }
}
