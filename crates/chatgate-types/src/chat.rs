//! Conversation turn types for chatgate.
//!
//! A turn is one role-tagged message persisted in the history store. Turns
//! are immutable once written and totally ordered by `sequence` within a
//! session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;
use crate::llm::Message;

/// A persisted conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Position within the session, starting at 1.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// View this turn as a backend context message.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A turn that has not been written yet. The store assigns the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTurn {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NewTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Override the timestamp (retention tests and imports).
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Outcome of a retention purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub sessions_removed: u64,
    pub turns_removed: u64,
}
