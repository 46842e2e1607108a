//! Conversation engine and its error taxonomy.

pub mod engine;
pub mod error;

pub use engine::{ConversationEngine, EngineConfig, FragmentStream};
pub use error::ConversationError;
