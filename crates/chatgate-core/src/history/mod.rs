//! Conversation history: the storage port and the retention job.

pub mod repository;
pub mod retention;

pub use repository::HistoryRepository;
pub use retention::RetentionService;
