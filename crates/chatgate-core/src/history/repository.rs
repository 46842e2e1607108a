//! HistoryRepository trait definition.
//!
//! Durable, ordered storage of conversation turns. Follows the same RPITIT
//! pattern as the other repository ports.

use chatgate_types::chat::{NewTurn, PurgeReport, Turn};
use chatgate_types::error::RepositoryError;

/// Repository trait for conversation turn persistence.
///
/// Implementations live in chatgate-infra (e.g., `SqliteHistoryRepository`).
/// Appends to one session are serialized by the implementation; different
/// sessions never interfere.
pub trait HistoryRepository: Send + Sync {
    /// All turns of a session, ascending by sequence. Empty if none.
    fn load(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Record one turn after the current last turn of the session.
    fn append(
        &self,
        session_id: &str,
        turn: &NewTurn,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;

    /// Record several turns atomically with consecutive sequence numbers.
    fn append_all(
        &self,
        session_id: &str,
        turns: &[NewTurn],
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Delete every turn of each session whose latest turn is older than `age`.
    fn purge_older_than(
        &self,
        age: chrono::Duration,
    ) -> impl std::future::Future<Output = Result<PurgeReport, RepositoryError>> + Send;

    /// Number of stored turns for a session.
    fn count_turns(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
