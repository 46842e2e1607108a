//! SQLite history repository implementation.
//!
//! Implements `HistoryRepository` from `chatgate-core` using sqlx with split
//! read/write pools. Sequence numbers are assigned inside a write transaction
//! on the single writer connection, so concurrent appends to one session
//! cannot interleave.

use chatgate_core::history::HistoryRepository;
use chatgate_types::chat::{MessageRole, NewTurn, PurgeReport, Turn};
use chatgate_types::error::RepositoryError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `HistoryRepository`.
#[derive(Clone)]
pub struct SqliteHistoryRepository {
    pool: DatabasePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct TurnRow {
    session_id: String,
    role: String,
    content: String,
    sequence: i64,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            sequence: row.try_get("sequence")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Turn {
            session_id: self.session_id,
            role,
            content: self.content,
            sequence: self.sequence as u64,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

// Fixed width, so stored values compare correctly as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// HistoryRepository implementation
// ---------------------------------------------------------------------------

impl HistoryRepository for SqliteHistoryRepository {
    async fn load(&self, session_id: &str) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT session_id, role, content, sequence, created_at FROM turns WHERE session_id = ? ORDER BY sequence ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| TurnRow::from_row(row).map_err(query_err)?.into_turn())
            .collect()
    }

    async fn append(&self, session_id: &str, turn: &NewTurn) -> Result<Turn, RepositoryError> {
        let mut written = self
            .append_all(session_id, std::slice::from_ref(turn))
            .await?;
        written.pop().ok_or(RepositoryError::NotFound)
    }

    async fn append_all(
        &self,
        session_id: &str,
        turns: &[NewTurn],
    ) -> Result<Vec<Turn>, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let last: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(sequence), 0) FROM turns WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(query_err)?;

        let mut written = Vec::with_capacity(turns.len());
        for (offset, turn) in turns.iter().enumerate() {
            let sequence = last + 1 + offset as i64;
            sqlx::query(
                "INSERT INTO turns (session_id, role, content, sequence, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(session_id)
            .bind(turn.role.to_string())
            .bind(&turn.content)
            .bind(sequence)
            .bind(format_datetime(&turn.created_at))
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict(format!("sequence {sequence} already taken"))
                }
                other => query_err(other),
            })?;

            written.push(Turn {
                session_id: session_id.to_string(),
                role: turn.role,
                content: turn.content.clone(),
                sequence: sequence as u64,
                created_at: turn.created_at,
            });
        }

        tx.commit().await.map_err(query_err)?;
        Ok(written)
    }

    async fn purge_older_than(&self, age: chrono::Duration) -> Result<PurgeReport, RepositoryError> {
        let cutoff = format_datetime(&(Utc::now() - age));
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let sessions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM (SELECT session_id FROM turns GROUP BY session_id HAVING MAX(created_at) < ?)",
        )
        .bind(&cutoff)
        .fetch_one(&mut *tx)
        .await
        .map_err(query_err)?;

        let deleted = sqlx::query(
            "DELETE FROM turns WHERE session_id IN (SELECT session_id FROM turns GROUP BY session_id HAVING MAX(created_at) < ?)",
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        Ok(PurgeReport {
            sessions_removed: sessions as u64,
            turns_removed: deleted.rows_affected(),
        })
    }

    async fn count_turns(&self, session_id: &str) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM turns WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(count as u64)
    }
}
