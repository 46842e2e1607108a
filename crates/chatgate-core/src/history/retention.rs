//! Retention: age-based bulk deletion of stored conversations.

use std::sync::Arc;

use chatgate_types::chat::PurgeReport;
use tracing::{error, info};

use super::repository::HistoryRepository;

/// Runs retention purges against a history repository.
///
/// Purging is best-effort: a failing purge is logged and reported as
/// removing nothing, so callers never have to handle a store error here.
pub struct RetentionService<R: HistoryRepository> {
    history: Arc<R>,
}

impl<R: HistoryRepository> RetentionService<R> {
    pub fn new(history: Arc<R>) -> Self {
        Self { history }
    }

    /// Remove conversations whose most recent turn is older than `days` days.
    pub async fn purge_older_than_days(&self, days: u32) -> PurgeReport {
        match self
            .history
            .purge_older_than(chrono::Duration::days(i64::from(days)))
            .await
        {
            Ok(report) => {
                info!(
                    days,
                    sessions = report.sessions_removed,
                    turns = report.turns_removed,
                    "retention purge complete"
                );
                report
            }
            Err(e) => {
                error!(days, error = %e, "retention purge failed");
                PurgeReport::default()
            }
        }
    }
}
