//! `chatgate purge`: one-shot retention run.

use anyhow::{Result, bail};
use console::style;

use crate::state::AppState;

pub async fn purge(state: &AppState, days: Option<u32>, json: bool) -> Result<()> {
    let days = days.unwrap_or(state.config.retention_days);
    if days == 0 {
        bail!("--days must be at least 1");
    }

    let report = state.retention.purge_older_than_days(days).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "  {} Removed {} turns from {} sessions idle for more than {} days",
            style("✓").green(),
            style(report.turns_removed).bold(),
            style(report.sessions_removed).bold(),
            days
        );
        println!();
    }
    Ok(())
}
