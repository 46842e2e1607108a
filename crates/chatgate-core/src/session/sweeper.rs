//! Background expiry sweep.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::registry::SessionRegistry;

/// Spawn the task that sweeps expired sessions every `period`.
///
/// The task runs until `cancel` fires. A sweep that panics is logged and the
/// next tick still runs.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can be expired yet.
        ticker.tick().await;

        info!(period_secs = period.as_secs(), "session sweeper started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match std::panic::catch_unwind(AssertUnwindSafe(|| registry.sweep())) {
                        Ok(0) => {}
                        Ok(removed) => debug!(
                            removed,
                            remaining = registry.active_count(),
                            "expired sessions swept"
                        ),
                        Err(_) => error!("session sweep failed, retrying next interval"),
                    }
                }
            }
        }

        info!("session sweeper stopped");
    })
}
