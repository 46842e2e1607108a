//! In-memory session registry.
//!
//! Tracks the last activity of every live session. All state sits behind a
//! single mutex that is held only for the map operation itself, never across
//! an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use chatgate_types::session::{Heartbeat, SessionInfo};

/// Shortened session id for log fields.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Registry of live sessions keyed by id.
///
/// Created once at startup and shared via `Arc`. Timestamps come from
/// `tokio::time::Instant`, so tests can drive expiry with a paused clock.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Instant>>,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    // A panic while holding the lock cannot leave a torn entry behind (every
    // operation is a single map call), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `id` as active now. Re-registering overwrites the timestamp.
    pub fn register(&self, id: &str) -> bool {
        self.lock().insert(id.to_string(), Instant::now());
        debug!(session = short_id(id), "session registered");
        true
    }

    /// Refresh the activity timestamp of a tracked session.
    ///
    /// Unknown ids are reported as expired and are not created.
    pub fn heartbeat(&self, id: &str) -> Heartbeat {
        match self.lock().get_mut(id) {
            Some(last) => {
                *last = Instant::now();
                Heartbeat::Alive
            }
            None => Heartbeat::Expired,
        }
    }

    /// True iff `id` is tracked and idle for less than the timeout.
    pub fn is_active(&self, id: &str) -> bool {
        self.lock()
            .get(id)
            .is_some_and(|last| last.elapsed() < self.timeout)
    }

    /// Number of tracked entries, including expired ones not yet swept.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Idle time and liveness of a tracked session.
    pub fn session_info(&self, id: &str) -> Option<SessionInfo> {
        self.lock().get(id).map(|last| {
            let idle = last.elapsed();
            SessionInfo {
                idle,
                is_active: idle < self.timeout,
            }
        })
    }

    /// Drop every session idle for longer than the timeout. Returns the number removed.
    ///
    /// An entry exactly at the timeout is already inactive but survives until
    /// the next sweep.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, last| now.duration_since(*last) <= self.timeout);
        before - sessions.len()
    }
}
