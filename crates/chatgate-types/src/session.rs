//! Session liveness types shared by the registry and its callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result of a keep-alive signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heartbeat {
    /// The session was tracked and its timestamp refreshed.
    Alive,
    /// The session is unknown (never registered or already swept).
    Expired,
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heartbeat::Alive => write!(f, "alive"),
            Heartbeat::Expired => write!(f, "expired"),
        }
    }
}

/// Point-in-time view of one tracked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// Time since the last accepted interaction or heartbeat.
    pub idle: Duration,
    pub is_active: bool,
}
