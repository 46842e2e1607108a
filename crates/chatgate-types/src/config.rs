//! Gateway configuration types for chatgate.
//!
//! `GatewayConfig` represents the `config.toml` in the data directory. Every
//! field has a default, so an empty file (or no file) yields a working setup
//! against a local Ollama instance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Model identifier passed to the backend.
    pub model: String,
    /// Base address of the generation backend.
    pub backend_url: String,
    /// Maximum output tokens per reply.
    pub max_tokens: u32,
    pub temperature: f64,
    /// Idle time after which a session expires.
    pub session_timeout_secs: u64,
    /// Period of the expiry sweep.
    pub sweep_interval_secs: u64,
    /// Most recent turns supplied to the backend as context.
    pub max_history_turns: usize,
    /// Longest accepted user message, in characters.
    pub max_message_length: usize,
    /// Default age threshold for the retention purge.
    pub retention_days: u32,
    /// SQLite URL. `None` means `sqlite://{data_dir}/chatgate.db`.
    pub database_url: Option<String>,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    /// Fixed instruction prepended to every backend context.
    pub system_prompt: String,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, concise assistant. \
Answer the user's questions clearly and say so when you are unsure.";

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: "llama3:latest".to_string(),
            backend_url: "http://localhost:11434".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            session_timeout_secs: 600,
            sweep_interval_secs: 5,
            max_history_turns: 50,
            max_message_length: 4000,
            retention_days: 7,
            database_url: None,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 7860,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Check every bound and report all violations at once.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.model.trim().is_empty() {
            problems.push("model must not be empty".to_string());
        }
        if self.backend_url.trim().is_empty() {
            problems.push("backend_url must not be empty".to_string());
        }
        if self.session_timeout_secs < 60 {
            problems.push(format!(
                "session_timeout_secs must be at least 60 (got {})",
                self.session_timeout_secs
            ));
        }
        if self.sweep_interval_secs < 1 {
            problems.push("sweep_interval_secs must be at least 1".to_string());
        } else if self.sweep_interval_secs >= self.session_timeout_secs {
            problems.push(format!(
                "sweep_interval_secs ({}) must be below session_timeout_secs ({})",
                self.sweep_interval_secs, self.session_timeout_secs
            ));
        }
        if self.max_tokens < 100 {
            problems.push(format!(
                "max_tokens must be at least 100 (got {})",
                self.max_tokens
            ));
        }
        if self.max_message_length < 10 {
            problems.push(format!(
                "max_message_length must be at least 10 (got {})",
                self.max_message_length
            ));
        }
        if self.max_history_turns < 1 {
            problems.push("max_history_turns must be at least 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            problems.push(format!(
                "temperature must be between 0 and 2 (got {})",
                self.temperature
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}
