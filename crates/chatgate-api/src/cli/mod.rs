//! CLI command definitions for the `chatgate` binary.
//!
//! Uses clap derive macros for argument parsing. Global flags override the
//! corresponding values from `config.toml` and `CHATGATE_*` variables.

pub mod check;
pub mod purge;

use clap::{Args, Parser, Subcommand};

use chatgate_types::config::GatewayConfig;

/// Streaming chat gateway in front of a local Ollama model.
#[derive(Parser)]
#[command(name = "chatgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-invocation configuration overrides.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Model identifier passed to the backend.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the Ollama server.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// SQLite database URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Idle seconds before a session expires.
    #[arg(long, global = true)]
    pub session_timeout: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(secs) = self.session_timeout {
            config.session_timeout_secs = secs;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway.
    Serve {
        /// Port to listen on.
        #[arg(long, short)]
        port: Option<u16>,

        /// Host address to bind to.
        #[arg(long)]
        host: Option<String>,

        /// Start even if the backend is unreachable or lacks the model.
        #[arg(long)]
        skip_backend_check: bool,
    },

    /// Delete stored conversations older than the retention window.
    Purge {
        /// Age threshold in days (defaults to `retention_days`).
        #[arg(long)]
        days: Option<u32>,
    },

    /// Verify the backend is reachable and serves the configured model.
    Check,
}
