//! Configuration loader for chatgate.
//!
//! Layers, lowest to highest precedence: built-in defaults,
//! `{data_dir}/config.toml`, `CHATGATE_*` environment variables. Command-line
//! flags are applied on top by the binary, which then validates the result.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chatgate_types::config::GatewayConfig;
use chatgate_types::error::ConfigError;

/// Resolve the data directory: `CHATGATE_DATA_DIR`, else `~/.chatgate`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHATGATE_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chatgate")
}

/// `{data_dir}/config.toml`
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// `sqlite://{data_dir}/chatgate.db`
pub fn default_database_url(data_dir: &Path) -> String {
    format!("sqlite://{}/chatgate.db", data_dir.display())
}

/// Load configuration from `{data_dir}/config.toml` and the process environment.
///
/// - A missing file yields the defaults.
/// - An unreadable or malformed file is an error, as is an unparsable
///   environment value.
/// - `database_url` is always filled in on return.
pub async fn load_config(data_dir: &Path) -> Result<GatewayConfig, ConfigError> {
    let mut config = load_file(data_dir).await?;
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    if config.database_url.is_none() {
        config.database_url = Some(default_database_url(data_dir));
    }
    Ok(config)
}

async fn load_file(data_dir: &Path) -> Result<GatewayConfig, ConfigError> {
    let config_path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(GatewayConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: config_path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<GatewayConfig>(&content).map_err(|err| ConfigError::Parse {
        path: config_path.display().to_string(),
        message: err.to_string(),
    })
}

fn parse_env<T: FromStr>(var: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value,
    })
}

/// Apply `CHATGATE_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    config: &mut GatewayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("CHATGATE_MODEL") {
        config.model = v;
    }
    if let Some(v) = lookup("CHATGATE_BACKEND_URL") {
        config.backend_url = v;
    }
    if let Some(v) = lookup("CHATGATE_MAX_TOKENS") {
        config.max_tokens = parse_env("CHATGATE_MAX_TOKENS", v)?;
    }
    if let Some(v) = lookup("CHATGATE_SESSION_TIMEOUT") {
        config.session_timeout_secs = parse_env("CHATGATE_SESSION_TIMEOUT", v)?;
    }
    if let Some(v) = lookup("CHATGATE_MAX_HISTORY_TURNS") {
        config.max_history_turns = parse_env("CHATGATE_MAX_HISTORY_TURNS", v)?;
    }
    if let Some(v) = lookup("CHATGATE_MAX_MESSAGE_LENGTH") {
        config.max_message_length = parse_env("CHATGATE_MAX_MESSAGE_LENGTH", v)?;
    }
    if let Some(v) = lookup("CHATGATE_DATABASE_URL") {
        config.database_url = Some(v);
    }
    if let Some(v) = lookup("CHATGATE_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Some(v) = lookup("CHATGATE_HOST") {
        config.host = v;
    }
    if let Some(v) = lookup("CHATGATE_PORT") {
        config.port = parse_env("CHATGATE_PORT", v)?;
    }
    Ok(())
}
