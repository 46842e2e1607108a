//! chatgate CLI and HTTP gateway entry point.
//!
//! Binary name: `chatgate`
//!
//! Loads and validates configuration, initializes tracing, then dispatches to
//! the requested command or starts the HTTP server.

mod cli;
mod http;
mod state;
#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chatgate_core::session::spawn_sweeper;
use chatgate_infra::config::{config_path, load_config, resolve_data_dir};
use chatgate_infra::llm::{check_backend, create_provider};
use chatgate_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use chatgate_types::config::GatewayConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    let mut config = load_config(&data_dir).await?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    let filter = match cli.verbose {
        0 => config.log_level.clone(),
        1 => "info,chatgate=debug".to_string(),
        _ => "trace".to_string(),
    };
    let mut tracing_options = TracingOptions::new(filter);
    tracing_options.json = cli.json_logs;
    tracing_options.enable_otel = cli.otel;
    init_tracing(&tracing_options).map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;
    log_config(&config, &data_dir).await;

    let result = run(cli, config, data_dir).await;
    if let Err(e) = &result {
        error!(error = %e, "command failed");
    }
    shutdown_tracing();
    result
}

async fn config_file_present(data_dir: &Path) -> bool {
    tokio::fs::try_exists(config_path(data_dir))
        .await
        .unwrap_or(false)
}

/// Record where the configuration came from, now that a subscriber exists.
async fn log_config(config: &GatewayConfig, data_dir: &Path) {
    let config_file = config_path(data_dir);
    let from_file = config_file_present(data_dir).await;
    if !from_file {
        debug!(path = %config_file.display(), "no config.toml found, using defaults");
    }
    info!(
        data_dir = %data_dir.display(),
        from_file,
        model = %config.model,
        backend = %config.backend_url,
        session_timeout_secs = config.session_timeout_secs,
        "configuration loaded"
    );
}

async fn run(cli: Cli, config: GatewayConfig, data_dir: PathBuf) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            port,
            host,
            skip_backend_check,
        } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            let state = AppState::init(config, data_dir).await?;
            serve(state, &host, port, skip_backend_check).await?;
        }

        Commands::Purge { days } => {
            let state = AppState::init(config, data_dir).await?;
            cli::purge::purge(&state, days, cli.json).await?;
        }

        Commands::Check => {
            let provider = create_provider(&config)?;
            cli::check::check(&provider, &config, cli.json).await?;
        }
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16, skip_backend_check: bool) -> anyhow::Result<()> {
    if skip_backend_check {
        warn!(backend = %state.config.backend_url, "backend check skipped");
    } else if let Err(e) = check_backend(&state.provider, &state.config.model).await {
        bail!("{e}\n  hint: {}", cli::check::hint(&e, &state.config));
    }

    // Bind first: a failed bind must not leave a sweeper running.
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        state.registry().clone(),
        state.config.sweep_interval(),
        shutdown.clone(),
    );

    info!(
        %addr,
        model = %state.config.model,
        session_timeout_secs = state.config.session_timeout_secs,
        data_dir = %state.data_dir.display(),
        "chatgate listening"
    );
    println!();
    println!(
        "  {} chatgate serving {} on {}",
        console::style("▶").green().bold(),
        console::style(&state.config.model).bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!();

    let app = http::router::build_router(state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "session sweeper did not stop cleanly");
    }
    served?;

    info!("server stopped");
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::test_state;

    #[tokio::test]
    async fn test_bind_failure_leaves_no_sweeper_behind() {
        let (state, _dir) = test_state().await;
        let registry = state.registry().clone();
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = serve(state, "127.0.0.1", port, true).await.unwrap_err();
        assert!(err.to_string().contains("cannot bind"));
        // Only this test still holds the registry; a running sweeper would too.
        assert_eq!(Arc::strong_count(&registry), 1);
    }

    #[tokio::test]
    async fn test_config_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!config_file_present(dir.path()).await);

        tokio::fs::write(config_path(dir.path()), "model = \"phi3\"\n")
            .await
            .unwrap();
        assert!(config_file_present(dir.path()).await);
    }
}
