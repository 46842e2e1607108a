//! `chatgate check`: backend connectivity report.

use anyhow::Result;
use console::style;

use chatgate_core::llm::box_provider::BoxLlmProvider;
use chatgate_infra::llm::{BackendCheckError, check_backend};
use chatgate_types::config::GatewayConfig;

/// Check the backend and print the outcome. Fails when the backend is not ready.
pub async fn check(provider: &BoxLlmProvider, config: &GatewayConfig, json: bool) -> Result<()> {
    let result = check_backend(provider, &config.model).await;

    if json {
        let report = match &result {
            Ok(models) => serde_json::json!({
                "backend_url": config.backend_url,
                "model": config.model,
                "ready": true,
                "models": models,
            }),
            Err(e) => serde_json::json!({
                "backend_url": config.backend_url,
                "model": config.model,
                "ready": false,
                "error": e.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        match &result {
            Ok(models) => {
                println!(
                    "  {} Backend at {} is reachable",
                    style("✓").green(),
                    style(&config.backend_url).cyan()
                );
                println!(
                    "  {} Model {} is available ({} installed)",
                    style("✓").green(),
                    style(&config.model).bold(),
                    models.len()
                );
            }
            Err(e) => {
                println!("  {} {e}", style("✗").red());
                println!("    {}", style(hint(e, config)).dim());
            }
        }
        println!();
    }

    result.map(|_| ()).map_err(Into::into)
}

/// What the operator should do about a failed check.
pub fn hint(err: &BackendCheckError, config: &GatewayConfig) -> String {
    match err {
        BackendCheckError::Unreachable(_) => format!(
            "Start Ollama (`ollama serve`) or point --backend-url at it (currently {}).",
            config.backend_url
        ),
        BackendCheckError::ModelMissing { model, .. } => {
            format!("Download the model with `ollama pull {model}`.")
        }
    }
}
