//! Generation backend implementations.
//!
//! Contains the Ollama implementation of the [`LlmProvider`] trait defined in
//! `chatgate-core`, a factory ([`create_provider`]) that builds it from the
//! gateway configuration, and the startup connectivity check
//! ([`check_backend`]).
//!
//! [`LlmProvider`]: chatgate_core::llm::provider::LlmProvider

pub mod ollama;

use chatgate_core::llm::box_provider::BoxLlmProvider;
use chatgate_types::config::GatewayConfig;
use chatgate_types::llm::LlmError;

use self::ollama::OllamaProvider;

/// Why the backend is not ready to serve the configured model.
#[derive(Debug, thiserror::Error)]
pub enum BackendCheckError {
    #[error("cannot reach the backend: {0}")]
    Unreachable(#[from] LlmError),

    #[error("model '{model}' is not available (installed: {})", display_models(.available))]
    ModelMissing {
        model: String,
        available: Vec<String>,
    },
}

fn display_models(models: &[String]) -> String {
    if models.is_empty() {
        "none".to_string()
    } else {
        models.join(", ")
    }
}

/// Create a [`BoxLlmProvider`] from the gateway configuration.
pub fn create_provider(config: &GatewayConfig) -> Result<BoxLlmProvider, LlmError> {
    let provider = OllamaProvider::new(&config.backend_url, config.max_tokens)?;
    Ok(BoxLlmProvider::new(provider))
}

/// Whether an installed model name satisfies the configured one.
///
/// Ollama reports tags in full (`llama3:latest`); a bare name matches its
/// `latest` tag.
pub fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || (!wanted.contains(':') && installed.strip_suffix(":latest") == Some(wanted))
}

/// Verify the backend is reachable and serves `model`. Returns the installed models.
pub async fn check_backend(
    provider: &BoxLlmProvider,
    model: &str,
) -> Result<Vec<String>, BackendCheckError> {
    let available = provider.list_models().await?;
    if available.iter().any(|m| model_matches(m, model)) {
        tracing::info!(model, provider = provider.name(), "backend ready");
        Ok(available)
    } else {
        Err(BackendCheckError::ModelMissing {
            model: model.to_string(),
            available,
        })
    }
}
