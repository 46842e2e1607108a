//! LlmProvider trait definition.
//!
//! This is the core abstraction every generation backend implements.
//! Uses RPITIT for `list_models`, and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use chatgate_types::llm::{CompletionRequest, LlmError, ProviderCapabilities, StreamEvent};

/// A boxed, `'static` stream of backend events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for generation backends (Ollama, test doubles).
///
/// Implementations live in chatgate-infra (e.g., `OllamaProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "ollama").
    fn name(&self) -> &str;

    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// A backend that cannot be reached must surface `LlmError::Unavailable`
    /// as the first item; failures after the body is open are
    /// `LlmError::Stream`.
    fn stream(&self, request: CompletionRequest) -> EventStream;

    /// Model identifiers the backend can serve.
    fn list_models(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, LlmError>> + Send;
}
