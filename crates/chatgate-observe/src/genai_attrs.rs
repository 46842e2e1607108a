//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! Usable as constant field names in `tracing` macros:
//! `info_span!("chat", { GEN_AI_REQUEST_MODEL } = %model)`.
//!
//! Span naming convention: `"{operation} {model}"` (e.g., `"chat llama3:latest"`)

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "ollama").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// The model ID requested.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reason reported by the backend (e.g., "stop", "length").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Ollama provider identifier.
pub const PROVIDER_OLLAMA: &str = "ollama";
