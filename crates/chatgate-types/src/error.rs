use thiserror::Error;

/// Errors from repository operations (used by trait definitions in chatgate-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// A configuration that failed validation or could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more values are out of range. Every violation is listed.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {var}: '{value}'")]
    Env { var: String, value: String },
}
