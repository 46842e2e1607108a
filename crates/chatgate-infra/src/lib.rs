//! Infrastructure layer for chatgate.
//!
//! Contains implementations of the ports defined in `chatgate-core`: SQLite
//! history storage, the Ollama generation backend, and configuration loading.

pub mod config;
pub mod llm;
pub mod sqlite;
