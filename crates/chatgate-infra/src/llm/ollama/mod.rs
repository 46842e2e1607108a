//! Ollama backend: client, NDJSON streaming adapter and wire types.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::OllamaProvider;
