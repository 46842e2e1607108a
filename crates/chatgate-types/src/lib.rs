//! Shared domain types for chatgate.
//!
//! This crate contains the data shapes used across the gateway: conversation
//! turns, session liveness, backend request/stream types, configuration and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
