//! Business logic and repository trait definitions for chatgate.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the session registry, conversation
//! engine and gateway built on them. It depends only on `chatgate-types` and
//! `chatgate-observe` -- never on `chatgate-infra` or any database/IO crate.

pub mod chat;
pub mod gateway;
pub mod history;
pub mod llm;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
