//! HTTP request handlers for the REST API.

pub mod chat;
pub mod retention;
pub mod session;
pub mod stats;
