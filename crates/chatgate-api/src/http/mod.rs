//! HTTP/REST API layer for chatgate.
//!
//! Axum-based REST API at `/api/v1/` with an envelope response format, a
//! Server-Sent Events chat endpoint, and CORS support.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
