//! Session liveness tracking: the registry and its periodic sweep.

pub mod registry;
pub mod sweeper;

pub use registry::SessionRegistry;
pub use sweeper::spawn_sweeper;
