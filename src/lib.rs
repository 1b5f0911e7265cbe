//! Tollgate - per-key token bucket admission service
//!
//! This is the main crate that wires the admission core to the HTTP API

mod app;
pub mod presentation;

pub use app::{AppHandle, create_app};
pub use tollgate_core::{Config, init_tracing};

// Re-export for convenience
pub use tollgate_core;
