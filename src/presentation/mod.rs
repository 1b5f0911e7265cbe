//! Presentation layer - HTTP API over the admission service

pub mod controllers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use controllers::AppState;
pub use routes::{ApiDoc, create_router};
