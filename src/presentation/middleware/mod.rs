//! HTTP middleware

pub mod admin;

pub use admin::{ADMIN_TOKEN_HEADER, AdminAuthState, admin_auth_middleware};
