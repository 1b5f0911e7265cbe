//! Tollgate Core - per-key token bucket admission control
//!
//! # Modules
//!
//! - [`config`]: Strongly-typed configuration with TOML and environment variable support
//! - [`domain`]: Admission decisions, bucket limits, errors and policy resolution
//! - [`infrastructure`]: Bucket stores and the [`AdmissionService`]
//! - [`logging`]: Structured logging with tracing
//!
//! # Usage
//!
//! ```rust,ignore
//! use tollgate_core::{AdmissionService, Config};
//!
//! let config = Config::load()?;
//! let service = AdmissionService::new(config.admission)?;
//!
//! let decision = service.check("user_42", 1.0)?;
//! if !decision.allowed {
//!     println!("retry in {}s", decision.retry_after_whole_seconds());
//! }
//! ```
//!
//! Environment variables use the `TOLLGATE__` prefix with double underscore separators:
//!
//! ```bash
//! TOLLGATE__SERVER__PORT=3000
//! TOLLGATE__ADMISSION__DEFAULT__CAPACITY=10
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use infrastructure::AdmissionService;
pub use logging::init_tracing;
