//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub admission: AdmissionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Timeout for individual HTTP requests (in seconds)
    pub request_timeout_seconds: u64,
    /// Grace period for background tasks on shutdown (in seconds)
    pub shutdown_timeout_seconds: u64,
    /// Token required by the administrative routes; they are not mounted when unset
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_seconds: 30,
            shutdown_timeout_seconds: 5,
            admin_token: None,
        }
    }
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `tollgate_core=debug,info`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Capacity and refill rate of a single bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum tokens a bucket can hold (burst size)
    pub capacity: u32,
    /// Tokens added per second of elapsed time
    pub refill_rate_per_second: f64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill_rate_per_second: 0.5, // one token every 2 seconds
        }
    }
}

/// How a key is matched by an override
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatcher {
    /// The key must equal this value
    Exact(String),
    /// The key must start with this value
    Prefix(String),
}

impl KeyMatcher {
    pub fn pattern(&self) -> &str {
        match self {
            KeyMatcher::Exact(pattern) | KeyMatcher::Prefix(pattern) => pattern,
        }
    }
}

/// Per-key or per-tier limits that replace the defaults for matching keys
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideConfig {
    /// Tier label reported in status output and logs (e.g. `premium`)
    pub name: String,
    #[serde(rename = "match")]
    pub matcher: KeyMatcher,
    pub capacity: u32,
    pub refill_rate_per_second: f64,
}

impl OverrideConfig {
    pub fn limits(&self) -> LimitConfig {
        LimitConfig {
            capacity: self.capacity,
            refill_rate_per_second: self.refill_rate_per_second,
        }
    }
}

/// What happens to existing buckets when the admission config is replaced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReconfigurePolicy {
    /// Buckets adopt the new limits on next access, tokens clamped to the new capacity
    #[default]
    Clamp,
    /// All buckets are dropped and recreated full on next access
    Reset,
}

/// Bucket store layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of independently locked shards (1 = a single guarded map)
    pub shards: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { shards: 16 }
    }
}

/// Admission control configuration
///
/// Every key gets a token bucket with the `default` limits unless an entry in
/// `overrides` matches it. Exact matches win over prefixes; among prefixes the
/// longest one wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub default: LimitConfig,
    pub overrides: Vec<OverrideConfig>,
    pub reconfigure_policy: ReconfigurePolicy,
    /// Buckets untouched for this long are swept (0 disables eviction)
    pub idle_eviction_seconds: u64,
    /// How often the idle sweep runs (in seconds)
    pub sweep_interval_seconds: u64,
    pub store: StoreConfig,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            default: LimitConfig::default(),
            overrides: Vec::new(),
            reconfigure_policy: ReconfigurePolicy::Clamp,
            idle_eviction_seconds: 3600, // 1 hour
            sweep_interval_seconds: 300, // 5 minutes
            store: StoreConfig::default(),
        }
    }
}

impl AdmissionConfig {
    /// Idle threshold for the sweep, `None` when eviction is disabled
    pub fn idle_eviction(&self) -> Option<Duration> {
        (self.idle_eviction_seconds > 0).then(|| Duration::from_secs(self.idle_eviction_seconds))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.admission.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from `./config` and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from("config")
    }

    /// Load configuration from files in `dir` and environment variables
    ///
    /// Sources, lowest priority first: `default.*`, `{ENV}.*` when `ENV` is
    /// set, `local.*`, then `TOLLGATE__SECTION__KEY` variables.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let dir = dir.as_ref();
        let mut builder = config::Config::builder()
            .add_source(config::File::from(dir.join("default")).required(false));

        if let Ok(env) = std::env::var("ENV") {
            builder = builder.add_source(config::File::from(dir.join(&env)).required(false));
        }

        builder = builder
            .add_source(config::File::from(dir.join("local")).required(false))
            .add_source(config::Environment::with_prefix("TOLLGATE").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
