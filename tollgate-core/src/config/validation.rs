//! Configuration validation module

use std::collections::HashSet;

use crate::config::{AdmissionConfig, LimitConfig, LoggingConfig, ServerConfig};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },

    #[error("Admission configuration error: {message}")]
    Admission { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn admission(message: impl Into<String>) -> Self {
        Self::Admission {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only 0 needs rejecting
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }

        if let Some(token) = &self.admin_token
            && token.trim().is_empty()
        {
            return Err(ValidationError::server(
                "Admin token cannot be blank; remove it to disable admin routes",
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        tracing_subscriber::EnvFilter::try_new(&self.level).map_err(|e| {
            ValidationError::logging(format!("Invalid log level '{}': {}", self.level, e))
        })?;
        Ok(())
    }
}

/// Check the limits of one bucket class; `label` names it in the error message
pub(crate) fn validate_limits(limits: &LimitConfig, label: &str) -> Result<(), ValidationError> {
    if limits.capacity == 0 {
        return Err(ValidationError::admission(format!(
            "{label}: capacity must be greater than 0"
        )));
    }

    if !limits.refill_rate_per_second.is_finite() || limits.refill_rate_per_second <= 0.0 {
        return Err(ValidationError::admission(format!(
            "{label}: refill_rate_per_second must be a finite number greater than 0, got {}",
            limits.refill_rate_per_second
        )));
    }

    Ok(())
}

impl Validate for AdmissionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_limits(&self.default, "default")?;

        let mut names = HashSet::new();
        let mut matchers = HashSet::new();
        for entry in &self.overrides {
            if entry.name.trim().is_empty() {
                return Err(ValidationError::admission("Override name cannot be empty"));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ValidationError::admission(format!(
                    "Duplicate override name '{}'",
                    entry.name
                )));
            }
            if entry.matcher.pattern().is_empty() {
                return Err(ValidationError::admission(format!(
                    "Override '{}' has an empty match pattern",
                    entry.name
                )));
            }
            if !matchers.insert(&entry.matcher) {
                return Err(ValidationError::admission(format!(
                    "Override '{}' repeats match pattern '{}'",
                    entry.name,
                    entry.matcher.pattern()
                )));
            }
            validate_limits(&entry.limits(), &format!("override '{}'", entry.name))?;
        }

        if self.store.shards == 0 {
            return Err(ValidationError::admission(
                "Store shard count must be greater than 0",
            ));
        }

        if self.idle_eviction_seconds > 0 && self.sweep_interval_seconds == 0 {
            return Err(ValidationError::admission(
                "Sweep interval must be greater than 0 when idle eviction is enabled",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeyMatcher, OverrideConfig};

    fn premium_override() -> OverrideConfig {
        OverrideConfig {
            name: "premium".to_string(),
            matcher: KeyMatcher::Prefix("premium:".to_string()),
            capacity: 50,
            refill_rate_per_second: 10.0,
        }
    }

    #[test]
    fn test_server_config_validation() {
        let valid = ServerConfig::default();
        assert!(valid.validate().is_ok());

        let invalid = ServerConfig {
            port: 0,
            ..valid.clone()
        };
        assert!(invalid.validate().is_err());

        let invalid = ServerConfig {
            request_timeout_seconds: 0,
            ..valid.clone()
        };
        assert!(invalid.validate().is_err());

        let invalid = ServerConfig {
            host: String::new(),
            ..valid.clone()
        };
        assert!(invalid.validate().is_err());

        let invalid = ServerConfig {
            admin_token: Some("   ".to_string()),
            ..valid
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_logging_config_validation() {
        assert!(LoggingConfig::default().validate().is_ok());

        let filtered = LoggingConfig {
            level: "tollgate_core=debug,warn".to_string(),
            ..LoggingConfig::default()
        };
        assert!(filtered.validate().is_ok());

        let invalid = LoggingConfig {
            level: "tollgate_core=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            invalid.validate(),
            Err(ValidationError::Logging { .. })
        ));
    }

    #[test]
    fn test_default_limits_must_be_positive() {
        let mut config = AdmissionConfig::default();
        config.default.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AdmissionConfig::default();
        config.default.refill_rate_per_second = 0.0;
        assert!(config.validate().is_err());

        let mut config = AdmissionConfig::default();
        config.default.refill_rate_per_second = -1.0;
        assert!(config.validate().is_err());

        let mut config = AdmissionConfig::default();
        config.default.refill_rate_per_second = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_override_validation() {
        let mut config = AdmissionConfig::default();
        config.overrides.push(premium_override());
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.overrides[0].capacity = 0;
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("premium"));

        let mut bad = config.clone();
        bad.overrides[0].refill_rate_per_second = f64::INFINITY;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.overrides[0].matcher = KeyMatcher::Exact(String::new());
        assert!(bad.validate().is_err());

        let mut duplicate_name = config.clone();
        duplicate_name.overrides.push(OverrideConfig {
            matcher: KeyMatcher::Prefix("gold:".to_string()),
            ..premium_override()
        });
        assert!(duplicate_name.validate().is_err());

        let mut duplicate_matcher = config;
        duplicate_matcher.overrides.push(OverrideConfig {
            name: "gold".to_string(),
            ..premium_override()
        });
        assert!(duplicate_matcher.validate().is_err());
    }

    #[test]
    fn test_store_and_sweep_validation() {
        let mut config = AdmissionConfig::default();
        config.store.shards = 0;
        assert!(config.validate().is_err());

        let mut config = AdmissionConfig::default();
        config.sweep_interval_seconds = 0;
        assert!(config.validate().is_err());

        // A zero interval is fine once eviction is off
        config.idle_eviction_seconds = 0;
        assert!(config.validate().is_ok());
    }
}
