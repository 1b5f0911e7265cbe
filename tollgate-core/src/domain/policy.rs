//! Resolution of per-key limits

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AdmissionConfig, KeyMatcher, Validate, ValidationError};

use super::admission::BucketConfig;

/// Name reported for keys that match no override
pub const DEFAULT_POLICY: &str = "default";

/// Named limits applied to a class of keys
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPolicy {
    pub name: Arc<str>,
    pub config: BucketConfig,
}

/// Lookup table built from [`AdmissionConfig`]
///
/// Exact matches are checked first, then prefixes from longest to shortest,
/// then the default.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    default: ResolvedPolicy,
    exact: HashMap<String, ResolvedPolicy>,
    prefixes: Vec<(String, ResolvedPolicy)>,
}

impl PolicyTable {
    pub fn from_config(config: &AdmissionConfig) -> Result<Self, ValidationError> {
        config.validate()?;

        let default = ResolvedPolicy {
            name: Arc::from(DEFAULT_POLICY),
            config: BucketConfig::try_from(config.default)?,
        };

        let mut exact = HashMap::new();
        let mut prefixes = Vec::new();
        for entry in &config.overrides {
            let policy = ResolvedPolicy {
                name: Arc::from(entry.name.as_str()),
                config: BucketConfig::try_from(entry.limits())?,
            };
            match &entry.matcher {
                KeyMatcher::Exact(key) => {
                    exact.insert(key.clone(), policy);
                }
                KeyMatcher::Prefix(prefix) => prefixes.push((prefix.clone(), policy)),
            }
        }
        prefixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Ok(Self {
            default,
            exact,
            prefixes,
        })
    }

    pub fn resolve(&self, key: &str) -> &ResolvedPolicy {
        if let Some(policy) = self.exact.get(key) {
            return policy;
        }

        self.prefixes
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix.as_str()))
            .map(|(_, policy)| policy)
            .unwrap_or(&self.default)
    }
}
