//! Admission config fixtures

#![allow(dead_code)]

use tollgate_core::config::{AdmissionConfig, KeyMatcher, LimitConfig, OverrideConfig, StoreConfig};

/// Default-only config with the given limits
pub fn admission_config(capacity: u32, refill_rate_per_second: f64) -> AdmissionConfig {
    AdmissionConfig {
        default: LimitConfig {
            capacity,
            refill_rate_per_second,
        },
        ..AdmissionConfig::default()
    }
}

/// Config whose refill is too slow to matter within a test run
pub fn frozen_config(capacity: u32) -> AdmissionConfig {
    admission_config(capacity, 0.0001)
}

pub fn single_shard(mut config: AdmissionConfig) -> AdmissionConfig {
    config.store = StoreConfig { shards: 1 };
    config
}

pub fn prefix_override(name: &str, prefix: &str, capacity: u32, rate: f64) -> OverrideConfig {
    OverrideConfig {
        name: name.to_string(),
        matcher: KeyMatcher::Prefix(prefix.to_string()),
        capacity,
        refill_rate_per_second: rate,
    }
}

pub fn exact_override(name: &str, key: &str, capacity: u32, rate: f64) -> OverrideConfig {
    OverrideConfig {
        name: name.to_string(),
        matcher: KeyMatcher::Exact(key.to_string()),
        capacity,
        refill_rate_per_second: rate,
    }
}

/// Default 5 @ 0.5/s, `premium:` prefix 50 @ 10/s, `premium:vip` exact 500 @ 100/s
pub fn tiered_config() -> AdmissionConfig {
    let mut config = admission_config(5, 0.5);
    config.overrides = vec![
        prefix_override("premium", "premium:", 50, 10.0),
        exact_override("vip", "premium:vip", 500, 100.0),
    ];
    config
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
